//! The canonical intermediate representation.
//!
//! Trees are built by the translator, bracketed by the frame and handed to
//! the back end as opaque values. [`canon`] straightens a tree into a list
//! of statements, [`eval`] executes such a list.
#[macro_use]
mod ir;
pub mod canon;
pub mod eval;
mod temp;

pub use self::{
    ir::{BinOp, Expr, RelOp, Stm},
    temp::{Label, Temp, TempFactory},
};
