//! Activation records and the storage they hand out.
//!
//! The translator only talks to the [`Frame`] and [`FrameFactory`] traits,
//! so a different storage strategy can be plugged in without touching it.
mod jvm;
pub mod runtime;

pub use self::jvm::{JvmFrame, JvmFrameFactory};

use serde_derive::Serialize;
use std::fmt;
use tree::{BinOp, Expr, Label, Stm, Temp, TempFactory};

/// One storage location of a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Access {
    /// At a byte offset from the frame pointer.
    InFrame(i32),
    InReg(Temp),
}

impl Access {
    /// The tree reading or writing this location, given the frame pointer.
    pub fn exp(self, fp: Expr) -> Expr {
        match self {
            Access::InFrame(offset) => {
                Expr::mem(Expr::binop(BinOp::Plus, fp, Expr::Const(offset)))
            }
            Access::InReg(temp) => Expr::Temp(temp),
        }
    }
}

pub trait Frame: fmt::Debug {
    /// The code label of the procedure, e.g. `Foo$bar`.
    fn name(&self) -> &Label;

    /// Incoming parameter locations, in declaration order.
    fn formals(&self) -> &[Access];

    /// Locations handed out by `alloc_local`, in allocation order.
    fn locals(&self) -> &[Access];

    fn alloc_local(&mut self, escapes: bool, temps: &mut TempFactory) -> Access;

    fn fp(&self) -> Temp;

    /// Where the procedure leaves its result.
    fn rv(&self) -> Temp;

    fn word_size(&self) -> i32;

    /// A call to the runtime routine `name`.
    fn external_call(&self, name: &str, args: Vec<Expr>) -> Expr {
        Expr::call(Expr::Name(Label::new(name)), args)
    }

    /// Label marking the end of the procedure body.
    fn exit_label(&self) -> Label {
        Label::new(format!("{}$end", self.name()))
    }

    /// Bracket a translated body with the procedure's entry and exit.
    fn proc_entry_exit1(&self, body: Stm) -> Stm {
        tree::seq![
            Stm::Label(self.name().clone()),
            body,
            Stm::Label(self.exit_label())
        ]
    }
}

pub trait FrameFactory {
    /// Create a frame with one access per formal. `formals[i]` tells whether
    /// the `i`-th formal escapes.
    fn new_frame(&self, name: Label, formals: &[bool], temps: &mut TempFactory) -> Box<dyn Frame>;
}
