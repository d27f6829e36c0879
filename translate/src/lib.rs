#![warn(
    clippy::print_stdout,
    clippy::unimplemented,
    clippy::doc_markdown,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::use_self,
    clippy::use_debug
)]

//! Lowers the output of the declaration pass (AST and symbol table) into
//! canonical IR fragments, one per procedure.
//!
//! # Generated Labels
//!
//! `$` is a valid character in a JVM name, but not in `MiniJava`. This is
//! why it separates the class from the method in procedure labels
//! (`Foo$bar`). Labels invented during lowering are `L<n>` and unique within
//! one compilation unit, because the back end concatenates all fragments.
//!
//! # Failure
//!
//! Every [`TranslateError`] means the declaration pass and this pass
//! disagree about the program. The whole unit is rejected: no fragment list
//! is returned, not even a partial one.
pub mod dump;
mod translation;
mod translator;

pub use self::{
    translation::{fold, Conditional, Construct, Statement, Translation},
    translator::ProgramTranslator,
};

use failure::Fail;
use frame::{runtime::RuntimeLib, Frame, FrameFactory};
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};
use symtab::{ScopeError, SymbolTable};
use tree::Stm;

#[derive(Debug, Fail)]
pub enum TranslateError {
    #[fail(display = "identifier '{}' in method '{}' resolves to nothing", name, method)]
    UnresolvedIdentifier { name: String, method: String },
    #[fail(display = "class '{}' is not in the symbol table", name)]
    UnknownClass { name: String },
    #[fail(display = "method '{}' of class '{}' is not in the symbol table", name, class)]
    UnknownMethod { class: String, name: String },
    #[fail(display = "method '{}' has {} open blocks, expected none", method, depth)]
    ScopeImbalance { method: String, depth: usize },
    #[fail(display = "{}", _0)]
    Scope(#[cause] ScopeError),
    #[fail(display = "{} is not lowered yet", construct)]
    Unlowered { construct: Construct },
    #[fail(display = "variable '{}' has no storage in its frame", name)]
    UnboundAccess { name: String },
    #[fail(display = "a statement cannot be used as a condition")]
    NotACondition,
    #[fail(display = "invalid integer literal '{}'", literal)]
    InvalidLiteral { literal: String },
}

impl From<ScopeError> for TranslateError {
    fn from(err: ScopeError) -> Self {
        TranslateError::Scope(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    #[strum(serialize = "text")]
    Text,
    #[strum(serialize = "json")]
    Json,
}

/// Enable or disable behaviour during translation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Log every fragment at info level once the unit is translated.
    pub dump_fragments: Option<DumpFormat>,
    pub runtime: RuntimeLib,
}

impl Options {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A translated procedure: its frame and its bracketed body.
#[derive(Debug)]
pub struct ProcFrag {
    pub frame: Box<dyn Frame>,
    pub body: Stm,
}

impl ProcFrag {
    pub fn name(&self) -> &str {
        self.frame.name().as_str()
    }

    /// The body as a straight-line statement list.
    pub fn linearized(&self) -> Vec<Stm> {
        tree::canon::linearize(self.body.clone())
    }
}

impl fmt::Display for ProcFrag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PROC {}: {}", self.frame.name(), self.body)
    }
}

/// Translate a whole compilation unit, main procedure first.
pub fn translate(
    program: &ast::Program,
    symtab: &mut SymbolTable,
    factory: &dyn FrameFactory,
    options: &Options,
) -> Result<Vec<ProcFrag>, TranslateError> {
    ProgramTranslator::new(symtab, factory, options).translate(program)
}
