use derive_more::Display;
use serde_derive::Serialize;
use utils::Counter;

/// An abstract register. The back end maps temps to JVM locals or the
/// operand stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display)]
#[display(fmt = "t{}", _0)]
pub struct Temp(usize);

impl Temp {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A symbolic code address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Display)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Label(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Hands out temps and labels that are unique within one compilation unit.
///
/// The back end concatenates all fragments of a unit, so fresh labels must
/// not repeat across procedures. Use one factory per unit.
#[derive(Debug, Default)]
pub struct TempFactory {
    temps: Counter,
    labels: Counter,
}

impl TempFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose temps start at `first_temp`. Labels start at zero.
    pub fn starting_at(first_temp: usize) -> Self {
        TempFactory {
            temps: Counter::starting_at(first_temp),
            labels: Counter::new(),
        }
    }

    pub fn new_temp(&mut self) -> Temp {
        Temp(self.temps.next())
    }

    pub fn new_label(&mut self) -> Label {
        Label(format!("L{}", self.labels.next()))
    }
}
