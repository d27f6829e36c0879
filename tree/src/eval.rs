//! A reference simulator for linearized statement lists.
//!
//! Every value remembers whether it is a narrow (32-bit) or a wide (64-bit)
//! word. Arithmetic on two narrow words wraps at 32 bits, as soon as one
//! operand is wide the result is wide and wraps at 64 bits. Only `LCONST`
//! introduces wide words. Memory is addressed by value and reads zero where
//! nothing was stored. External calls are resolved by label name against
//! the registered handlers.
use crate::{
    ir::{BinOp, Expr, Stm},
    temp::{Label, Temp},
};
use failure::Fail;
use std::{collections::HashMap, fmt};

#[derive(Debug, Fail)]
pub enum EvalError {
    #[fail(display = "jump to unknown label '{}'", label)]
    UnknownLabel { label: Label },
    #[fail(display = "{} is read before it is written", temp)]
    UnboundTemp { temp: Temp },
    #[fail(display = "call to unknown external '{}'", name)]
    UnknownExternal { name: String },
    #[fail(display = "{} is not a label", target)]
    IndirectJump { target: String },
    #[fail(display = "cannot execute non-canonical node {}", node)]
    NotCanonical { node: String },
    #[fail(display = "no result after {} steps", limit)]
    StepLimitExceeded { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Word {
    Narrow(i32),
    Wide(i64),
}

impl Word {
    fn value(self) -> i64 {
        match self {
            Word::Narrow(value) => i64::from(value),
            Word::Wide(value) => value,
        }
    }

    fn combine(op: BinOp, lhs: Word, rhs: Word) -> Word {
        match (lhs, rhs) {
            // truncating the 64-bit result is 32-bit wrapping for +, - and *
            (Word::Narrow(_), Word::Narrow(_)) => {
                Word::Narrow(op.apply(lhs.value(), rhs.value()) as i32)
            }
            _ => Word::Wide(op.apply(lhs.value(), rhs.value())),
        }
    }
}

/// Values handed in from outside are narrow when they fit.
impl From<i64> for Word {
    fn from(value: i64) -> Self {
        if value >= i64::from(i32::min_value()) && value <= i64::from(i32::max_value()) {
            Word::Narrow(value as i32)
        } else {
            Word::Wide(value)
        }
    }
}

pub type External = Box<dyn FnMut(&[i64]) -> i64>;

const DEFAULT_STEP_LIMIT: usize = 100_000;

pub struct Machine {
    temps: HashMap<Temp, Word>,
    memory: HashMap<i64, Word>,
    externals: HashMap<String, External>,
    printers: Vec<String>,
    output: Vec<i64>,
    step_limit: usize,
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("temps", &self.temps)
            .field("memory", &self.memory)
            .field("output", &self.output)
            .finish()
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            temps: HashMap::new(),
            memory: HashMap::new(),
            externals: HashMap::new(),
            printers: Vec::new(),
            output: Vec::new(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Calls to `name` append their first argument to [`Machine::output`].
    pub fn register_printer(&mut self, name: &str) {
        self.printers.push(name.to_string());
    }

    pub fn register_external(&mut self, name: &str, handler: External) {
        self.externals.insert(name.to_string(), handler);
    }

    pub fn set_temp(&mut self, temp: Temp, value: i64) {
        self.temps.insert(temp, Word::from(value));
    }

    pub fn temp(&self, temp: Temp) -> Option<i64> {
        self.temps.get(&temp).map(|word| word.value())
    }

    pub fn store(&mut self, address: i64, value: i64) {
        self.memory.insert(address, Word::from(value));
    }

    pub fn load(&self, address: i64) -> i64 {
        self.load_word(address).value()
    }

    fn load_word(&self, address: i64) -> Word {
        self.memory.get(&address).cloned().unwrap_or(Word::Narrow(0))
    }

    pub fn output(&self) -> &[i64] {
        &self.output
    }

    /// Execute `body` from its first statement until control falls off its
    /// end.
    pub fn run(&mut self, body: &[Stm]) -> Result<(), EvalError> {
        let labels: HashMap<&Label, usize> = body
            .iter()
            .enumerate()
            .filter_map(|(idx, stm)| match stm {
                Stm::Label(label) => Some((label, idx)),
                _ => None,
            })
            .collect();

        let mut pc = 0;
        let mut steps = 0;
        while pc < body.len() {
            steps += 1;
            if steps > self.step_limit {
                return Err(EvalError::StepLimitExceeded {
                    limit: self.step_limit,
                });
            }

            let next = match &body[pc] {
                Stm::Label(_) => None,
                Stm::Move(dst, src) => {
                    let value = self.eval(src)?;
                    self.assign(dst, value)?;
                    None
                }
                Stm::Exp(expr) => {
                    self.eval(expr)?;
                    None
                }
                Stm::Jump(target, _) => match &**target {
                    Expr::Name(label) => Some(label),
                    other => {
                        return Err(EvalError::IndirectJump {
                            target: other.to_string(),
                        })
                    }
                },
                Stm::CJump {
                    op,
                    left,
                    right,
                    if_true,
                    if_false,
                } => {
                    let (left, right) = (self.eval(left)?, self.eval(right)?);
                    Some(if op.holds(left.value(), right.value()) {
                        if_true
                    } else {
                        if_false
                    })
                }
                seq @ Stm::Seq(..) => {
                    return Err(EvalError::NotCanonical {
                        node: seq.to_string(),
                    })
                }
            };

            pc = match next {
                None => pc + 1,
                Some(label) => *labels
                    .get(label)
                    .ok_or_else(|| EvalError::UnknownLabel {
                        label: label.clone(),
                    })?,
            };
        }
        log::debug!("simulation finished after {} steps", steps);
        Ok(())
    }

    fn assign(&mut self, dst: &Expr, value: Word) -> Result<(), EvalError> {
        match dst {
            Expr::Temp(temp) => {
                self.temps.insert(*temp, value);
            }
            Expr::Mem(address) => {
                let address = self.eval(address)?.value();
                self.memory.insert(address, value);
            }
            // an element address computed in place
            address => {
                let address = self.eval(address)?.value();
                self.memory.insert(address, value);
            }
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<Word, EvalError> {
        Ok(match expr {
            Expr::Const(value) => Word::Narrow(*value),
            Expr::LongConst(value) => Word::Wide(*value),
            Expr::Temp(temp) => *self
                .temps
                .get(temp)
                .ok_or_else(|| EvalError::UnboundTemp { temp: *temp })?,
            Expr::BinOp(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                Word::combine(*op, lhs, rhs)
            }
            Expr::Mem(address) => {
                let address = self.eval(address)?.value();
                self.load_word(address)
            }
            Expr::Call(target, args) => {
                let name = match &**target {
                    Expr::Name(label) => label.as_str().to_string(),
                    other => {
                        return Err(EvalError::UnknownExternal {
                            name: other.to_string(),
                        })
                    }
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg).map(Word::value))
                    .collect::<Result<Vec<_>, _>>()?;
                Word::from(self.call(&name, &args)?)
            }
            Expr::Name(_) | Expr::ESeq(..) => {
                return Err(EvalError::NotCanonical {
                    node: expr.to_string(),
                })
            }
        })
    }

    fn call(&mut self, name: &str, args: &[i64]) -> Result<i64, EvalError> {
        if self.printers.iter().any(|printer| printer == name) {
            self.output.push(args.first().cloned().unwrap_or(0));
            return Ok(0);
        }
        match self.externals.get_mut(name) {
            Some(handler) => Ok(handler(args)),
            None => Err(EvalError::UnknownExternal {
                name: name.to_string(),
            }),
        }
    }
}
