//! The result of translating one AST node.
//!
//! A node lowers to an [`Expr`], a statement or a two-way branch, and the
//! consumer decides which of the three it needs. Each coercion builds fresh
//! trees and draws fresh labels, so a translation is consumed exactly once.
use crate::TranslateError;
use derive_more::Display;
use strum_macros::EnumDiscriminants;
use tree::{seq, BinOp, Expr, Label, RelOp, Stm, TempFactory};

#[derive(Debug, EnumDiscriminants)]
#[strum_discriminants(derive(strum_macros::Display))]
pub enum Translation {
    /// Produces a value.
    Expression(Expr),
    /// Produces no value.
    Statement(Statement),
    /// Boolean result, not yet tied to jump targets.
    Conditional(Conditional),
    /// A construct the engine cannot lower yet. Coercing it fails.
    Unlowered(Construct),
}

#[derive(Debug)]
pub enum Statement {
    Stm(Stm),
    /// Expanded into labels and jumps only when coerced.
    If {
        cond: Box<Translation>,
        then: Box<Translation>,
    },
    IfElse {
        cond: Box<Translation>,
        then: Box<Translation>,
        otherwise: Box<Translation>,
    },
}

#[derive(Debug)]
pub enum Conditional {
    Relational { op: RelOp, left: Expr, right: Expr },
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Construct {
    #[display(fmt = "'&&'")]
    And,
    #[display(fmt = "'||'")]
    Or,
    #[display(fmt = "invocation of method '{}'", _0)]
    MethodInvocation(String),
    #[display(fmt = "array access")]
    ArrayAccess,
    #[display(fmt = "array length")]
    ArrayLength,
    #[display(fmt = "instantiation of class '{}'", _0)]
    NewInstance(String),
    #[display(fmt = "array allocation")]
    NewIntArray,
    #[display(fmt = "'this'")]
    This,
    #[display(fmt = "access to field '{}'", _0)]
    FieldAccess(String),
}

impl Conditional {
    fn into_cjump(self, if_true: Label, if_false: Label) -> Stm {
        match self {
            Conditional::Relational { op, left, right } => {
                Stm::cjump(op, left, right, if_true, if_false)
            }
        }
    }
}

impl Statement {
    fn into_stm(self, temps: &mut TempFactory) -> Result<Stm, TranslateError> {
        Ok(match self {
            Statement::Stm(stm) => stm,
            Statement::If { cond, then } => {
                let (t, f) = (temps.new_label(), temps.new_label());
                seq![
                    (*cond).as_cond(t.clone(), f.clone())?,
                    Stm::Label(t),
                    (*then).as_stm(temps)?,
                    Stm::Label(f)
                ]
            }
            Statement::IfElse {
                cond,
                then,
                otherwise,
            } => {
                let (t, f, join) = (temps.new_label(), temps.new_label(), temps.new_label());
                seq![
                    (*cond).as_cond(t.clone(), f.clone())?,
                    Stm::Label(t),
                    (*then).as_stm(temps)?,
                    Stm::jump(join.clone()),
                    Stm::Label(f),
                    (*otherwise).as_stm(temps)?,
                    Stm::Label(join)
                ]
            }
        })
    }
}

impl Translation {
    /// Enforce a value. A branch is materialized as 0 or 1 in a fresh temp,
    /// a statement yields 0 after running.
    pub fn as_expr(self, temps: &mut TempFactory) -> Result<Expr, TranslateError> {
        match self {
            Translation::Expression(expr) => Ok(expr),
            Translation::Statement(stm) => Ok(Expr::eseq(stm.into_stm(temps)?, Expr::Const(0))),
            Translation::Conditional(cond) => {
                let result = Expr::Temp(temps.new_temp());
                let (t, f) = (temps.new_label(), temps.new_label());
                Ok(Expr::eseq(
                    seq![
                        Stm::mov(result.clone(), Expr::Const(1)),
                        cond.into_cjump(t.clone(), f.clone()),
                        Stm::Label(f),
                        Stm::mov(result.clone(), Expr::Const(0)),
                        Stm::Label(t)
                    ],
                    result,
                ))
            }
            Translation::Unlowered(construct) => Err(TranslateError::Unlowered { construct }),
        }
    }

    /// Enforce a statement, evaluating a value for its side effects only.
    pub fn as_stm(self, temps: &mut TempFactory) -> Result<Stm, TranslateError> {
        match self {
            Translation::Expression(expr) => Ok(Stm::exp(expr)),
            Translation::Statement(stm) => stm.into_stm(temps),
            Translation::Conditional(cond) => {
                let join = temps.new_label();
                Ok(seq![
                    cond.into_cjump(join.clone(), join.clone()),
                    Stm::Label(join)
                ])
            }
            Translation::Unlowered(construct) => Err(TranslateError::Unlowered { construct }),
        }
    }

    /// Enforce a branch to `if_true` or `if_false`. A value branches on
    /// being non-zero.
    pub fn as_cond(self, if_true: Label, if_false: Label) -> Result<Stm, TranslateError> {
        match self {
            Translation::Expression(expr) => Ok(Stm::cjump(
                RelOp::Ne,
                expr,
                Expr::Const(0),
                if_true,
                if_false,
            )),
            Translation::Conditional(cond) => Ok(cond.into_cjump(if_true, if_false)),
            Translation::Statement(_) => Err(TranslateError::NotACondition),
            Translation::Unlowered(construct) => Err(TranslateError::Unlowered { construct }),
        }
    }

    pub fn zero() -> Translation {
        Translation::Expression(Expr::Const(0))
    }

    /// `1 - value`, exact for values that are 0 or 1.
    pub fn negate(self, temps: &mut TempFactory) -> Result<Translation, TranslateError> {
        let value = self.as_expr(temps)?;
        Ok(Translation::Expression(Expr::binop(
            BinOp::Minus,
            Expr::Const(1),
            value,
        )))
    }
}

/// Fold translated items into one right-leaning `SEQ` chain.
///
/// No items fold to the zero constant, a single item is returned as is.
pub fn fold(
    items: Vec<Translation>,
    temps: &mut TempFactory,
) -> Result<Translation, TranslateError> {
    if items.len() <= 1 {
        return Ok(items.into_iter().next().unwrap_or_else(Translation::zero));
    }

    let mut stms = items
        .into_iter()
        .map(|item| item.as_stm(temps))
        .collect::<Result<Vec<_>, _>>()?;

    let mut chain = match stms.pop() {
        Some(last) => last,
        None => unreachable!("at least two items"),
    };
    while let Some(stm) = stms.pop() {
        chain = Stm::seq(stm, chain);
    }
    Ok(Translation::Statement(Statement::Stm(chain)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree::{canon, eval::Machine};
    use utils::assert_matches;

    fn relational(op: RelOp, left: i32, right: i32) -> Translation {
        Translation::Conditional(Conditional::Relational {
            op,
            left: Expr::Const(left),
            right: Expr::Const(right),
        })
    }

    fn eval(expr: Expr, temps: &mut TempFactory) -> i64 {
        let result = temps.new_temp();
        let mut machine = Machine::new();
        machine
            .run(&canon::linearize(Stm::mov(Expr::Temp(result), expr)))
            .unwrap();
        machine.temp(result).unwrap()
    }

    #[test]
    fn fold_of_nothing_is_zero() {
        let mut temps = TempFactory::new();
        assert_matches!(
            fold(vec![], &mut temps).unwrap(),
            Translation::Expression(Expr::Const(0))
        );
    }

    #[test]
    fn fold_of_one_is_unwrapped() {
        let mut temps = TempFactory::new();
        let single = Translation::Expression(Expr::Const(7));
        assert_matches!(
            fold(vec![single], &mut temps).unwrap(),
            Translation::Expression(Expr::Const(7))
        );
    }

    #[test]
    fn fold_of_n_has_n_minus_one_seqs() {
        let mut temps = TempFactory::new();
        for n in 2..6 {
            let items = (0..n)
                .map(|i| Translation::Expression(Expr::Const(i)))
                .collect();
            let stm = fold(items, &mut temps).unwrap().as_stm(&mut temps).unwrap();
            assert_eq!(n as usize - 1, stm.seq_len());
            assert_eq!(
                format!("EXP(CONST({}))", n - 1),
                last_leaf(&stm).to_string()
            );
        }
    }

    fn last_leaf(stm: &Stm) -> &Stm {
        match stm {
            Stm::Seq(_, rest) => last_leaf(rest),
            leaf => leaf,
        }
    }

    #[test]
    fn conditional_as_value() {
        let mut temps = TempFactory::new();
        let yes = relational(RelOp::Lt, 1, 2).as_expr(&mut temps).unwrap();
        let no = relational(RelOp::Gt, 1, 2).as_expr(&mut temps).unwrap();
        assert_eq!(1, eval(yes, &mut temps));
        assert_eq!(0, eval(no, &mut temps));
    }

    #[test]
    fn value_as_conditional_tests_non_zero() {
        let mut temps = TempFactory::new();
        let (t, f) = (temps.new_label(), temps.new_label());
        let stm = Translation::Expression(Expr::Const(5))
            .as_cond(t, f)
            .unwrap();
        assert_eq!("CJUMP(NE, CONST(5), CONST(0), L0, L1)", stm.to_string());
    }

    #[test]
    fn statement_is_no_condition() {
        let mut temps = TempFactory::new();
        let (t, f) = (temps.new_label(), temps.new_label());
        let stm = Translation::Statement(Statement::Stm(Stm::nop()));
        assert_matches!(
            stm.as_cond(t, f),
            Err(TranslateError::NotACondition)
        );
    }

    #[test]
    fn negation_round_trips() {
        let mut temps = TempFactory::new();
        for value in 0..=1 {
            let twice = Translation::Expression(Expr::Const(value))
                .negate(&mut temps)
                .and_then(|once| once.negate(&mut temps))
                .and_then(|twice| twice.as_expr(&mut temps))
                .unwrap();
            assert_eq!(i64::from(value), eval(twice, &mut temps));
        }
    }

    #[test]
    fn if_expands_with_fresh_labels_per_coercion() {
        let mut temps = TempFactory::new();
        let make = || {
            Translation::Statement(Statement::If {
                cond: Box::new(relational(RelOp::Eq, 1, 1)),
                then: Box::new(Translation::Expression(Expr::Const(3))),
            })
        };
        let first = make().as_stm(&mut temps).unwrap().to_string();
        let second = make().as_stm(&mut temps).unwrap().to_string();
        assert_eq!(
            "SEQ(CJUMP(EQ, CONST(1), CONST(1), L0, L1), SEQ(LABEL(L0), SEQ(EXP(CONST(3)), LABEL(L1))))",
            first
        );
        assert_ne!(first, second);
    }

    #[test]
    fn unlowered_never_coerces() {
        let mut temps = TempFactory::new();
        let this = || Translation::Unlowered(Construct::This);
        assert_matches!(this().as_expr(&mut temps), Err(TranslateError::Unlowered { .. }));
        assert_matches!(this().as_stm(&mut temps), Err(TranslateError::Unlowered { .. }));
        let (t, f) = (temps.new_label(), temps.new_label());
        assert_matches!(this().as_cond(t, f), Err(TranslateError::Unlowered { .. }));
    }
}
