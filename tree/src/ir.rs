use crate::temp::{Label, Temp};
use itertools::Itertools;
use serde_derive::Serialize;
use std::fmt;

/// Build a right-leaning `SEQ` chain. The last statement terminates the
/// chain directly, a single statement is returned unwrapped.
#[macro_export]
macro_rules! seq {
    ($stm: expr) => { $stm };
    ($head: expr, $($tail: expr),+) => {
        $crate::Stm::Seq(Box::new($head), Box::new($crate::seq!($($tail),+)))
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum_macros::Display)]
pub enum BinOp {
    #[strum(serialize = "PLUS")]
    Plus,
    #[strum(serialize = "MINUS")]
    Minus,
    #[strum(serialize = "MUL")]
    Mul,
}

impl BinOp {
    pub fn apply(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            BinOp::Plus => lhs.wrapping_add(rhs),
            BinOp::Minus => lhs.wrapping_sub(rhs),
            BinOp::Mul => lhs.wrapping_mul(rhs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum_macros::Display)]
pub enum RelOp {
    #[strum(serialize = "EQ")]
    Eq,
    #[strum(serialize = "NE")]
    Ne,
    #[strum(serialize = "LT")]
    Lt,
    #[strum(serialize = "LE")]
    Le,
    #[strum(serialize = "GT")]
    Gt,
    #[strum(serialize = "GE")]
    Ge,
}

impl RelOp {
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            RelOp::Eq => lhs == rhs,
            RelOp::Ne => lhs != rhs,
            RelOp::Lt => lhs < rhs,
            RelOp::Le => lhs <= rhs,
            RelOp::Gt => lhs > rhs,
            RelOp::Ge => lhs >= rhs,
        }
    }
}

/// A value-producing tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Expr {
    Const(i32),
    /// Wide literal, loaded with a distinct instruction.
    LongConst(i64),
    Name(Label),
    Temp(Temp),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    /// The word at the given address.
    Mem(Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    /// Execute the statement, then evaluate the expression.
    ESeq(Box<Stm>, Box<Expr>),
}

/// A tree evaluated for its effect only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Stm {
    Move(Box<Expr>, Box<Expr>),
    Exp(Box<Expr>),
    /// Transfer to the address `target` evaluates to. `targets` lists every
    /// label it may evaluate to.
    Jump(Box<Expr>, Vec<Label>),
    CJump {
        op: RelOp,
        left: Box<Expr>,
        right: Box<Expr>,
        if_true: Label,
        if_false: Label,
    },
    Seq(Box<Stm>, Box<Stm>),
    Label(Label),
}

impl Expr {
    pub fn binop(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::BinOp(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn mem(address: Expr) -> Expr {
        Expr::Mem(Box::new(address))
    }

    pub fn call(target: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call(Box::new(target), args)
    }

    pub fn eseq(stm: Stm, expr: Expr) -> Expr {
        Expr::ESeq(Box::new(stm), Box::new(expr))
    }
}

impl Stm {
    pub fn mov(dst: Expr, src: Expr) -> Stm {
        Stm::Move(Box::new(dst), Box::new(src))
    }

    pub fn exp(expr: Expr) -> Stm {
        Stm::Exp(Box::new(expr))
    }

    pub fn jump(label: Label) -> Stm {
        Stm::Jump(Box::new(Expr::Name(label.clone())), vec![label])
    }

    pub fn cjump(op: RelOp, left: Expr, right: Expr, if_true: Label, if_false: Label) -> Stm {
        Stm::CJump {
            op,
            left: Box::new(left),
            right: Box::new(right),
            if_true,
            if_false,
        }
    }

    pub fn seq(first: Stm, rest: Stm) -> Stm {
        Stm::Seq(Box::new(first), Box::new(rest))
    }

    /// `EXP(CONST 0)`, the statement without effect.
    pub fn nop() -> Stm {
        Stm::exp(Expr::Const(0))
    }

    /// Evaluating a constant, a name or a temp has no effect.
    pub fn is_nop(&self) -> bool {
        match self {
            Stm::Exp(expr) => match **expr {
                Expr::Const(_) | Expr::LongConst(_) | Expr::Name(_) | Expr::Temp(_) => true,
                _ => false,
            },
            _ => false,
        }
    }

    /// Number of `SEQ` nodes along the right spine.
    pub fn seq_len(&self) -> usize {
        let mut len = 0;
        let mut current = self;
        while let Stm::Seq(_, rest) = current {
            len += 1;
            current = rest;
        }
        len
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(value) => write!(f, "CONST({})", value),
            Expr::LongConst(value) => write!(f, "LCONST({})", value),
            Expr::Name(label) => write!(f, "NAME({})", label),
            Expr::Temp(temp) => write!(f, "TEMP({})", temp),
            Expr::BinOp(op, lhs, rhs) => write!(f, "BINOP({}, {}, {})", op, lhs, rhs),
            Expr::Mem(address) => write!(f, "MEM({})", address),
            Expr::Call(target, args) if args.is_empty() => write!(f, "CALL({})", target),
            Expr::Call(target, args) => write!(f, "CALL({}, {})", target, args.iter().join(", ")),
            Expr::ESeq(stm, expr) => write!(f, "ESEQ({}, {})", stm, expr),
        }
    }
}

impl fmt::Display for Stm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stm::Move(dst, src) => write!(f, "MOVE({}, {})", dst, src),
            Stm::Exp(expr) => write!(f, "EXP({})", expr),
            Stm::Jump(target, _) => write!(f, "JUMP({})", target),
            Stm::CJump {
                op,
                left,
                right,
                if_true,
                if_false,
            } => write!(
                f,
                "CJUMP({}, {}, {}, {}, {})",
                op, left, right, if_true, if_false
            ),
            Stm::Seq(first, rest) => write!(f, "SEQ({}, {})", first, rest),
            Stm::Label(label) => write!(f, "LABEL({})", label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str) -> Stm {
        Stm::Label(Label::new(name))
    }

    #[test]
    fn seq_macro_leans_right() {
        let chain = seq![label("a"), label("b"), label("c")];
        assert_eq!(2, chain.seq_len());
        assert_eq!("SEQ(LABEL(a), SEQ(LABEL(b), LABEL(c)))", chain.to_string());
        assert_eq!(0, seq![label("a")].seq_len());
    }

    #[test]
    fn prefix_rendering() {
        let stm = Stm::cjump(
            RelOp::Lt,
            Expr::binop(BinOp::Plus, Expr::Const(1), Expr::LongConst(2)),
            Expr::mem(Expr::Const(8)),
            Label::new("T"),
            Label::new("F"),
        );
        assert_eq!(
            "CJUMP(LT, BINOP(PLUS, CONST(1), LCONST(2)), MEM(CONST(8)), T, F)",
            stm.to_string()
        );
        let call = Expr::call(Expr::Name(Label::new("print")), vec![Expr::Const(1)]);
        assert_eq!("CALL(NAME(print), CONST(1))", call.to_string());
    }

    #[test]
    fn jump_lists_its_target() {
        match Stm::jump(Label::new("top")) {
            Stm::Jump(target, targets) => {
                assert_eq!(Expr::Name(Label::new("top")), *target);
                assert_eq!(vec![Label::new("top")], targets);
            }
            other => panic!("unexpected {}", other),
        }
    }

    #[test]
    fn operators_wrap() {
        assert_eq!(i64::min_value(), BinOp::Plus.apply(i64::max_value(), 1));
        assert_eq!(-3, BinOp::Minus.apply(1, 4));
        assert!(RelOp::Ge.holds(3, 3));
        assert!(!RelOp::Ne.holds(3, 3));
    }

    #[test]
    fn serializes_as_tagged_tree() {
        let json = serde_json::to_string(&Stm::exp(Expr::Const(0))).unwrap();
        assert_eq!(r#"{"Exp":{"Const":0}}"#, json);
    }
}
