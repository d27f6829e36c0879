//! The typed MiniJava AST handed to the middle end by the front end.
//!
//! Every syntactic category is a closed enum, so passes over the tree
//! match exhaustively instead of dispatching through visitors.
mod spanned;

pub use self::spanned::{Site, Spanned};

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub main: MainClass,
    pub classes: Vec<Spanned<ClassDeclaration>>,
}

/// The class holding `public static void main(String[] args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MainClass {
    pub name: Spanned<String>,
    pub method_name: Spanned<String>,
    pub args_name: Spanned<String>,
    pub locals: Vec<Spanned<VarDeclaration>>,
    pub statements: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDeclaration {
    pub name: Spanned<String>,
    pub extends: Option<Spanned<String>>,
    pub fields: Vec<Spanned<VarDeclaration>>,
    pub methods: Vec<Spanned<MethodDeclaration>>,
}

/// Fields, formal parameters and locals share this shape.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclaration {
    pub ty: Spanned<TypeExpr>,
    pub name: Spanned<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDeclaration {
    pub return_ty: Spanned<TypeExpr>,
    pub name: Spanned<String>,
    pub formals: Vec<Spanned<VarDeclaration>>,
    pub locals: Vec<Spanned<VarDeclaration>>,
    pub statements: Vec<Spanned<Stmt>>,
    pub return_expr: Box<Spanned<Expr>>,
}

/// A type as written in the source. Class names are resolved later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Int,
    IntArray,
    Boolean,
    Class(String),
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Int => write!(f, "int"),
            TypeExpr::IntArray => write!(f, "int[]"),
            TypeExpr::Boolean => write!(f, "boolean"),
            TypeExpr::Class(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block {
        locals: Vec<Spanned<VarDeclaration>>,
        statements: Vec<Spanned<Stmt>>,
    },
    If {
        cond: Box<Spanned<Expr>>,
        then: Box<Spanned<Stmt>>,
    },
    IfElse {
        cond: Box<Spanned<Expr>>,
        then: Box<Spanned<Stmt>>,
        otherwise: Box<Spanned<Stmt>>,
    },
    While {
        cond: Box<Spanned<Expr>>,
        body: Box<Spanned<Stmt>>,
    },
    Println(Box<Spanned<Expr>>),
    Assign {
        name: Spanned<String>,
        value: Box<Spanned<Expr>>,
    },
    ArrayAssign {
        name: Spanned<String>,
        index: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary(BinaryOp, Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Not(Box<Spanned<Expr>>),
    MethodInvocation {
        target: Box<Spanned<Expr>>,
        name: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
    ArrayAccess {
        array: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    ArrayLength(Box<Spanned<Expr>>),
    NewInstance(Spanned<String>),
    NewIntArray(Box<Spanned<Expr>>),

    /// Integer literals keep their source spelling. A trailing `l` or `L`
    /// marks a wide literal.
    Int(String),
    True,
    False,
    Identifier(Spanned<String>),
    This,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumIter,
)]
pub enum BinaryOp {
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessEquals,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterEquals,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
}

impl BinaryOp {
    pub fn is_relational(self) -> bool {
        use self::BinaryOp::*;
        match self {
            Equals | NotEquals | LessThan | LessEquals | GreaterThan | GreaterEquals => true,
            And | Or | Add | Sub | Mul => false,
        }
    }
}

impl Expr {
    pub fn int(value: i64) -> Spanned<Expr> {
        Spanned::dummy(Expr::Int(value.to_string()))
    }

    pub fn ident(name: &str) -> Spanned<Expr> {
        Spanned::dummy(Expr::Identifier(Spanned::dummy(name.to_string())))
    }

    pub fn binary(op: BinaryOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
        Spanned::dummy(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }
}

impl VarDeclaration {
    pub fn new(ty: TypeExpr, name: &str) -> Spanned<VarDeclaration> {
        Spanned::dummy(VarDeclaration {
            ty: Spanned::dummy(ty),
            name: Spanned::dummy(name.to_string()),
        })
    }
}

impl Stmt {
    pub fn assign(name: &str, value: Spanned<Expr>) -> Spanned<Stmt> {
        Spanned::dummy(Stmt::Assign {
            name: Spanned::dummy(name.to_string()),
            value: Box::new(value),
        })
    }

    pub fn println(value: Spanned<Expr>) -> Spanned<Stmt> {
        Spanned::dummy(Stmt::Println(Box::new(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn relational_ops_are_exactly_the_comparisons() {
        let relational: Vec<_> = BinaryOp::iter().filter(|op| op.is_relational()).collect();
        assert_eq!(6, relational.len());
        assert!(!BinaryOp::Add.is_relational());
        assert_eq!("<=", BinaryOp::LessEquals.to_string());
    }

    #[test]
    fn spanned_equality_ignores_site() {
        let a = Spanned::new(Site::new(1, 2), "x".to_string());
        let b = Spanned::new(Site::new(9, 9), "x".to_string());
        assert_eq!(a, b);
        assert_eq!("x at 1:2", a.to_string());
    }
}
