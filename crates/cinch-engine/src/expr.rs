//! Expression trees for constraint text.

use std::fmt;

use cinch_core::{BoundOp, Kind, Value};

/// A constraint expression.
///
/// The parser produces `Ident` and `Call` nodes; compilation resolves them
/// into `Ref` and `Builtin` nodes. Evaluation only sees resolved trees.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// An atom, a kind, top or bottom.
    Literal(Value),

    /// A unary bound such as `>=5`.
    Bound(BoundOp, Box<Expr>),

    /// An unresolved identifier.
    Ident(String),

    /// A reference to field `name` of the struct `depth` scopes out.
    Ref { depth: usize, name: String },

    Select(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),

    Call(String, Vec<Expr>),
    Builtin(Builtin, Vec<Expr>),

    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),

    /// `a & b`
    Unify(Box<Expr>, Box<Expr>),

    /// `a | *b | c`
    Disjunction(Vec<Disjunct>),

    /// A `*e` marker outside of a disjunction.
    Default(Box<Expr>),

    Struct(Vec<FieldDecl>),

    /// A list literal; `tail` is set for open lists (`[a, ...T]`).
    List {
        elems: Vec<Expr>,
        tail: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Disjunct {
    pub expr: Expr,
    pub default: bool,
}

/// A field of a struct literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub label: String,
    pub optional: bool,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Div,
    Mod,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "len" => Some(Builtin::Len),
            "div" => Some(Builtin::Div),
            "mod" => Some(Builtin::Mod),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Div => "div",
            Builtin::Mod => "mod",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Builtin::Len => 1,
            Builtin::Div | Builtin::Mod => 2,
        }
    }
}

impl Expr {
    // Constructors for common expressions

    pub fn literal(value: Value) -> Self {
        Expr::Literal(value)
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Value::Int(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Value::string(value))
    }

    pub fn kind(kinds: Kind) -> Self {
        Expr::Literal(Value::kind_of(kinds))
    }

    pub fn top() -> Self {
        Expr::Literal(Value::top())
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn reference(depth: usize, name: impl Into<String>) -> Self {
        Expr::Ref {
            depth,
            name: name.into(),
        }
    }

    pub fn bound(op: BoundOp, limit: Expr) -> Self {
        Expr::Bound(op, Box::new(limit))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn unify(lhs: Expr, rhs: Expr) -> Self {
        Expr::Unify(Box::new(lhs), Box::new(rhs))
    }

    pub fn select(base: Expr, name: impl Into<String>) -> Self {
        Expr::Select(Box::new(base), name.into())
    }

    pub fn index(base: Expr, index: Expr) -> Self {
        Expr::Index(Box::new(base), Box::new(index))
    }

    pub fn list(elems: Vec<Expr>) -> Self {
        Expr::List { elems, tail: None }
    }

    pub fn open_list(elems: Vec<Expr>, tail: Expr) -> Self {
        Expr::List {
            elems,
            tail: Some(Box::new(tail)),
        }
    }

    /// Returns true if this expression is a struct or list literal.
    pub fn is_composite_literal(&self) -> bool {
        matches!(self, Expr::Struct(_) | Expr::List { .. })
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        })
    }
}
