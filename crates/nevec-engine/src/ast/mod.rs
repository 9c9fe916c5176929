//! Typed syntax tree
//!
//! This is the boundary between the front end and the compiler core. Every
//! node carries the static type inferred by the type checker and its source
//! location. The tree is serde-deserializable so a front end can hand it over
//! as JSON.

pub mod loc;
pub mod types;

pub use loc::Loc;
pub use types::Type;

use serde::{Deserialize, Serialize};

/// A whole program: an ordered list of top-level declarations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Declarations in source order
    pub decls: Vec<Decl>,
}

/// Top-level declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decl {
    /// `const` block with one or more members
    Consts {
        /// Declared constants
        members: Vec<ConstMember>,
    },
    /// `print expr`
    Print {
        /// Printed expression
        expr: Expr,
        /// Location of the `print` keyword
        #[serde(default)]
        loc: Loc,
    },
    /// A bare expression evaluated for nothing
    Expr(Expr),
}

/// One member of a `const` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstMember {
    /// Constant name
    pub name: String,
    /// Declared type
    pub ty: Type,
    /// Initializer
    pub expr: Expr,
    /// Location of the name
    #[serde(default)]
    pub loc: Loc,
}

/// Typed expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// What the expression is
    pub kind: ExprKind,
    /// Statically inferred type
    pub ty: Type,
    /// Source location
    #[serde(default)]
    pub loc: Loc,
}

/// Expression variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    /// `( expr )`
    Parens(Box<Expr>),
    /// A reference to a constant by name
    Access(String),
    /// `callee(args...)`
    Call {
        /// Called expression
        callee: Box<Expr>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Prefix operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Infix operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// String conversion
    Show(Box<Expr>),
    /// `[k: v, ...]` table literal
    Table {
        /// Keys, parallel to `vals`
        keys: Vec<Expr>,
        /// Values, parallel to `keys`
        vals: Vec<Expr>,
    },
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
    /// String literal
    Str(String),
    /// `"left #{expr} next"` string interpolation
    Interpol {
        /// Literal text before the embedded expression
        left: String,
        /// Embedded expression
        expr: Box<Expr>,
        /// The rest of the string (another interpolation or a string literal)
        next: Option<Box<Expr>>,
    },
    /// `nil`
    Nil,
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `not x`
    Not,
    /// `x == 0`, produced by front-end desugaring
    IsZero,
    /// `x == nil`, produced by front-end desugaring
    IsNil,
    /// `x != nil`, produced by front-end desugaring
    IsNotNil,
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `&`
    BitAnd,
    /// `^`
    BitXor,
    /// `|`
    BitOr,
    /// `!=`
    Neq,
    /// `==`
    Eq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `..` string concatenation
    Concat,
}

impl Expr {
    /// Create an expression node at an unknown location
    pub fn new(kind: ExprKind, ty: Type) -> Self {
        Self {
            kind,
            ty,
            loc: Loc::default(),
        }
    }

    /// Attach a location
    pub fn at(mut self, line: u32, col: u32) -> Self {
        self.loc = Loc::new(line, col);
        self
    }

    /// Integer literal
    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::Int(value), Type::Int)
    }

    /// Float literal
    pub fn float(value: f64) -> Self {
        Self::new(ExprKind::Float(value), Type::Float)
    }

    /// Boolean literal
    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::Bool(value), Type::Bool)
    }

    /// String literal, typed `Str` or `Str8` depending on its contents
    pub fn str(value: impl Into<String>) -> Self {
        let value = value.into();
        let ty = Type::str_for(&value);
        Self::new(ExprKind::Str(value), ty)
    }

    /// `nil`
    pub fn nil() -> Self {
        Self::new(ExprKind::Nil, Type::Nil)
    }

    /// Reference to a constant
    pub fn access(name: impl Into<String>, ty: Type) -> Self {
        Self::new(ExprKind::Access(name.into()), ty)
    }

    /// Parenthesized expression
    pub fn parens(inner: Expr) -> Self {
        let ty = inner.ty.clone();
        Self::new(ExprKind::Parens(Box::new(inner)), ty)
    }

    /// Prefix operation
    pub fn unary(op: UnaryOp, operand: Expr, ty: Type) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    /// Infix operation
    pub fn binary(op: BinaryOp, left: Expr, right: Expr, ty: Type) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
        )
    }

    /// String conversion
    pub fn show(inner: Expr) -> Self {
        Self::new(ExprKind::Show(Box::new(inner)), Type::Str)
    }

    /// Table literal
    pub fn table(keys: Vec<Expr>, vals: Vec<Expr>, ty: Type) -> Self {
        Self::new(ExprKind::Table { keys, vals }, ty)
    }

    /// Call expression
    pub fn call(callee: Expr, args: Vec<Expr>, ty: Type) -> Self {
        Self::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            ty,
        )
    }

    /// String interpolation
    pub fn interpol(left: impl Into<String>, expr: Expr, next: Option<Expr>) -> Self {
        Self::new(
            ExprKind::Interpol {
                left: left.into(),
                expr: Box::new(expr),
                next: next.map(Box::new),
            },
            Type::Str,
        )
    }
}

impl ConstMember {
    /// Create a constant member at an unknown location
    pub fn new(name: impl Into<String>, ty: Type, expr: Expr) -> Self {
        Self {
            name: name.into(),
            ty,
            expr,
            loc: Loc::default(),
        }
    }
}

impl Decl {
    /// A `const` block with a single member
    pub fn constant(name: impl Into<String>, ty: Type, expr: Expr) -> Self {
        Decl::Consts {
            members: vec![ConstMember::new(name, ty, expr)],
        }
    }

    /// `print expr`
    pub fn print(expr: Expr) -> Self {
        let loc = expr.loc;
        Decl::Print { expr, loc }
    }
}

impl Program {
    /// Create a program from declarations
    pub fn new(decls: Vec<Decl>) -> Self {
        Self { decls }
    }

    /// Parse a typed tree from its JSON form
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }
}
