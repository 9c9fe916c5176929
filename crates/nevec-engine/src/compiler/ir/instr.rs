//! Three-address code instructions

use super::sym::SymId;
use super::value::IrConstant;
use crate::ast::{self, Loc, Type};

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Numeric negation
    Neg,
    /// Logical not
    Not,
    /// `x == 0`
    IsZero,
    /// `x == nil`
    IsNil,
    /// `x != nil`
    IsNotNil,
    /// Conversion to string
    Show,
}

impl From<ast::UnaryOp> for UnaryOp {
    fn from(op: ast::UnaryOp) -> Self {
        match op {
            ast::UnaryOp::Neg => UnaryOp::Neg,
            ast::UnaryOp::Not => UnaryOp::Not,
            ast::UnaryOp::IsZero => UnaryOp::IsZero,
            ast::UnaryOp::IsNil => UnaryOp::IsNil,
            ast::UnaryOp::IsNotNil => UnaryOp::IsNotNil,
        }
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not ",
            UnaryOp::IsZero => "is_zero ",
            UnaryOp::IsNil => "is_nil ",
            UnaryOp::IsNotNil => "is_not_nil ",
            UnaryOp::Show => "show ",
        };
        write!(f, "{}", s)
    }
}

/// Binary operators (concatenation has its own expression kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    // Bitwise
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
    // Comparison
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl BinaryOp {
    /// Lower a tree operator; `None` for concatenation
    pub fn from_ast(op: ast::BinaryOp) -> Option<Self> {
        Some(match op {
            ast::BinaryOp::Plus => BinaryOp::Add,
            ast::BinaryOp::Minus => BinaryOp::Sub,
            ast::BinaryOp::Star => BinaryOp::Mul,
            ast::BinaryOp::Slash => BinaryOp::Div,
            ast::BinaryOp::Shl => BinaryOp::Shl,
            ast::BinaryOp::Shr => BinaryOp::Shr,
            ast::BinaryOp::BitAnd => BinaryOp::BitAnd,
            ast::BinaryOp::BitXor => BinaryOp::BitXor,
            ast::BinaryOp::BitOr => BinaryOp::BitOr,
            ast::BinaryOp::Neq => BinaryOp::Neq,
            ast::BinaryOp::Eq => BinaryOp::Eq,
            ast::BinaryOp::Gt => BinaryOp::Gt,
            ast::BinaryOp::Gte => BinaryOp::Gte,
            ast::BinaryOp::Lt => BinaryOp::Lt,
            ast::BinaryOp::Lte => BinaryOp::Lte,
            ast::BinaryOp::Concat => return None,
        })
    }

    /// `+ - * /`
    pub fn is_arith(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div)
    }

    /// `<< >> & ^ |`
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr
        )
    }

    /// `== != > >= < <=`
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Gt | BinaryOp::Gte | BinaryOp::Lt | BinaryOp::Lte
        )
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
        };
        write!(f, "{}", s)
    }
}

/// The operation half of a `Tac`
#[derive(Debug, Clone, PartialEq)]
pub enum IrExpr {
    /// Literal
    Const(IrConstant),
    /// `op operand`
    Unary { op: UnaryOp, operand: SymId },
    /// `left op right`
    Binary {
        op: BinaryOp,
        left: SymId,
        right: SymId,
    },
    /// `left .. right`
    Concat { left: SymId, right: SymId },
    /// `[k: v, ...]`
    Table { entries: Vec<(SymId, SymId)> },
    /// `table[key]`
    Lookup { table: SymId, key: SymId },
    /// `print operand`
    Print { operand: SymId },
}

impl IrExpr {
    /// Symbols read by this expression, in evaluation order
    pub fn operands(&self) -> Vec<SymId> {
        match self {
            IrExpr::Const(_) => vec![],
            IrExpr::Unary { operand, .. } | IrExpr::Print { operand } => vec![*operand],
            IrExpr::Binary { left, right, .. } | IrExpr::Concat { left, right } => {
                vec![*left, *right]
            }
            IrExpr::Table { entries } => entries.iter().flat_map(|(k, v)| [*k, *v]).collect(),
            IrExpr::Lookup { table, key } => vec![*table, *key],
        }
    }

    /// Check if this expression has side effects (cannot be eliminated)
    pub fn has_side_effects(&self) -> bool {
        matches!(self, IrExpr::Print { .. })
    }

    /// Whether the destination is written before all operands are read
    ///
    /// A table is allocated first and then filled one entry per word, so
    /// its register must not hold any entry.
    pub fn writes_before_reading(&self) -> bool {
        matches!(self, IrExpr::Table { entries } if !entries.is_empty())
    }

    /// The literal, if this is one
    pub fn as_const(&self) -> Option<&IrConstant> {
        match self {
            IrExpr::Const(c) => Some(c),
            _ => None,
        }
    }

    /// Operator name for diagnostics
    pub fn op_name(&self) -> String {
        match self {
            IrExpr::Const(c) => format!("const {}", c.kind_name()),
            IrExpr::Unary { op, .. } => op.to_string().trim_end().to_string(),
            IrExpr::Binary { op, .. } => op.to_string(),
            IrExpr::Concat { .. } => "..".to_string(),
            IrExpr::Table { .. } => "table".to_string(),
            IrExpr::Lookup { .. } => "lookup".to_string(),
            IrExpr::Print { .. } => "print".to_string(),
        }
    }
}

/// One three-address instruction: `dest = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct Tac {
    /// Defined symbol
    pub dest: SymId,
    /// Operation
    pub expr: IrExpr,
    /// Result type
    pub ty: Type,
    /// Source location
    pub loc: Loc,
}

impl Tac {
    /// Create a new instruction
    pub fn new(dest: SymId, expr: IrExpr, ty: Type, loc: Loc) -> Self {
        Self { dest, expr, ty, loc }
    }

    /// Whether `dest` holds a runtime value
    ///
    /// A `print` still defines its `Nil` destination for bookkeeping, but it
    /// never occupies a register.
    pub fn defines_value(&self) -> bool {
        !matches!(self.expr, IrExpr::Print { .. })
    }

    /// Symbols read by this instruction
    pub fn operands(&self) -> Vec<SymId> {
        self.expr.operands()
    }

    /// Replace the operation with a literal, keeping destination, type and location
    pub fn folded(&self, value: IrConstant) -> Self {
        Self {
            dest: self.dest,
            expr: IrExpr::Const(value),
            ty: self.ty.clone(),
            loc: self.loc,
        }
    }
}
