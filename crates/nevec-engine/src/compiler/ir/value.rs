//! IR literal values

use crate::ast::Type;

/// Significant digits used when rendering numbers as text
pub const SHOW_PRECISION: usize = 14;

/// A literal value known at compile time
#[derive(Debug, Clone)]
pub enum IrConstant {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
    /// String literal
    Str(String),
    /// `nil`
    Nil,
    /// Table literal, entries in insertion order
    Table(Vec<(IrConstant, IrConstant)>),
}

// Floats compare by bit pattern so that a NaN literal still equals itself
// and the optimizer's structural fixpoint check terminates.
impl PartialEq for IrConstant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (IrConstant::Int(a), IrConstant::Int(b)) => a == b,
            (IrConstant::Float(a), IrConstant::Float(b)) => a.to_bits() == b.to_bits(),
            (IrConstant::Bool(a), IrConstant::Bool(b)) => a == b,
            (IrConstant::Str(a), IrConstant::Str(b)) => a == b,
            (IrConstant::Nil, IrConstant::Nil) => true,
            (IrConstant::Table(a), IrConstant::Table(b)) => a == b,
            _ => false,
        }
    }
}

impl IrConstant {
    /// Textual form used by `show`
    ///
    /// Numbers use 14 significant digits, booleans are lowercase, strings are
    /// verbatim.
    pub fn show(&self) -> String {
        match self {
            IrConstant::Int(v) => format_int(*v),
            IrConstant::Float(v) => format_g(*v, SHOW_PRECISION),
            IrConstant::Bool(v) => v.to_string(),
            IrConstant::Str(s) => s.clone(),
            IrConstant::Nil => "nil".to_string(),
            IrConstant::Table(_) => self.to_string(),
        }
    }

    /// Whether this literal fits the static type `ty`
    pub fn matches_type(&self, ty: &Type) -> bool {
        match (self, ty) {
            (IrConstant::Int(_), Type::Int) => true,
            (IrConstant::Float(_), Type::Float) => true,
            (IrConstant::Bool(_), Type::Bool) => true,
            (IrConstant::Str(_), t) => t.is_str(),
            (IrConstant::Nil, Type::Nil) => true,
            (IrConstant::Table(entries), Type::Table { key, val }) => entries
                .iter()
                .all(|(k, v)| k.matches_type(key) && v.matches_type(val)),
            _ => false,
        }
    }

    /// Short name of the literal's kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            IrConstant::Int(_) => "int",
            IrConstant::Float(_) => "float",
            IrConstant::Bool(_) => "bool",
            IrConstant::Str(_) => "str",
            IrConstant::Nil => "nil",
            IrConstant::Table(_) => "table",
        }
    }

    /// Look up a key in a table literal
    pub fn table_get(&self, key: &IrConstant) -> Option<&IrConstant> {
        match self {
            IrConstant::Table(entries) => entries.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl std::fmt::Display for IrConstant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrConstant::Str(s) => write!(f, "{:?}", s),
            IrConstant::Table(entries) if entries.is_empty() => write!(f, "[:]"),
            IrConstant::Table(entries) => {
                write!(f, "[")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "]")
            }
            other => write!(f, "{}", other.show()),
        }
    }
}

fn format_int(v: i64) -> String {
    // Integers up to 14 digits print exactly; wider ones follow the float rule.
    if v.unsigned_abs() < 100_000_000_000_000 {
        v.to_string()
    } else {
        format_g(v as f64, SHOW_PRECISION)
    }
}

/// Render `v` like C's `%.{precision}g`
pub fn format_g(v: f64, precision: usize) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let precision = precision.max(1);
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Round to `precision` significant digits first; the exponent of the
    // rounded value decides between fixed and scientific notation.
    let sci = format!("{:.*e}", precision - 1, v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= precision as i32 {
        let mantissa = strip_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        strip_zeros(&format!("{:.*}", decimals, v)).to_string()
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
