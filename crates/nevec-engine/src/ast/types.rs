//! Static types attached to every typed-tree node

use serde::{Deserialize, Serialize};

/// A resolved (or deliberately unresolved) static type
///
/// Equality is structural: two `Table` types are equal only when both their
/// key and value types are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    /// 64-bit signed integer
    Int,
    /// 64-bit IEEE float
    Float,
    /// Boolean
    Bool,
    /// ASCII string
    Str,
    /// UTF-8 string
    Str8,
    /// UTF-16 string
    Str16,
    /// UTF-32 string
    Str32,
    /// The nil type
    Nil,
    /// Table from `key` to `val`
    Table {
        /// Key type
        key: Box<Type>,
        /// Value type
        val: Box<Type>,
    },
    /// A type error that was already reported
    Unknown,
    /// A symbol not yet bound to a declaration
    Unresolved,
}

impl Type {
    /// Shorthand for a table type
    pub fn table(key: Type, val: Type) -> Self {
        Type::Table {
            key: Box::new(key),
            val: Box::new(val),
        }
    }

    /// Check if this is a numeric type
    pub fn is_num(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Check if this is one of the string types
    pub fn is_str(&self) -> bool {
        matches!(self, Type::Str | Type::Str8 | Type::Str16 | Type::Str32)
    }

    /// Check if this is a table type
    pub fn is_table(&self) -> bool {
        matches!(self, Type::Table { .. })
    }

    /// True unless this type (or a nested one) is `Unknown` or `Unresolved`
    pub fn is_resolved(&self) -> bool {
        match self {
            Type::Unknown | Type::Unresolved => false,
            Type::Table { key, val } => key.is_resolved() && val.is_resolved(),
            _ => true,
        }
    }

    /// The string type able to hold `s`
    pub fn str_for(s: &str) -> Self {
        if s.is_ascii() {
            Type::Str
        } else {
            Type::Str8
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::Bool => write!(f, "Bool"),
            Type::Str => write!(f, "Str"),
            Type::Str8 => write!(f, "Str8"),
            Type::Str16 => write!(f, "Str16"),
            Type::Str32 => write!(f, "Str32"),
            Type::Nil => write!(f, "Nil"),
            Type::Table { key, val } => write!(f, "[{}: {}]", key, val),
            Type::Unknown => write!(f, "?Unknown"),
            Type::Unresolved => write!(f, "?Unresolved"),
        }
    }
}
