//! Compilation errors

use crate::ast::{Loc, Type};
use thiserror::Error;

/// Result alias used throughout the compiler core
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors raised by the compiler core
///
/// Apart from `UnsupportedConstruct` and `InvalidConfig`, every variant is a
/// contract violation: an upstream invariant was broken and compilation must
/// stop.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    /// An operator applied outside the type domain it is defined for
    #[error("Malformed IR at {loc}: `{op}` {message}")]
    MalformedIr {
        /// Offending operator
        op: String,
        /// Location of the offending instruction
        loc: Loc,
        /// What is wrong with it
        message: String,
    },

    /// An operator tag without a fold or emit rule
    #[error("Unimplemented operator `{op}` for {ty} at {loc}")]
    UnimplementedOperator {
        /// Offending operator
        op: String,
        /// Result type of the instruction
        ty: Type,
        /// Location of the offending instruction
        loc: Loc,
    },

    /// A tree node whose type was never resolved by the front end
    #[error("Unresolved type {ty} reached the compiler at {loc}")]
    UnresolvedType {
        /// The offending type
        ty: Type,
        /// Location of the node
        loc: Loc,
    },

    /// A symbol the register allocator never assigned a location
    #[error("No allocation for symbol '{sym}' at {loc}")]
    MissingAllocation {
        /// Symbol name
        sym: String,
        /// Location of the instruction referencing it
        loc: Loc,
    },

    /// A reference to a symbol that does not exist (or was already removed)
    #[error("Undefined symbol '{name}' at {loc}")]
    UndefinedSymbol {
        /// Symbol name or handle
        name: String,
        /// Location of the reference
        loc: Loc,
    },

    /// A construct the compiler does not support
    #[error("Unsupported construct at {loc}: {message}")]
    UnsupportedConstruct {
        /// Description of the construct
        message: String,
        /// Location of the construct
        loc: Loc,
    },

    /// Invalid compiler configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong
        message: String,
    },

    /// Internal compiler error
    #[error("Internal compiler error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl CompileError {
    /// Shorthand for an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal {
            message: message.into(),
        }
    }

    /// Shorthand for a malformed-IR error
    pub fn malformed(op: impl std::fmt::Display, loc: Loc, message: impl Into<String>) -> Self {
        CompileError::MalformedIr {
            op: op.to_string(),
            loc,
            message: message.into(),
        }
    }

    /// Whether this error is a user-facing diagnostic rather than a broken invariant
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CompileError::UnsupportedConstruct { .. } | CompileError::InvalidConfig { .. }
        )
    }
}
