//! Name resolution errors

use crate::ast::Loc;
use thiserror::Error;

/// Errors that can occur while resolving constant references
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CheckError {
    /// A name that no declaration in the program binds
    #[error("'{name}' is never bound (at {loc}){}", suggestion_suffix(.suggestions))]
    NeverBound {
        /// Referenced name
        name: String,
        /// Location of the reference
        loc: Loc,
        /// Declared names that look similar, best match first
        suggestions: Vec<String>,
    },

    /// A constant declared more than once
    #[error("'{name}' is already declared at {original}")]
    Redeclared {
        /// Constant name
        name: String,
        /// Location of the first declaration
        original: Loc,
        /// Location of the duplicate
        duplicate: Loc,
    },
}

impl CheckError {
    /// Location the diagnostic points at
    pub fn loc(&self) -> Loc {
        match self {
            CheckError::NeverBound { loc, .. } => *loc,
            CheckError::Redeclared { duplicate, .. } => *duplicate,
        }
    }
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!("; did you mean {}?", suggestions.join(", "))
    }
}
