//! Source locations carried by tree nodes and IR instructions

use serde::{Deserialize, Serialize};

/// A 1-based line/column position in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Loc {
    /// Line number (1-based, 0 when unknown)
    pub line: u32,
    /// Column number (1-based, 0 when unknown)
    pub col: u32,
}

impl Loc {
    /// Create a new location
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Whether this location points at real source text
    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl std::fmt::Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_known() {
            write!(f, "{}:{}", self.line, self.col)
        } else {
            write!(f, "<unknown>")
        }
    }
}
