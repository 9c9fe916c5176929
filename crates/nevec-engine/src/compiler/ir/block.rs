//! Basic blocks
//!
//! A block is a maximal straight-line run of instructions and the unit of
//! optimization and liveness analysis.

use super::instr::Tac;

/// Basic block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    /// Create a block id
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw index
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A straight-line sequence of instructions
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Unique identifier for this block
    pub id: BlockId,
    /// Optional label for debugging
    pub label: Option<String>,
    /// Instructions in definition order
    pub instrs: Vec<Tac>,
}

impl Block {
    /// Create a new empty block
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            label: None,
            instrs: Vec::new(),
        }
    }

    /// Create a new block with a label
    pub fn with_label(id: BlockId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: Some(label.into()),
            instrs: Vec::new(),
        }
    }

    /// Append an instruction
    pub fn push(&mut self, tac: Tac) {
        self.instrs.push(tac);
    }

    /// Get the number of instructions
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Check if this block has no instructions
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }
}

/// Total instruction count over a block list
pub fn instr_count(blocks: &[Block]) -> usize {
    blocks.iter().map(Block::len).sum()
}
