//! Register allocation
//!
//! Liveness feeds an interference graph, which a simplify/select colorer
//! maps onto K physical registers. Symbols that do not fit get an indexed
//! spill slot each; the emitter moves them through three scratch registers
//! reserved just above the palette.

pub mod color;
pub mod interference;
pub mod liveness;

pub use color::{Allocation, Location, RegisterAllocator};
pub use interference::InterferenceGraph;
pub use liveness::{Liveness, ProgramPoint};

/// Scratch registers reserved above K for spill traffic
pub const SCRATCH_REGISTERS: usize = 3;
