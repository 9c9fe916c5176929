//! Intermediate Representation (IR) for Nevec
//!
//! The IR sits between the typed tree and bytecode generation. It uses
//! Three-Address Code (TAC) grouped into basic blocks.
//!
//! # Structure
//!
//! - `Syms` - Arena owning every symbol, addressed by `SymId`
//! - `Block` - A straight-line sequence of instructions
//! - `Tac` - One instruction: destination symbol, operation, type, location
//! - `IrConstant` - Literal values

pub mod block;
pub mod instr;
pub mod pretty;
pub mod sym;
pub mod value;

pub use block::{instr_count, Block, BlockId};
pub use instr::{BinaryOp, IrExpr, Tac, UnaryOp};
pub use pretty::PrettyPrint;
pub use sym::{Sym, SymId, Syms};
pub use value::IrConstant;
