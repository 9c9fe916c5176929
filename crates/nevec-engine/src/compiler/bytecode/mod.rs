//! Geada bytecode
//!
//! Instruction encoding, the constant pool, the program image with its
//! checksummed header, and a disassembler.

pub mod constants;
pub mod disasm;
pub mod encoder;
pub mod opcode;
pub mod program;

pub use constants::ConstantPool;
pub use disasm::disassemble;
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use opcode::{CodeWriter, GeadaOpcode, Instr, InstrFormat};
pub use program::{flags, Program, ProgramError, MAGIC, VERSION};
