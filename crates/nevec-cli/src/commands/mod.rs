pub mod build;
pub mod disasm;
