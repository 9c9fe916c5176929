//! Nevec compiler engine
//!
//! This crate provides the middle and back end of the Nevec toolchain:
//! - **AST**: the typed syntax tree handed over by the front end (`ast` module)
//! - **Checker**: two-pass name resolution with suggestions (`checker` module)
//! - **Compiler**: IR, optimizer, register allocation, and Geada bytecode (`compiler` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use nevec_engine::{ast, Compiler, CompileOptions};
//!
//! let tree = ast::Program::from_json(&std::fs::read_to_string("prog.neve.json")?)?;
//! let bytes = Compiler::new(CompileOptions::default()).compile_to_bytes(&tree)?;
//! std::fs::write("prog.geada", bytes)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::new_without_default)]

/// Typed syntax tree
pub mod ast;

/// Name resolution over the typed tree
pub mod checker;

/// Compiler module: IR, optimizations, register allocation, and bytecode generation
pub mod compiler;

pub use checker::{resolve, CheckError, Env};

pub use compiler::{
    // Bytecode
    bytecode::{disassemble, ConstantPool, DecodeError, GeadaOpcode, Program, ProgramError},
    // IR
    ir,
    // Compiler
    output_path_for, CompileError, CompileOptions, CompileResult, Compiled, Compiler, ConfigError,
};
