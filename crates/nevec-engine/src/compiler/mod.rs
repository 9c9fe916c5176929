//! Nevec compiler core
//!
//! Pipeline: typed tree → IR (`lower`) → optimizer fixpoint (`optimize`) →
//! interference graph and coloring (`regalloc`) → Geada program image
//! (`codegen`, `bytecode`).

pub mod bytecode;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod lower;
pub mod optimize;
pub mod options;
pub mod regalloc;

pub use codegen::CodeGenerator;
pub use error::{CompileError, CompileResult};
pub use lower::{build_ir, Lowerer};
pub use optimize::{Opt, OptStats, Pass};
pub use options::{CompileOptions, ConfigError};
pub use regalloc::{Allocation, InterferenceGraph, Location, RegisterAllocator};

use crate::ast;
use bytecode::Program;
use ir::{Block, Syms};
use std::path::{Path, PathBuf};

/// Extension of compiled program images
pub const OUTPUT_EXTENSION: &str = "geada";

/// Everything the pipeline produced for one program
#[derive(Debug)]
pub struct Compiled {
    /// The program image
    pub program: Program,
    /// Optimized IR
    pub blocks: Vec<Block>,
    /// Symbols left after optimization
    pub syms: Syms,
    /// Interference graph of the optimized IR
    pub graph: InterferenceGraph,
    /// Register assignment
    pub allocation: Allocation,
    /// Optimizer statistics
    pub stats: OptStats,
}

/// Main compiler entry point
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a compiler with the given options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Options in effect
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Run the whole pipeline over a typed tree
    pub fn compile(&self, tree: &ast::Program) -> CompileResult<Compiled> {
        self.options.validate()?;

        let (mut blocks, mut syms) = build_ir(tree)?;
        log::debug!("lowered {} instruction(s)", ir::instr_count(&blocks));

        let stats = Opt::from_options(&self.options).optimize(&mut blocks, &mut syms)?;

        let graph = InterferenceGraph::build(&blocks, &syms, self.options.debug_graph)?;
        let allocation = RegisterAllocator::new(self.options.registers as usize)?.allocate(&graph);

        let program = codegen::compile(
            &blocks,
            &syms,
            &allocation,
            self.options.registers,
            self.options.debug_info,
        )?;

        Ok(Compiled {
            program,
            blocks,
            syms,
            graph,
            allocation,
            stats,
        })
    }

    /// Compile a tree straight to the bytes of a `.geada` file
    pub fn compile_to_bytes(&self, tree: &ast::Program) -> CompileResult<Vec<u8>> {
        Ok(self.compile(tree)?.program.encode())
    }
}

/// Output path for an input tree: `.json` and then `.neve` are stripped and
/// `.geada` appended (`prog.neve.json` → `prog.geada`)
pub fn output_path_for(input: &Path) -> PathBuf {
    let mut path = input.to_path_buf();
    for ext in ["json", "neve"] {
        if path.extension().is_some_and(|e| e == ext) {
            path.set_extension("");
        }
    }
    path.set_extension(OUTPUT_EXTENSION);
    path
}
