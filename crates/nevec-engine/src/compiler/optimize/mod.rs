//! IR Optimization Passes
//!
//! The driver keeps two ordered pass lists. Unconditional passes always run;
//! optional passes run only when optimization is enabled. Each sweep runs
//! the whole list over every block, and sweeps repeat until a sweep leaves
//! the block list structurally unchanged or the sweep cap is reached.
//!
//! Every pass only removes instructions or replaces one with a literal, so
//! the instruction count never grows and the fixpoint is reached quickly;
//! the cap is a backstop.

mod constant_fold;
mod dce;
mod table_prop;

pub use constant_fold::ConstantFolder;
pub use dce::DeadTermEliminator;
pub use table_prop::TablePropagation;

use crate::compiler::error::CompileResult;
use crate::compiler::ir::{instr_count, Block, IrConstant, SymId, Syms, Tac};
use crate::compiler::options::{CompileOptions, DEFAULT_MAX_SWEEPS};

/// A rewrite over one block
pub trait Pass {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Rewrite `block` in place, returning whether anything changed
    fn run(&mut self, block: &mut Block, syms: &mut Syms) -> CompileResult<bool>;
}

/// Statistics about one optimizer run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptStats {
    /// Sweeps executed (the last one made no change unless the cap was hit)
    pub sweeps: usize,
    /// Whether the sweep cap stopped the driver before a fixpoint
    pub hit_cap: bool,
    /// Instruction count before optimization
    pub instrs_before: usize,
    /// Instruction count after optimization
    pub instrs_after: usize,
    /// Symbols dropped by the final cleanup
    pub syms_dropped: usize,
}

/// Optimizer driver
pub struct Opt {
    unconditional: Vec<Box<dyn Pass>>,
    optional: Vec<Box<dyn Pass>>,
    optimize: bool,
    max_sweeps: usize,
}

impl Opt {
    /// Create the standard pipeline
    pub fn new(optimize: bool) -> Self {
        Self {
            unconditional: vec![Box::new(TablePropagation::new())],
            optional: vec![
                Box::new(ConstantFolder::new()),
                Box::new(DeadTermEliminator::new()),
            ],
            optimize,
            max_sweeps: DEFAULT_MAX_SWEEPS,
        }
    }

    /// Create the standard pipeline configured by `options`
    pub fn from_options(options: &CompileOptions) -> Self {
        Self::new(options.optimize).with_max_sweeps(options.max_sweeps)
    }

    /// Create a driver with explicit pass lists
    pub fn with_passes(
        unconditional: Vec<Box<dyn Pass>>,
        optional: Vec<Box<dyn Pass>>,
        optimize: bool,
    ) -> Self {
        Self {
            unconditional,
            optional,
            optimize,
            max_sweeps: DEFAULT_MAX_SWEEPS,
        }
    }

    /// Set the sweep cap
    pub fn with_max_sweeps(mut self, max_sweeps: usize) -> Self {
        self.max_sweeps = max_sweeps.max(1);
        self
    }

    /// Names of the passes that will run, in order
    pub fn pass_names(&self) -> Vec<&'static str> {
        let optional = &self.optional[..self.optional_len()];
        self.unconditional.iter().chain(optional).map(|p| p.name()).collect()
    }

    fn optional_len(&self) -> usize {
        if self.optimize {
            self.optional.len()
        } else {
            0
        }
    }

    /// Run the pipeline over `blocks` until nothing changes
    ///
    /// Removed symbols are dropped from `syms` afterwards.
    pub fn optimize(&mut self, blocks: &mut [Block], syms: &mut Syms) -> CompileResult<OptStats> {
        let mut stats = OptStats {
            instrs_before: instr_count(blocks),
            ..OptStats::default()
        };

        let optional_len = self.optional_len();
        loop {
            if stats.sweeps == self.max_sweeps {
                log::warn!(
                    "optimizer stopped after {} sweeps without reaching a fixpoint",
                    self.max_sweeps
                );
                stats.hit_cap = true;
                break;
            }

            let previous = blocks.to_vec();
            for block in blocks.iter_mut() {
                let optional = self.optional[..optional_len].iter_mut();
                for pass in self.unconditional.iter_mut().chain(optional) {
                    if pass.run(block, syms)? {
                        log::debug!("{} changed {}", pass.name(), block.id);
                    }
                }
            }
            stats.sweeps += 1;
            log::trace!("sweep {}: {} instruction(s)", stats.sweeps, instr_count(blocks));

            if blocks == previous.as_slice() {
                break;
            }
        }

        stats.syms_dropped = syms.cleanup();
        stats.instrs_after = instr_count(blocks);
        log::debug!(
            "optimized {} -> {} instruction(s) in {} sweep(s)",
            stats.instrs_before,
            stats.instrs_after,
            stats.sweeps
        );
        Ok(stats)
    }
}

impl Default for Opt {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Literals defined so far in the block being rewritten
pub(crate) type KnownConsts = rustc_hash::FxHashMap<SymId, IrConstant>;

/// Drop one use of `sym`; once it is propagated and unused, delete its
/// definition from `out` and remove the symbol
pub(crate) fn elide_if_dead(sym: SymId, out: &mut Vec<Tac>, syms: &mut Syms) -> CompileResult<()> {
    syms.unuse(sym)?;
    if syms.is_dead(sym) {
        if let Some(pos) = out.iter().rposition(|t| t.dest == sym) {
            out.remove(pos);
            syms.remove(sym)?;
        }
    }
    Ok(())
}

/// Mark every operand as propagated, then elide the ones left unused
pub(crate) fn consume_operands(operands: &[SymId], out: &mut Vec<Tac>, syms: &mut Syms) -> CompileResult<()> {
    for sym in operands {
        syms.propagate(*sym)?;
    }
    for sym in operands {
        elide_if_dead(*sym, out, syms)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Loc, Type};
    use crate::compiler::ir::{BinaryOp, BlockId, IrExpr};

    /// Test pass that removes one instruction per run, forever
    struct Shrink;

    impl Pass for Shrink {
        fn name(&self) -> &'static str {
            "shrink"
        }

        fn run(&mut self, block: &mut Block, _syms: &mut Syms) -> CompileResult<bool> {
            Ok(block.instrs.pop().is_some())
        }
    }

    fn sum_block(syms: &mut Syms) -> Block {
        let a = syms.fresh(Type::Int);
        let b = syms.fresh(Type::Int);
        let c = syms.fresh(Type::Int);
        syms.add_use(a).unwrap();
        syms.add_use(b).unwrap();
        let mut block = Block::new(BlockId(0));
        block.push(Tac::new(a, IrExpr::Const(IrConstant::Int(1)), Type::Int, Loc::default()));
        block.push(Tac::new(b, IrExpr::Const(IrConstant::Int(2)), Type::Int, Loc::default()));
        block.push(Tac::new(
            c,
            IrExpr::Binary {
                op: BinaryOp::Add,
                left: a,
                right: b,
            },
            Type::Int,
            Loc::default(),
        ));
        block
    }

    #[test]
    fn test_optional_passes_skipped_without_optimize() {
        let opt = Opt::new(false);
        assert_eq!(opt.pass_names(), vec!["table-propagation"]);

        let opt = Opt::new(true);
        assert_eq!(
            opt.pass_names(),
            vec!["table-propagation", "constant-fold", "dead-term-elim"]
        );
    }

    #[test]
    fn test_unoptimized_run_leaves_arithmetic() {
        let mut syms = Syms::new();
        let mut blocks = vec![sum_block(&mut syms)];
        let before = blocks.clone();

        let stats = Opt::new(false).optimize(&mut blocks, &mut syms).unwrap();
        assert_eq!(blocks, before);
        assert_eq!(stats.sweeps, 1);
        assert!(!stats.hit_cap);
    }

    #[test]
    fn test_sweep_cap() {
        let mut syms = Syms::new();
        let mut blocks = vec![sum_block(&mut syms)];

        let mut opt = Opt::with_passes(vec![Box::new(Shrink)], vec![], true).with_max_sweeps(2);
        let stats = opt.optimize(&mut blocks, &mut syms).unwrap();
        assert!(stats.hit_cap);
        assert_eq!(stats.sweeps, 2);
        assert_eq!(blocks[0].len(), 1);
    }

    #[test]
    fn test_fixpoint_stops_when_unchanged() {
        let mut syms = Syms::new();
        let mut blocks = vec![sum_block(&mut syms)];

        let mut opt = Opt::with_passes(vec![Box::new(Shrink)], vec![], true);
        let stats = opt.optimize(&mut blocks, &mut syms).unwrap();
        assert!(blocks[0].is_empty());
        // three shrinking sweeps plus one that sees no change
        assert_eq!(stats.sweeps, 4);
        assert_eq!(stats.instrs_before, 3);
        assert_eq!(stats.instrs_after, 0);
    }
}
