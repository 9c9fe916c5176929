//! Dead Term Elimination
//!
//! Removes instructions whose results are never used.

use super::Pass;
use crate::compiler::error::CompileResult;
use crate::compiler::ir::{Block, Syms};

/// Dead term eliminator
pub struct DeadTermEliminator;

impl DeadTermEliminator {
    /// Create a new pass
    pub fn new() -> Self {
        Self
    }
}

impl Default for DeadTermEliminator {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for DeadTermEliminator {
    fn name(&self) -> &'static str {
        "dead-term-elim"
    }

    /// Walks the block backwards so that dropping a use is seen before the
    /// operand's own definition; whole dead chains go in one run.
    fn run(&mut self, block: &mut Block, syms: &mut Syms) -> CompileResult<bool> {
        let before = block.len();
        let mut kept = Vec::with_capacity(before);

        for tac in std::mem::take(&mut block.instrs).into_iter().rev() {
            if tac.expr.has_side_effects() || syms.uses(tac.dest) > 0 {
                kept.push(tac);
                continue;
            }
            log::trace!("dropping unused {}", syms.name(tac.dest));
            for operand in tac.operands() {
                syms.unuse(operand)?;
            }
            syms.remove(tac.dest)?;
        }

        kept.reverse();
        block.instrs = kept;
        Ok(block.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Loc, Type};
    use crate::compiler::ir::{BinaryOp, BlockId, IrConstant, IrExpr, PrettyPrint, Tac};

    #[test]
    fn test_removes_unused_chain() {
        let mut syms = Syms::new();
        let a = syms.fresh(Type::Int);
        let b = syms.fresh(Type::Int);
        let c = syms.fresh(Type::Int);
        let kept = syms.named("k", Type::Int);
        let p = syms.fresh(Type::Nil);
        syms.add_use(a).unwrap();
        syms.add_use(b).unwrap();
        syms.add_use(kept).unwrap();

        let mut block = Block::with_label(BlockId(0), "entry");
        block.push(Tac::new(a, IrExpr::Const(IrConstant::Int(1)), Type::Int, Loc::default()));
        block.push(Tac::new(b, IrExpr::Const(IrConstant::Int(2)), Type::Int, Loc::default()));
        block.push(Tac::new(
            c,
            IrExpr::Binary {
                op: BinaryOp::Sub,
                left: a,
                right: b,
            },
            Type::Int,
            Loc::default(),
        ));
        block.push(Tac::new(kept, IrExpr::Const(IrConstant::Int(9)), Type::Int, Loc::default()));
        block.push(Tac::new(p, IrExpr::Print { operand: kept }, Type::Nil, Loc::default()));

        assert!(DeadTermEliminator::new().run(&mut block, &mut syms).unwrap());
        assert_eq!(block.pretty_print(&syms), "bb0: ; entry\n  k = 9\n  print k\n");
        for sym in [a, b, c] {
            assert!(!syms.contains(sym));
        }
        assert!(!DeadTermEliminator::new().run(&mut block, &mut syms).unwrap());
    }
}
