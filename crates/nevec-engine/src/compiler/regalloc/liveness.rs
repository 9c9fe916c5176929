//! Liveness over straight-line blocks
//!
//! Blocks run in list order, each falling through to the next, so liveness
//! is a single backward scan: the live-out set of a block is the live-in set
//! of its successor.

use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::ir::{Block, SymId, Syms};
use std::collections::BTreeSet;

/// Live symbols around one instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramPoint {
    /// Symbol defined by the instruction, if it holds a runtime value
    pub def: Option<SymId>,
    /// Symbols read by the instruction
    pub uses: Vec<SymId>,
    /// The definition is written before `uses` are read
    pub early_def: bool,
    /// Symbols whose value is still needed after the instruction
    pub live_after: BTreeSet<SymId>,
}

/// Liveness for every instruction, block by block
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    /// One entry per block, one point per instruction, in program order
    pub points: Vec<Vec<ProgramPoint>>,
}

impl Liveness {
    /// Compute liveness for `blocks`
    ///
    /// A value read before any definition reaches it is an error: there is
    /// nothing live on entry to the program.
    pub fn compute(blocks: &[Block], syms: &Syms) -> CompileResult<Self> {
        let mut points = vec![Vec::new(); blocks.len()];
        let mut live: BTreeSet<SymId> = BTreeSet::new();

        for (index, block) in blocks.iter().enumerate().rev() {
            let mut block_points = Vec::with_capacity(block.len());
            for tac in block.instrs.iter().rev() {
                let def = tac.defines_value().then_some(tac.dest);
                let uses = tac.operands();
                block_points.push(ProgramPoint {
                    def,
                    uses: uses.clone(),
                    early_def: tac.expr.writes_before_reading(),
                    live_after: live.clone(),
                });

                live.remove(&tac.dest);
                live.extend(uses);
            }
            block_points.reverse();
            points[index] = block_points;
        }

        if let Some(sym) = live.first() {
            return Err(CompileError::internal(format!(
                "'{}' is read before it is defined",
                syms.name(*sym)
            )));
        }
        Ok(Self { points })
    }

    /// All points in program order
    pub fn iter(&self) -> impl Iterator<Item = &ProgramPoint> {
        self.points.iter().flatten()
    }

    /// Largest number of values live at once
    pub fn max_pressure(&self) -> usize {
        self.iter()
            .map(|p| p.live_after.len() + usize::from(p.def.is_some_and(|d| !p.live_after.contains(&d))))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Loc, Type};
    use crate::compiler::ir::{BinaryOp, BlockId, IrConstant, IrExpr, Tac};

    #[test]
    fn test_live_ranges() {
        let mut syms = Syms::new();
        let a = syms.fresh(Type::Int);
        let b = syms.fresh(Type::Int);
        let c = syms.fresh(Type::Int);
        let p = syms.fresh(Type::Nil);

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
        block.push(Tac::new(p, IrExpr::Print { operand: c }, Type::Nil, Loc::default()));

        let liveness = Liveness::compute(&[block], &syms).unwrap();
        let points = &liveness.points[0];
        assert_eq!(points[0].live_after, BTreeSet::from([a]));
        assert_eq!(points[1].live_after, BTreeSet::from([a, b]));
        assert_eq!(points[2].live_after, BTreeSet::from([c]));
        assert!(points[3].live_after.is_empty());
        assert_eq!(points[3].def, None);
        assert_eq!(liveness.max_pressure(), 2);
    }

    #[test]
    fn test_use_before_def_is_an_error() {
        let mut syms = Syms::new();
        let a = syms.fresh(Type::Int);
        let p = syms.fresh(Type::Nil);
        let mut block = Block::new(BlockId(0));
        block.push(Tac::new(p, IrExpr::Print { operand: a }, Type::Nil, Loc::default()));
        assert!(Liveness::compute(&[block], &syms).is_err());
    }
}
