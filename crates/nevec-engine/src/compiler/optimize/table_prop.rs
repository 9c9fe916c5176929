//! Table propagation
//!
//! Replaces a table construction whose entries are all literal with a single
//! table literal, and a lookup into a literal table with the entry it finds.
//! Lookups of absent keys stay in the code; the runtime decides what they
//! yield.

use super::{consume_operands, KnownConsts, Pass};
use crate::compiler::error::CompileResult;
use crate::compiler::ir::{Block, IrConstant, IrExpr, Syms, Tac};

/// Table propagation pass
pub struct TablePropagation;

impl TablePropagation {
    /// Create the pass
    pub fn new() -> Self {
        Self
    }
}

impl Default for TablePropagation {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for TablePropagation {
    fn name(&self) -> &'static str {
        "table-propagation"
    }

    fn run(&mut self, block: &mut Block, syms: &mut Syms) -> CompileResult<bool> {
        let mut known = KnownConsts::default();
        let mut out: Vec<Tac> = Vec::with_capacity(block.instrs.len());
        let mut changed = false;

        for tac in std::mem::take(&mut block.instrs) {
            let value = match &tac.expr {
                IrExpr::Const(c) => {
                    known.insert(tac.dest, c.clone());
                    out.push(tac);
                    continue;
                }
                IrExpr::Table { entries } => entries
                    .iter()
                    .map(|(k, v)| Some((known.get(k)?.clone(), known.get(v)?.clone())))
                    .collect::<Option<Vec<_>>>()
                    .map(IrConstant::Table),
                IrExpr::Lookup { table, key } => match (known.get(table), known.get(key)) {
                    (Some(table), Some(key)) => table.table_get(key).cloned(),
                    _ => None,
                },
                _ => None,
            };

            let Some(value) = value else {
                out.push(tac);
                continue;
            };

            log::trace!("propagated table value into {}", syms.name(tac.dest));
            let operands = tac.operands();
            known.insert(tac.dest, value.clone());
            out.push(tac.folded(value));
            consume_operands(&operands, &mut out, syms)?;
            changed = true;
        }

        block.instrs = out;
        Ok(changed)
    }
}
