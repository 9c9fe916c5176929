//! Pretty-printing for IR
//!
//! Provides human-readable output for debugging IR structures.

use super::block::Block;
use super::instr::{IrExpr, Tac};
use super::sym::Syms;
use std::fmt::Write;

/// Trait for pretty-printing IR constructs
///
/// Symbols render by name, so printing needs the symbol table.
pub trait PrettyPrint {
    fn pretty_print(&self, syms: &Syms) -> String;
}

impl PrettyPrint for Tac {
    fn pretty_print(&self, syms: &Syms) -> String {
        let name = |id| syms.name(id);
        let rhs = match &self.expr {
            IrExpr::Const(c) => c.to_string(),
            IrExpr::Unary { op, operand } => format!("{}{}", op, name(*operand)),
            IrExpr::Binary { op, left, right } => {
                format!("{} {} {}", name(*left), op, name(*right))
            }
            IrExpr::Concat { left, right } => format!("{} .. {}", name(*left), name(*right)),
            IrExpr::Table { entries } if entries.is_empty() => "[:]".to_string(),
            IrExpr::Table { entries } => {
                let entries: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", name(*k), name(*v)))
                    .collect();
                format!("[{}]", entries.join(", "))
            }
            IrExpr::Lookup { table, key } => format!("{}[{}]", name(*table), name(*key)),
            IrExpr::Print { operand } => return format!("print {}", name(*operand)),
        };
        format!("{} = {}", name(self.dest), rhs)
    }
}

impl PrettyPrint for Block {
    fn pretty_print(&self, syms: &Syms) -> String {
        let mut output = String::new();

        // Block header
        let _ = match &self.label {
            Some(label) => writeln!(output, "{}: ; {}", self.id, label),
            None => writeln!(output, "{}:", self.id),
        };

        for tac in &self.instrs {
            let _ = writeln!(output, "  {}", tac.pretty_print(syms));
        }

        output
    }
}

impl PrettyPrint for [Block] {
    fn pretty_print(&self, syms: &Syms) -> String {
        self.iter().map(|b| b.pretty_print(syms)).collect()
    }
}

impl PrettyPrint for Vec<Block> {
    fn pretty_print(&self, syms: &Syms) -> String {
        self.as_slice().pretty_print(syms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Loc, Type};
    use crate::compiler::ir::{BinaryOp, BlockId, IrConstant, UnaryOp};

    #[test]
    fn test_block_rendering() {
        let mut syms = Syms::new();
        let a = syms.fresh(Type::Int);
        let b = syms.fresh(Type::Int);
        let x = syms.named("x", Type::Int);
        let s = syms.fresh(Type::Str);
        let p = syms.fresh(Type::Nil);

        let mut block = Block::with_label(BlockId(0), "entry");
        block.push(Tac::new(a, IrExpr::Const(IrConstant::Int(2)), Type::Int, Loc::default()));
        block.push(Tac::new(b, IrExpr::Const(IrConstant::Int(3)), Type::Int, Loc::default()));
        block.push(Tac::new(
            x,
            IrExpr::Binary {
                op: BinaryOp::Add,
                left: a,
                right: b,
            },
            Type::Int,
            Loc::default(),
        ));
        block.push(Tac::new(
            s,
            IrExpr::Unary {
                op: UnaryOp::Show,
                operand: x,
            },
            Type::Str,
            Loc::default(),
        ));
        block.push(Tac::new(p, IrExpr::Print { operand: s }, Type::Nil, Loc::default()));

        let expected = "bb0: ; entry\n  t0 = 2\n  t1 = 3\n  x = t0 + t1\n  t2 = show x\n  print t2\n";
        assert_eq!(block.pretty_print(&syms), expected);
    }
}
