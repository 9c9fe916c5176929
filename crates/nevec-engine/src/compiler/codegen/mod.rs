//! Register code generator: allocated IR → Geada program image
//!
//! Each Tac becomes one or more fixed-width instructions. Operands are read
//! from their assigned register; a spilled operand is first loaded into one
//! of the scratch registers above the palette, and a spilled destination is
//! computed into scratch and then stored back to its slot.

use crate::ast::{Loc, Type};
use crate::compiler::bytecode::{flags, CodeWriter, ConstantPool, GeadaOpcode, Program};
use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::ir::{BinaryOp, Block, IrConstant, IrExpr, SymId, Syms, Tac, UnaryOp};
use crate::compiler::regalloc::{Allocation, Location, SCRATCH_REGISTERS};

/// Scratch register roles, as offsets above the palette
const SCRATCH_LEFT: u8 = 0;
const SCRATCH_RIGHT: u8 = 1;
const SCRATCH_DEST: u8 = 2;

/// Where a destination value is computed before it lands in its location
struct Dest {
    reg: u8,
    slot: Option<u16>,
}

/// Translates allocated blocks into a program image
pub struct CodeGenerator<'a> {
    syms: &'a Syms,
    allocation: &'a Allocation,
    /// First scratch register (the palette size K)
    scratch_base: u8,
    debug_info: bool,
    writer: CodeWriter,
    constants: ConstantPool,
    lines: Vec<Loc>,
}

impl<'a> CodeGenerator<'a> {
    /// Create a generator for a palette of `k` registers
    pub fn new(syms: &'a Syms, allocation: &'a Allocation, k: u8) -> Self {
        Self {
            syms,
            allocation,
            scratch_base: k,
            debug_info: true,
            writer: CodeWriter::new(),
            constants: ConstantPool::new(),
            lines: Vec::new(),
        }
    }

    /// Enable or disable the line table
    pub fn with_debug_info(mut self, debug_info: bool) -> Self {
        self.debug_info = debug_info;
        self
    }

    /// Emit every block in order, then `HALT`
    pub fn generate(mut self, blocks: &[Block]) -> CompileResult<Program> {
        for block in blocks {
            for tac in &block.instrs {
                self.emit_tac(tac)?;
                self.mark_lines(tac.loc);
            }
        }
        self.writer.emit_a(GeadaOpcode::Halt, 0);
        self.mark_lines(Loc::default());

        let spilled = self.allocation.slot_count() > 0;
        let register_count = if spilled {
            self.scratch_base as usize + SCRATCH_REGISTERS
        } else {
            self.allocation.register_count()
        };

        let mut program = Program::new();
        program.register_count = register_count as u16;
        program.slot_count = self.allocation.slot_count() as u32;
        program.constants = self.constants;
        program.code = self.writer.finish();
        if self.debug_info {
            program.flags |= flags::HAS_DEBUG_INFO;
            program.lines = self.lines;
        }

        log::debug!(
            "emitted {} word(s), {} constant(s), {} register(s), {} slot(s)",
            program.code.len(),
            program.constants.len(),
            program.register_count,
            program.slot_count
        );
        Ok(program)
    }

    fn mark_lines(&mut self, loc: Loc) {
        let len = self.writer.len();
        self.lines.resize(len, loc);
    }

    fn emit_tac(&mut self, tac: &Tac) -> CompileResult<()> {
        match &tac.expr {
            IrExpr::Print { operand } => {
                let reg = self.read(*operand, SCRATCH_LEFT, tac.loc)?;
                self.writer.emit_a(GeadaOpcode::Print, reg);
            }
            IrExpr::Const(value) => {
                let dest = self.dest(tac)?;
                self.load_constant(dest.reg, value, tac.loc)?;
                self.store(dest);
            }
            IrExpr::Unary { op, operand } => {
                let opcode = self.unary_opcode(*op, *operand, tac)?;
                let src = self.read(*operand, SCRATCH_LEFT, tac.loc)?;
                let dest = self.dest(tac)?;
                self.writer.emit_ab(opcode, dest.reg, src);
                self.store(dest);
            }
            IrExpr::Binary { op, left, right } => {
                let opcode = self.binary_opcode(*op, *left, *right, tac)?;
                self.emit_three(opcode, *left, *right, tac)?;
            }
            IrExpr::Concat { left, right } => {
                if !tac.ty.is_str() {
                    return Err(CompileError::malformed("..", tac.loc, format!("produces {}", tac.ty)));
                }
                self.emit_three(GeadaOpcode::Sconcat, *left, *right, tac)?;
            }
            IrExpr::Lookup { table, key } => {
                self.emit_three(GeadaOpcode::TableGet, *table, *key, tac)?;
            }
            IrExpr::Table { entries } => {
                let count = u16::try_from(entries.len()).map_err(|_| CompileError::UnsupportedConstruct {
                    message: format!("table literal with {} entries", entries.len()),
                    loc: tac.loc,
                })?;
                let dest = self.dest(tac)?;
                self.writer.emit_abx(GeadaOpcode::NewTable, dest.reg, count);
                for (key, val) in entries {
                    let key = self.read(*key, SCRATCH_LEFT, tac.loc)?;
                    let val = self.read(*val, SCRATCH_RIGHT, tac.loc)?;
                    self.writer.emit_abc(GeadaOpcode::TableSet, dest.reg, key, val);
                }
                self.store(dest);
            }
        }
        Ok(())
    }

    /// `dest = left op right`
    fn emit_three(&mut self, opcode: GeadaOpcode, left: SymId, right: SymId, tac: &Tac) -> CompileResult<()> {
        let b = self.read(left, SCRATCH_LEFT, tac.loc)?;
        let c = self.read(right, SCRATCH_RIGHT, tac.loc)?;
        let dest = self.dest(tac)?;
        self.writer.emit_abc(opcode, dest.reg, b, c);
        self.store(dest);
        Ok(())
    }

    fn location(&self, sym: SymId, loc: Loc) -> CompileResult<Location> {
        self.allocation.get(sym).ok_or_else(|| CompileError::MissingAllocation {
            sym: self.syms.name(sym),
            loc,
        })
    }

    fn slot_index(slot: u32, loc: Loc) -> CompileResult<u16> {
        u16::try_from(slot).map_err(|_| CompileError::UnsupportedConstruct {
            message: format!("spill slot {} is out of range", slot),
            loc,
        })
    }

    /// Register holding `sym`, loading it into scratch if it is spilled
    fn read(&mut self, sym: SymId, scratch: u8, loc: Loc) -> CompileResult<u8> {
        match self.location(sym, loc)? {
            Location::Register(reg) => Ok(reg),
            Location::Spill(slot) => {
                let reg = self.scratch_base + scratch;
                self.writer
                    .emit_abx(GeadaOpcode::LoadSlot, reg, Self::slot_index(slot, loc)?);
                Ok(reg)
            }
        }
    }

    fn dest(&self, tac: &Tac) -> CompileResult<Dest> {
        match self.location(tac.dest, tac.loc)? {
            Location::Register(reg) => Ok(Dest { reg, slot: None }),
            Location::Spill(slot) => Ok(Dest {
                reg: self.scratch_base + SCRATCH_DEST,
                slot: Some(Self::slot_index(slot, tac.loc)?),
            }),
        }
    }

    fn store(&mut self, dest: Dest) {
        if let Some(slot) = dest.slot {
            self.writer.emit_abx(GeadaOpcode::StoreSlot, dest.reg, slot);
        }
    }

    fn load_constant(&mut self, reg: u8, value: &IrConstant, loc: Loc) -> CompileResult<()> {
        match value {
            IrConstant::Nil => {
                self.writer.emit_a(GeadaOpcode::LoadNil, reg);
            }
            IrConstant::Bool(true) => {
                self.writer.emit_a(GeadaOpcode::LoadTrue, reg);
            }
            IrConstant::Bool(false) => {
                self.writer.emit_a(GeadaOpcode::LoadFalse, reg);
            }
            IrConstant::Int(v) if i16::try_from(*v).is_ok() => {
                self.writer.emit_asbx(GeadaOpcode::LoadInt, reg, *v as i16);
            }
            _ => {
                let index = self.constants.add(value);
                let index = u16::try_from(index).map_err(|_| CompileError::UnsupportedConstruct {
                    message: "more than 65536 distinct constants".to_string(),
                    loc,
                })?;
                self.writer.emit_abx(GeadaOpcode::LoadConst, reg, index);
            }
        }
        Ok(())
    }

    fn unary_opcode(&self, op: UnaryOp, operand: SymId, tac: &Tac) -> CompileResult<GeadaOpcode> {
        let operand_ty = self.syms.ty(operand)?;
        let opcode = match op {
            UnaryOp::Neg => match operand_ty {
                Type::Int => GeadaOpcode::Ineg,
                Type::Float => GeadaOpcode::Fneg,
                other => return Err(CompileError::malformed(op.to_string(), tac.loc, format!("applied to {}", other))),
            },
            UnaryOp::Not => GeadaOpcode::Not,
            UnaryOp::IsZero if operand_ty.is_num() => GeadaOpcode::IsZero,
            UnaryOp::IsZero => {
                return Err(CompileError::malformed("is_zero", tac.loc, format!("applied to {}", operand_ty)));
            }
            UnaryOp::IsNil => GeadaOpcode::IsNil,
            UnaryOp::IsNotNil => GeadaOpcode::IsNotNil,
            UnaryOp::Show => GeadaOpcode::ToString,
        };
        Ok(opcode)
    }

    /// Select the typed binary opcode from the operand types
    fn binary_opcode(&self, op: BinaryOp, left: SymId, right: SymId, tac: &Tac) -> CompileResult<GeadaOpcode> {
        let left_ty = self.syms.ty(left)?;
        let right_ty = self.syms.ty(right)?;
        let is_float = matches!(left_ty, Type::Float) || matches!(right_ty, Type::Float);
        let malformed = || {
            CompileError::malformed(op, tac.loc, format!("applied to {} and {}", left_ty, right_ty))
        };

        if op.is_arith() {
            if !(left_ty.is_num() && right_ty.is_num()) {
                return Err(malformed());
            }
            return Ok(if is_float { float_opcode(op) } else { int_opcode(op) });
        }
        if op.is_bitwise() {
            if !(matches!(left_ty, Type::Int) && matches!(right_ty, Type::Int)) {
                return Err(malformed());
            }
            return Ok(int_opcode(op));
        }

        // Comparisons
        if left_ty.is_num() && right_ty.is_num() {
            Ok(if is_float { float_opcode(op) } else { int_opcode(op) })
        } else if left_ty.is_str() && right_ty.is_str() {
            Ok(string_opcode(op))
        } else if matches!((left_ty, right_ty), (Type::Bool, Type::Bool)) {
            Ok(int_opcode(op))
        } else {
            match op {
                BinaryOp::Eq => Ok(GeadaOpcode::Eq),
                BinaryOp::Neq => Ok(GeadaOpcode::Ne),
                _ => Err(malformed()),
            }
        }
    }
}

fn int_opcode(op: BinaryOp) -> GeadaOpcode {
    match op {
        BinaryOp::Add => GeadaOpcode::Iadd,
        BinaryOp::Sub => GeadaOpcode::Isub,
        BinaryOp::Mul => GeadaOpcode::Imul,
        BinaryOp::Div => GeadaOpcode::Idiv,
        BinaryOp::Shl => GeadaOpcode::Ishl,
        BinaryOp::Shr => GeadaOpcode::Ishr,
        BinaryOp::BitAnd => GeadaOpcode::Iand,
        BinaryOp::BitOr => GeadaOpcode::Ior,
        BinaryOp::BitXor => GeadaOpcode::Ixor,
        BinaryOp::Eq => GeadaOpcode::Ieq,
        BinaryOp::Neq => GeadaOpcode::Ine,
        BinaryOp::Lt => GeadaOpcode::Ilt,
        BinaryOp::Lte => GeadaOpcode::Ile,
        BinaryOp::Gt => GeadaOpcode::Igt,
        BinaryOp::Gte => GeadaOpcode::Ige,
    }
}

/// Float form of an arithmetic or comparison operator
fn float_opcode(op: BinaryOp) -> GeadaOpcode {
    match op {
        BinaryOp::Add => GeadaOpcode::Fadd,
        BinaryOp::Sub => GeadaOpcode::Fsub,
        BinaryOp::Mul => GeadaOpcode::Fmul,
        BinaryOp::Div => GeadaOpcode::Fdiv,
        BinaryOp::Eq => GeadaOpcode::Feq,
        BinaryOp::Neq => GeadaOpcode::Fne,
        BinaryOp::Lt => GeadaOpcode::Flt,
        BinaryOp::Lte => GeadaOpcode::Fle,
        BinaryOp::Gt => GeadaOpcode::Fgt,
        BinaryOp::Gte => GeadaOpcode::Fge,
        other => int_opcode(other),
    }
}

fn string_opcode(op: BinaryOp) -> GeadaOpcode {
    match op {
        BinaryOp::Eq => GeadaOpcode::Seq,
        BinaryOp::Neq => GeadaOpcode::Sne,
        BinaryOp::Lt => GeadaOpcode::Slt,
        BinaryOp::Lte => GeadaOpcode::Sle,
        BinaryOp::Gt => GeadaOpcode::Sgt,
        BinaryOp::Gte => GeadaOpcode::Sge,
        other => int_opcode(other),
    }
}

/// Emit `blocks` as a program image
///
/// `k` is the palette the allocation was computed for; scratch registers
/// start at `k`.
pub fn compile(
    blocks: &[Block],
    syms: &Syms,
    allocation: &Allocation,
    k: u8,
    debug_info: bool,
) -> CompileResult<Program> {
    CodeGenerator::new(syms, allocation, k)
        .with_debug_info(debug_info)
        .generate(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::bytecode::Instr;
    use crate::compiler::ir::BlockId;

    fn listing(program: &Program) -> Vec<String> {
        program.instrs().map(|i| i.to_string()).collect()
    }

    fn block(instrs: Vec<Tac>) -> Vec<Block> {
        let mut block = Block::new(BlockId(0));
        block.instrs = instrs;
        vec![block]
    }

    fn at(sym: SymId, location: Location, allocation: &mut Allocation) {
        allocation.locations.insert(sym, location);
    }

    #[test]
    fn test_load_and_print() {
        let mut syms = Syms::new();
        let x = syms.named("x", Type::Int);
        let p = syms.fresh(Type::Nil);
        let blocks = block(vec![
            Tac::new(x, IrExpr::Const(IrConstant::Int(5)), Type::Int, Loc::new(1, 7)),
            Tac::new(p, IrExpr::Print { operand: x }, Type::Nil, Loc::new(2, 1)),
        ]);
        let mut allocation = Allocation::default();
        at(x, Location::Register(0), &mut allocation);

        let program = compile(&blocks, &syms, &allocation, 1, true).unwrap();
        assert_eq!(listing(&program), vec!["LOAD_INT r0, 5", "PRINT r0", "HALT"]);
        assert_eq!(program.register_count, 1);
        assert_eq!(program.lines, vec![Loc::new(1, 7), Loc::new(2, 1), Loc::default()]);
        assert!(program.has_debug_info());
    }

    #[test]
    fn test_wide_constants_go_to_pool() {
        let mut syms = Syms::new();
        let a = syms.fresh(Type::Int);
        let b = syms.fresh(Type::Str);
        let c = syms.fresh(Type::Int);
        let blocks = block(vec![
            Tac::new(a, IrExpr::Const(IrConstant::Int(100_000)), Type::Int, Loc::default()),
            Tac::new(b, IrExpr::Const(IrConstant::Str("hi".into())), Type::Str, Loc::default()),
            Tac::new(c, IrExpr::Const(IrConstant::Int(100_000)), Type::Int, Loc::default()),
        ]);
        let mut allocation = Allocation::default();
        at(a, Location::Register(0), &mut allocation);
        at(b, Location::Register(1), &mut allocation);
        at(c, Location::Register(0), &mut allocation);

        let program = compile(&blocks, &syms, &allocation, 4, false).unwrap();
        assert_eq!(
            listing(&program),
            vec!["LOAD_CONST r0, k0", "LOAD_CONST r1, k1", "LOAD_CONST r0, k0", "HALT"]
        );
        assert_eq!(program.constants.len(), 2);
        assert!(program.lines.is_empty());
    }

    #[test]
    fn test_typed_opcode_selection() {
        let mut syms = Syms::new();
        let a = syms.fresh(Type::Float);
        let b = syms.fresh(Type::Int);
        let c = syms.fresh(Type::Bool);
        let s = syms.fresh(Type::Str);
        let d = syms.fresh(Type::Bool);
        let blocks = block(vec![
            Tac::new(a, IrExpr::Const(IrConstant::Float(1.5)), Type::Float, Loc::default()),
            Tac::new(b, IrExpr::Const(IrConstant::Int(2)), Type::Int, Loc::default()),
            Tac::new(
                c,
                IrExpr::Binary {
                    op: BinaryOp::Lt,
                    left: a,
                    right: b,
                },
                Type::Bool,
                Loc::default(),
            ),
            Tac::new(
                s,
                IrExpr::Unary {
                    op: UnaryOp::Show,
                    operand: c,
                },
                Type::Str,
                Loc::default(),
            ),
            Tac::new(
                d,
                IrExpr::Binary {
                    op: BinaryOp::Eq,
                    left: s,
                    right: s,
                },
                Type::Bool,
                Loc::default(),
            ),
        ]);
        let mut allocation = Allocation::default();
        for (i, sym) in [a, b, c, s, d].into_iter().enumerate() {
            at(sym, Location::Register(i as u8), &mut allocation);
        }

        let program = compile(&blocks, &syms, &allocation, 8, false).unwrap();
        let ops: Vec<_> = program.instrs().filter_map(Instr::opcode).collect();
        assert_eq!(
            ops,
            vec![
                GeadaOpcode::LoadConst,
                GeadaOpcode::LoadInt,
                GeadaOpcode::Flt,
                GeadaOpcode::ToString,
                GeadaOpcode::Seq,
                GeadaOpcode::Halt,
            ]
        );
    }

    #[test]
    fn test_spilled_symbols_use_scratch() {
        let mut syms = Syms::new();
        let a = syms.fresh(Type::Int);
        let b = syms.fresh(Type::Int);
        let c = syms.fresh(Type::Int);
        let blocks = block(vec![
            Tac::new(a, IrExpr::Const(IrConstant::Int(1)), Type::Int, Loc::default()),
            Tac::new(b, IrExpr::Const(IrConstant::Int(2)), Type::Int, Loc::default()),
            Tac::new(
                c,
                IrExpr::Binary {
                    op: BinaryOp::Add,
                    left: a,
                    right: b,
                },
                Type::Int,
                Loc::default(),
            ),
        ]);
        let mut allocation = Allocation::default();
        at(a, Location::Register(0), &mut allocation);
        at(b, Location::Spill(0), &mut allocation);
        at(c, Location::Spill(1), &mut allocation);

        let program = compile(&blocks, &syms, &allocation, 1, false).unwrap();
        assert_eq!(
            listing(&program),
            vec![
                "LOAD_INT r0, 1",
                "LOAD_INT r3, 2",
                "STORE_SLOT r3, slot0",
                "LOAD_SLOT r2, slot0",
                "IADD r3, r0, r2",
                "STORE_SLOT r3, slot1",
                "HALT",
            ]
        );
        assert_eq!(program.register_count, 4);
        assert_eq!(program.slot_count, 2);
    }

    #[test]
    fn test_table_construction() {
        let mut syms = Syms::new();
        let k = syms.fresh(Type::Str);
        let v = syms.fresh(Type::Int);
        let t = syms.fresh(Type::table(Type::Str, Type::Int));
        let blocks = block(vec![
            Tac::new(k, IrExpr::Const(IrConstant::Str("a".into())), Type::Str, Loc::default()),
            Tac::new(v, IrExpr::Const(IrConstant::Int(1)), Type::Int, Loc::default()),
            Tac::new(
                t,
                IrExpr::Table {
                    entries: vec![(k, v)],
                },
                Type::table(Type::Str, Type::Int),
                Loc::default(),
            ),
        ]);
        let mut allocation = Allocation::default();
        at(k, Location::Register(0), &mut allocation);
        at(v, Location::Register(1), &mut allocation);
        at(t, Location::Register(2), &mut allocation);

        let program = compile(&blocks, &syms, &allocation, 3, false).unwrap();
        assert_eq!(
            listing(&program)[2..],
            ["NEW_TABLE r2, 1", "TABLE_SET r2, r0, r1", "HALT"]
        );
    }

    #[test]
    fn test_missing_allocation() {
        let mut syms = Syms::new();
        let x = syms.named("x", Type::Int);
        let blocks = block(vec![Tac::new(
            x,
            IrExpr::Const(IrConstant::Int(5)),
            Type::Int,
            Loc::new(3, 4),
        )]);

        let err = compile(&blocks, &syms, &Allocation::default(), 4, false).unwrap_err();
        assert_eq!(
            err,
            CompileError::MissingAllocation {
                sym: "x".to_string(),
                loc: Loc::new(3, 4),
            }
        );
    }

    #[test]
    fn test_ordering_tables_is_malformed() {
        let ty = Type::table(Type::Int, Type::Int);
        let mut syms = Syms::new();
        let a = syms.fresh(ty.clone());
        let b = syms.fresh(Type::Bool);
        let blocks = block(vec![
            Tac::new(a, IrExpr::Table { entries: vec![] }, ty, Loc::default()),
            Tac::new(
                b,
                IrExpr::Binary {
                    op: BinaryOp::Lt,
                    left: a,
                    right: a,
                },
                Type::Bool,
                Loc::default(),
            ),
        ]);
        let mut allocation = Allocation::default();
        at(a, Location::Register(0), &mut allocation);
        at(b, Location::Register(1), &mut allocation);

        assert!(matches!(
            compile(&blocks, &syms, &allocation, 2, false),
            Err(CompileError::MalformedIr { .. })
        ));
    }
}
