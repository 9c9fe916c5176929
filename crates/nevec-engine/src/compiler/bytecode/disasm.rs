//! Human-readable listing of a program image

use super::encoder::DecodeError;
use super::opcode::GeadaOpcode;
use super::program::Program;
use std::fmt::Write;

/// Render `program` as text: a summary, the constant pool, then one
/// instruction per line (`0003  IADD r2, r0, r1`)
///
/// Lines carry their source location when the image has a line table.
pub fn disassemble(program: &Program) -> Result<String, DecodeError> {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "; registers: {}, slots: {}, constants: {}, words: {}",
        program.register_count,
        program.slot_count,
        program.constants.len(),
        program.code.len()
    );

    for (index, value) in program.constants.entries().iter().enumerate() {
        let _ = writeln!(out, "; k{} = {}", index, value);
    }

    for (pc, instr) in program.instrs().enumerate() {
        if instr.opcode().is_none() {
            return Err(DecodeError::InvalidOpcode(instr.opcode_byte(), pc));
        }
        let _ = write!(out, "{:04}  {}", pc, instr);

        if instr.opcode() == Some(GeadaOpcode::LoadConst) {
            if let Some(value) = program.constants.get(instr.bx() as u32) {
                let _ = write!(out, "  ; {}", value);
            }
        }
        if let Some(loc) = program.lines.get(pc).filter(|l| l.is_known()) {
            let _ = write!(out, "  @{}", loc);
        }
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Loc;
    use crate::compiler::bytecode::opcode::Instr;
    use crate::compiler::bytecode::program::flags;
    use crate::compiler::ir::IrConstant;

    #[test]
    fn test_listing() {
        let mut program = Program::new();
        program.register_count = 2;
        let k = program.constants.add(&IrConstant::Float(2.5));
        program.code = vec![
            Instr::abx(GeadaOpcode::LoadConst, 0, k as u16).raw(),
            Instr::abc(GeadaOpcode::Print, 0, 0, 0).raw(),
            Instr::abc(GeadaOpcode::Halt, 0, 0, 0).raw(),
        ];
        program.flags = flags::HAS_DEBUG_INFO;
        program.lines = vec![Loc::new(2, 3), Loc::new(2, 1), Loc::default()];

        let text = disassemble(&program).unwrap();
        assert_eq!(
            text,
            "; registers: 2, slots: 0, constants: 1, words: 3\n\
             ; k0 = 2.5\n\
             0000  LOAD_CONST r0, k0  ; 2.5  @2:3\n\
             0001  PRINT r0  @2:1\n\
             0002  HALT\n"
        );
    }

    #[test]
    fn test_unknown_opcode() {
        let mut program = Program::new();
        program.code = vec![0x0100_0000];
        assert_eq!(disassemble(&program), Err(DecodeError::InvalidOpcode(0x01, 0)));
    }
}
