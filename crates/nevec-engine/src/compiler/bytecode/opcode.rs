//! Geada opcodes
//!
//! 32-bit fixed-width register instructions in three layouts, most
//! significant bits first:
//! - ABC:  [opcode:8][A:8][B:8][C:8]       binary ops, table access
//! - ABx:  [opcode:8][A:8][Bx:16]          pool indices, slots, counts
//! - AsBx: [opcode:8][A:8][sBx:16 signed]  small integers
//!
//! The opcode sits in bits 31-24, A in bits 23-16, B in bits 15-8 and C in
//! bits 7-0 (Bx/sBx span bits 15-0). Words are stored little-endian, so on
//! disk the opcode is the fourth byte of each word.
//!
//! Instructions with fewer operands use the ABC layout and leave the unused
//! fields zero.
//!
//! | Name        | Tag  | Layout | Meaning                          |
//! |-------------|------|--------|----------------------------------|
//! | NOP         | 0x00 | -      |                                  |
//! | LOAD_NIL    | 0x02 | A      | rA = nil                         |
//! | LOAD_TRUE   | 0x03 | A      | rA = true                        |
//! | LOAD_FALSE  | 0x04 | A      | rA = false                       |
//! | LOAD_INT    | 0x05 | AsBx   | rA = sBx                         |
//! | LOAD_CONST  | 0x06 | ABx    | rA = pool[Bx]                    |
//! | LOAD_SLOT   | 0x09 | ABx    | rA = slots[Bx]                   |
//! | STORE_SLOT  | 0x0A | ABx    | slots[Bx] = rA                   |
//! | IADD..IXOR  | 0x10 | ABC    | integer arithmetic and bit ops   |
//! | FADD..FNEG  | 0x20 | ABC    | float arithmetic                 |
//! | IEQ..IGE    | 0x30 | ABC    | integer comparison               |
//! | FEQ..FGE    | 0x38 | ABC    | float comparison                 |
//! | EQ, NE      | 0x40 | ABC    | equality of any two values       |
//! | NOT..ISNNIL | 0x44 | AB     | rA = op rB                       |
//! | SCONCAT     | 0x48 | ABC    | rA = rB .. rC                    |
//! | SEQ..SGE    | 0x4A | ABC    | string comparison                |
//! | TOSTRING    | 0x50 | AB     | rA = show rB                     |
//! | NEW_TABLE   | 0x60 | ABx    | rA = table with Bx entries       |
//! | TABLE_SET   | 0x61 | ABC    | rA[rB] = rC                      |
//! | TABLE_GET   | 0x62 | ABC    | rA = rB[rC]                      |
//! | PRINT       | 0x70 | A      | print rA                         |
//! | HALT        | 0x7F | -      | stop                             |

/// Geada opcode enumeration
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeadaOpcode {
    // ===== Constants & Slots (0x00-0x0F) =====
    /// No operation
    Nop = 0x00,
    /// rA = nil
    LoadNil = 0x02,
    /// rA = true
    LoadTrue = 0x03,
    /// rA = false
    LoadFalse = 0x04,
    /// rA = sBx
    LoadInt = 0x05,
    /// rA = constants[Bx]
    LoadConst = 0x06,
    /// rA = slots[Bx]
    LoadSlot = 0x09,
    /// slots[Bx] = rA
    StoreSlot = 0x0A,

    // ===== Integer Arithmetic (0x10-0x1F) =====
    /// rA = rB + rC (wrapping)
    Iadd = 0x10,
    /// rA = rB - rC (wrapping)
    Isub = 0x11,
    /// rA = rB * rC (wrapping)
    Imul = 0x12,
    /// rA = rB / rC
    Idiv = 0x13,
    /// rA = -rB
    Ineg = 0x15,
    /// rA = rB << rC
    Ishl = 0x17,
    /// rA = rB >> rC (arithmetic)
    Ishr = 0x18,
    /// rA = rB & rC
    Iand = 0x1A,
    /// rA = rB | rC
    Ior = 0x1B,
    /// rA = rB ^ rC
    Ixor = 0x1C,

    // ===== Float Arithmetic (0x20-0x2F) =====
    /// rA = rB + rC
    Fadd = 0x20,
    /// rA = rB - rC
    Fsub = 0x21,
    /// rA = rB * rC
    Fmul = 0x22,
    /// rA = rB / rC
    Fdiv = 0x23,
    /// rA = -rB
    Fneg = 0x24,

    // ===== Comparison (0x30-0x47) =====
    /// rA = rB == rC (int)
    Ieq = 0x30,
    /// rA = rB != rC (int)
    Ine = 0x31,
    /// rA = rB < rC (int)
    Ilt = 0x32,
    /// rA = rB <= rC (int)
    Ile = 0x33,
    /// rA = rB > rC (int)
    Igt = 0x34,
    /// rA = rB >= rC (int)
    Ige = 0x35,
    /// rA = rB == rC (float)
    Feq = 0x38,
    /// rA = rB != rC (float)
    Fne = 0x39,
    /// rA = rB < rC (float)
    Flt = 0x3A,
    /// rA = rB <= rC (float)
    Fle = 0x3B,
    /// rA = rB > rC (float)
    Fgt = 0x3C,
    /// rA = rB >= rC (float)
    Fge = 0x3D,
    /// rA = rB == rC (any)
    Eq = 0x40,
    /// rA = rB != rC (any)
    Ne = 0x41,
    /// rA = !rB
    Not = 0x44,
    /// rA = rB == 0
    IsZero = 0x45,
    /// rA = rB == nil
    IsNil = 0x46,
    /// rA = rB != nil
    IsNotNil = 0x47,

    // ===== Strings (0x48-0x5F) =====
    /// rA = rB .. rC
    Sconcat = 0x48,
    /// rA = rB == rC (string)
    Seq = 0x4A,
    /// rA = rB != rC (string)
    Sne = 0x4B,
    /// rA = rB < rC (string)
    Slt = 0x4C,
    /// rA = rB <= rC (string)
    Sle = 0x4D,
    /// rA = rB > rC (string)
    Sgt = 0x4E,
    /// rA = rB >= rC (string)
    Sge = 0x4F,
    /// rA = textual form of rB
    ToString = 0x50,

    // ===== Tables (0x60-0x6F) =====
    /// rA = new table sized for Bx entries
    NewTable = 0x60,
    /// rA[rB] = rC
    TableSet = 0x61,
    /// rA = rB[rC]
    TableGet = 0x62,

    // ===== Effects (0x70-0x7F) =====
    /// print rA
    Print = 0x70,
    /// Stop execution
    Halt = 0x7F,
}

/// Operand layout of an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrFormat {
    /// No operands
    None,
    /// rA only
    A,
    /// rA, rB
    AB,
    /// rA, rB, rC
    ABC,
    /// rA, 16-bit unsigned operand
    ABx,
    /// rA, 16-bit signed operand
    AsBx,
}

impl GeadaOpcode {
    /// Every opcode, in tag order
    pub const ALL: [GeadaOpcode; 54] = [
        Self::Nop,
        Self::LoadNil,
        Self::LoadTrue,
        Self::LoadFalse,
        Self::LoadInt,
        Self::LoadConst,
        Self::LoadSlot,
        Self::StoreSlot,
        Self::Iadd,
        Self::Isub,
        Self::Imul,
        Self::Idiv,
        Self::Ineg,
        Self::Ishl,
        Self::Ishr,
        Self::Iand,
        Self::Ior,
        Self::Ixor,
        Self::Fadd,
        Self::Fsub,
        Self::Fmul,
        Self::Fdiv,
        Self::Fneg,
        Self::Ieq,
        Self::Ine,
        Self::Ilt,
        Self::Ile,
        Self::Igt,
        Self::Ige,
        Self::Feq,
        Self::Fne,
        Self::Flt,
        Self::Fle,
        Self::Fgt,
        Self::Fge,
        Self::Eq,
        Self::Ne,
        Self::Not,
        Self::IsZero,
        Self::IsNil,
        Self::IsNotNil,
        Self::Sconcat,
        Self::Seq,
        Self::Sne,
        Self::Slt,
        Self::Sle,
        Self::Sgt,
        Self::Sge,
        Self::ToString,
        Self::NewTable,
        Self::TableSet,
        Self::TableGet,
        Self::Print,
        Self::Halt,
    ];

    /// Convert byte to opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::ALL.iter().find(|op| **op as u8 == byte).copied()
    }

    /// Numeric tag
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Operand layout
    pub fn format(self) -> InstrFormat {
        use GeadaOpcode::*;
        match self {
            Nop | Halt => InstrFormat::None,
            LoadNil | LoadTrue | LoadFalse | Print => InstrFormat::A,
            LoadInt => InstrFormat::AsBx,
            LoadConst | LoadSlot | StoreSlot | NewTable => InstrFormat::ABx,
            Ineg | Fneg | Not | IsZero | IsNil | IsNotNil | ToString => InstrFormat::AB,
            _ => InstrFormat::ABC,
        }
    }

    /// Mnemonic
    pub fn name(self) -> &'static str {
        use GeadaOpcode::*;
        match self {
            Nop => "NOP",
            LoadNil => "LOAD_NIL",
            LoadTrue => "LOAD_TRUE",
            LoadFalse => "LOAD_FALSE",
            LoadInt => "LOAD_INT",
            LoadConst => "LOAD_CONST",
            LoadSlot => "LOAD_SLOT",
            StoreSlot => "STORE_SLOT",
            Iadd => "IADD",
            Isub => "ISUB",
            Imul => "IMUL",
            Idiv => "IDIV",
            Ineg => "INEG",
            Ishl => "ISHL",
            Ishr => "ISHR",
            Iand => "IAND",
            Ior => "IOR",
            Ixor => "IXOR",
            Fadd => "FADD",
            Fsub => "FSUB",
            Fmul => "FMUL",
            Fdiv => "FDIV",
            Fneg => "FNEG",
            Ieq => "IEQ",
            Ine => "INE",
            Ilt => "ILT",
            Ile => "ILE",
            Igt => "IGT",
            Ige => "IGE",
            Feq => "FEQ",
            Fne => "FNE",
            Flt => "FLT",
            Fle => "FLE",
            Fgt => "FGT",
            Fge => "FGE",
            Eq => "EQ",
            Ne => "NE",
            Not => "NOT",
            IsZero => "ISZERO",
            IsNil => "ISNIL",
            IsNotNil => "ISNNIL",
            Sconcat => "SCONCAT",
            Seq => "SEQ",
            Sne => "SNE",
            Slt => "SLT",
            Sle => "SLE",
            Sgt => "SGT",
            Sge => "SGE",
            ToString => "TOSTRING",
            NewTable => "NEW_TABLE",
            TableSet => "TABLE_SET",
            TableGet => "TABLE_GET",
            Print => "PRINT",
            Halt => "HALT",
        }
    }
}

impl std::fmt::Display for GeadaOpcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Instruction encoding/decoding
// ============================================================================

/// A 32-bit instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr(pub u32);

impl Instr {
    /// Encode ABC format: [opcode][A][B][C]
    #[inline]
    pub fn abc(op: GeadaOpcode, a: u8, b: u8, c: u8) -> Self {
        Self((op as u32) << 24 | (a as u32) << 16 | (b as u32) << 8 | (c as u32))
    }

    /// Encode ABx format: [opcode][A][Bx:16]
    #[inline]
    pub fn abx(op: GeadaOpcode, a: u8, bx: u16) -> Self {
        Self((op as u32) << 24 | (a as u32) << 16 | (bx as u32))
    }

    /// Encode AsBx format: [opcode][A][sBx:16 signed]
    #[inline]
    pub fn asbx(op: GeadaOpcode, a: u8, sbx: i16) -> Self {
        Self((op as u32) << 24 | (a as u32) << 16 | (sbx as u16 as u32))
    }

    /// Opcode byte (bits 31-24)
    #[inline]
    pub fn opcode_byte(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Decoded opcode
    #[inline]
    pub fn opcode(self) -> Option<GeadaOpcode> {
        GeadaOpcode::from_u8(self.opcode_byte())
    }

    /// A field (bits 23-16)
    #[inline]
    pub fn a(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// B field (bits 15-8)
    #[inline]
    pub fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// C field (bits 7-0)
    #[inline]
    pub fn c(self) -> u8 {
        self.0 as u8
    }

    /// Bx field (bits 15-0)
    #[inline]
    pub fn bx(self) -> u16 {
        self.0 as u16
    }

    /// sBx field (bits 15-0, signed)
    #[inline]
    pub fn sbx(self) -> i16 {
        self.0 as u16 as i16
    }

    /// Raw word
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self.opcode() {
            Some(op) => op,
            None => return write!(f, "UNKNOWN(0x{:02X})", self.opcode_byte()),
        };
        match op.format() {
            InstrFormat::None => write!(f, "{}", op),
            InstrFormat::A => write!(f, "{} r{}", op, self.a()),
            InstrFormat::AB => write!(f, "{} r{}, r{}", op, self.a(), self.b()),
            InstrFormat::ABC => write!(f, "{} r{}, r{}, r{}", op, self.a(), self.b(), self.c()),
            InstrFormat::ABx => match op {
                GeadaOpcode::LoadConst => write!(f, "{} r{}, k{}", op, self.a(), self.bx()),
                GeadaOpcode::LoadSlot | GeadaOpcode::StoreSlot => {
                    write!(f, "{} r{}, slot{}", op, self.a(), self.bx())
                }
                _ => write!(f, "{} r{}, {}", op, self.a(), self.bx()),
            },
            InstrFormat::AsBx => write!(f, "{} r{}, {}", op, self.a(), self.sbx()),
        }
    }
}

/// Collects instruction words
#[derive(Debug, Default)]
pub struct CodeWriter {
    code: Vec<u32>,
}

impl CodeWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an instruction with unused operands zeroed
    pub fn emit_a(&mut self, op: GeadaOpcode, a: u8) -> usize {
        self.push(Instr::abc(op, a, 0, 0))
    }

    /// Emit a two-register instruction
    pub fn emit_ab(&mut self, op: GeadaOpcode, a: u8, b: u8) -> usize {
        self.push(Instr::abc(op, a, b, 0))
    }

    /// Emit an ABC-format instruction
    pub fn emit_abc(&mut self, op: GeadaOpcode, a: u8, b: u8, c: u8) -> usize {
        self.push(Instr::abc(op, a, b, c))
    }

    /// Emit an ABx-format instruction
    pub fn emit_abx(&mut self, op: GeadaOpcode, a: u8, bx: u16) -> usize {
        self.push(Instr::abx(op, a, bx))
    }

    /// Emit an AsBx-format instruction
    pub fn emit_asbx(&mut self, op: GeadaOpcode, a: u8, sbx: i16) -> usize {
        self.push(Instr::asbx(op, a, sbx))
    }

    fn push(&mut self, instr: Instr) -> usize {
        let pos = self.code.len();
        self.code.push(instr.raw());
        pos
    }

    /// Words emitted so far
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Check if nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Consume the writer
    pub fn finish(self) -> Vec<u32> {
        self.code
    }
}
