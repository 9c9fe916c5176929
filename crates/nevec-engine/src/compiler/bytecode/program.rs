//! Program image format (`.geada`)

use super::constants::ConstantPool;
use super::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use super::opcode::Instr;
use crate::ast::Loc;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Magic number for Geada files: "GEAD"
pub const MAGIC: [u8; 4] = *b"GEAD";

/// Current format version
pub const VERSION: u32 = 1;

/// Header size: magic + version + flags + crc32 + sha256
pub const HEADER_SIZE: usize = 48;

/// Header flags
pub mod flags {
    /// A line table follows the code
    pub const HAS_DEBUG_INFO: u32 = 1 << 0;
}

/// Program image encoding/decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    /// Decode error
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected GEAD, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),

    /// CRC32 mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Stored checksum
        expected: u32,
        /// Checksum of the payload read
        actual: u32,
    },

    /// SHA-256 mismatch
    #[error("SHA-256 digest mismatch")]
    DigestMismatch,

    /// Bytes left over after the last section
    #[error("{0} trailing byte(s) after the program")]
    TrailingBytes(usize),
}

/// A complete executable program
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Header flags
    pub flags: u32,
    /// Registers the interpreter must provide (palette plus scratch)
    pub register_count: u16,
    /// Spill slots the interpreter must provide
    pub slot_count: u32,
    /// Constant pool
    pub constants: ConstantPool,
    /// Instruction words
    pub code: Vec<u32>,
    /// Source location of each instruction word, when debug info is on
    pub lines: Vec<Loc>,
    /// SHA-256 of the payload, filled in by `encode`/`decode`
    pub checksum: [u8; 32],
}

impl Program {
    /// Create an empty program
    pub fn new() -> Self {
        Self {
            flags: 0,
            register_count: 0,
            slot_count: 0,
            constants: ConstantPool::new(),
            code: Vec::new(),
            lines: Vec::new(),
            checksum: [0; 32],
        }
    }

    /// Whether a line table is present
    pub fn has_debug_info(&self) -> bool {
        self.flags & flags::HAS_DEBUG_INFO != 0
    }

    /// Instruction words as typed instructions
    pub fn instrs(&self) -> impl Iterator<Item = Instr> + '_ {
        self.code.iter().map(|w| Instr(*w))
    }

    /// Encode the program to binary format
    ///
    /// Format:
    /// - Header: magic (4 bytes) + version (u32) + flags (u32) + crc32 (u32) + checksum (32 bytes SHA-256)
    /// - Register count (u16), slot count (u32)
    /// - Constant pool
    /// - Code: word count (u32) + words (u32 each)
    /// - Line table when `HAS_DEBUG_INFO`: one (line u32, col u32) per word
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BytecodeWriter::new();

        writer.emit_bytes(&MAGIC);
        writer.emit_u32(VERSION);
        writer.emit_u32(self.flags);
        let crc32_offset = writer.offset();
        writer.emit_u32(0);
        let sha256_offset = writer.offset();
        writer.emit_bytes(&[0u8; 32]);

        writer.emit_u16(self.register_count);
        writer.emit_u32(self.slot_count);
        self.constants.encode(&mut writer);

        writer.emit_u32(self.code.len() as u32);
        for word in &self.code {
            writer.emit_u32(*word);
        }

        if self.has_debug_info() {
            for index in 0..self.code.len() {
                let loc = self.lines.get(index).copied().unwrap_or_default();
                writer.emit_u32(loc.line);
                writer.emit_u32(loc.col);
            }
        }

        // Checksums cover everything after the header
        let payload = &writer.buffer[HEADER_SIZE..];
        let crc32 = crc32fast::hash(payload);
        let digest: [u8; 32] = Sha256::digest(payload).into();

        writer.patch_u32(crc32_offset, crc32);
        writer.buffer[sha256_offset..sha256_offset + 32].copy_from_slice(&digest);
        writer.into_bytes()
    }

    /// Decode a program, verifying magic, version and both checksums
    pub fn decode(data: &[u8]) -> Result<Self, ProgramError> {
        let mut reader = BytecodeReader::new(data);

        let mut magic = [0u8; 4];
        magic.copy_from_slice(reader.read_bytes(4)?);
        if magic != MAGIC {
            return Err(ProgramError::InvalidMagic(magic));
        }

        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(ProgramError::UnsupportedVersion(version));
        }

        let header_flags = reader.read_u32()?;
        let stored_crc32 = reader.read_u32()?;
        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(reader.read_bytes(32)?);

        let payload = &data[HEADER_SIZE..];
        let crc32 = crc32fast::hash(payload);
        if crc32 != stored_crc32 {
            return Err(ProgramError::ChecksumMismatch {
                expected: stored_crc32,
                actual: crc32,
            });
        }
        if Sha256::digest(payload).as_slice() != checksum {
            return Err(ProgramError::DigestMismatch);
        }

        let register_count = reader.read_u16()?;
        let slot_count = reader.read_u32()?;
        let constants = ConstantPool::decode(&mut reader)?;

        let word_count = reader.read_u32()? as usize;
        let mut code = Vec::with_capacity(word_count.min(reader.remaining() / 4));
        for _ in 0..word_count {
            code.push(reader.read_u32()?);
        }

        let mut lines = Vec::new();
        if header_flags & flags::HAS_DEBUG_INFO != 0 {
            lines.reserve(word_count.min(reader.remaining() / 8));
            for _ in 0..word_count {
                let line = reader.read_u32()?;
                let col = reader.read_u32()?;
                lines.push(Loc::new(line, col));
            }
        }

        if reader.remaining() != 0 {
            return Err(ProgramError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            flags: header_flags,
            register_count,
            slot_count,
            constants,
            code,
            lines,
            checksum,
        })
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
