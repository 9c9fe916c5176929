//! Constant pool for program images
//!
//! One list of tagged entries shared by every literal kind. Identical
//! literals share an index.

use super::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use crate::compiler::ir::IrConstant;
use rustc_hash::FxHashMap;

/// Entry tags
pub mod tag {
    /// `nil`
    pub const NIL: u8 = 0;
    /// 64-bit integer
    pub const INT: u8 = 1;
    /// 64-bit float
    pub const FLOAT: u8 = 2;
    /// Length-prefixed UTF-8 string
    pub const STR: u8 = 3;
    /// Entry count followed by key/value entries
    pub const TABLE: u8 = 4;
    /// One byte, 0 or 1
    pub const BOOL: u8 = 5;
}

/// Constant pool containing literal values
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<IrConstant>,
    index: FxHashMap<Vec<u8>, u32>,
}

impl PartialEq for ConstantPool {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl ConstantPool {
    /// Create a new empty constant pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant, returning the index of an identical entry if present
    pub fn add(&mut self, value: &IrConstant) -> u32 {
        let mut key = BytecodeWriter::new();
        encode_value(value, &mut key);
        let key = key.into_bytes();

        if let Some(index) = self.index.get(&key) {
            return *index;
        }
        let index = self.entries.len() as u32;
        self.entries.push(value.clone());
        self.index.insert(key, index);
        index
    }

    /// Get a constant by index
    pub fn get(&self, index: u32) -> Option<&IrConstant> {
        self.entries.get(index as usize)
    }

    /// All entries in index order
    pub fn entries(&self) -> &[IrConstant] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode the pool
    ///
    /// Format: entry count (u32), then one tagged entry each.
    pub fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u32(self.entries.len() as u32);
        for value in &self.entries {
            encode_value(value, writer);
        }
    }

    /// Decode the pool
    pub fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let count = reader.read_u32()? as usize;
        let mut pool = ConstantPool::new();
        for _ in 0..count {
            let start = reader.position();
            let value = decode_value(reader)?;
            let key = reader.slice_from(start).to_vec();
            let index = pool.entries.len() as u32;
            pool.entries.push(value);
            pool.index.entry(key).or_insert(index);
        }
        Ok(pool)
    }
}

fn encode_value(value: &IrConstant, writer: &mut BytecodeWriter) {
    match value {
        IrConstant::Nil => writer.emit_u8(tag::NIL),
        IrConstant::Int(v) => {
            writer.emit_u8(tag::INT);
            writer.emit_i64(*v);
        }
        IrConstant::Float(v) => {
            writer.emit_u8(tag::FLOAT);
            writer.emit_f64(*v);
        }
        IrConstant::Str(s) => {
            writer.emit_u8(tag::STR);
            writer.emit_str(s);
        }
        IrConstant::Bool(b) => {
            writer.emit_u8(tag::BOOL);
            writer.emit_u8(u8::from(*b));
        }
        IrConstant::Table(entries) => {
            writer.emit_u8(tag::TABLE);
            writer.emit_u32(entries.len() as u32);
            for (k, v) in entries {
                encode_value(k, writer);
                encode_value(v, writer);
            }
        }
    }
}

fn decode_value(reader: &mut BytecodeReader<'_>) -> Result<IrConstant, DecodeError> {
    let offset = reader.position();
    Ok(match reader.read_u8()? {
        tag::NIL => IrConstant::Nil,
        tag::INT => IrConstant::Int(reader.read_i64()?),
        tag::FLOAT => IrConstant::Float(reader.read_f64()?),
        tag::STR => IrConstant::Str(reader.read_str()?),
        tag::BOOL => IrConstant::Bool(reader.read_u8()? != 0),
        tag::TABLE => {
            let count = reader.read_u32()? as usize;
            let mut entries = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                let k = decode_value(reader)?;
                let v = decode_value(reader)?;
                entries.push((k, v));
            }
            IrConstant::Table(entries)
        }
        other => return Err(DecodeError::InvalidTag(other, offset)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup() {
        let mut pool = ConstantPool::new();
        let a = pool.add(&IrConstant::Str("hello".into()));
        let b = pool.add(&IrConstant::Int(1 << 40));
        let c = pool.add(&IrConstant::Str("hello".into()));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);

        // 0.0 and -0.0 stay distinct
        let z = pool.add(&IrConstant::Float(0.0));
        let nz = pool.add(&IrConstant::Float(-0.0));
        assert_ne!(z, nz);
    }

    #[test]
    fn test_nested_table_survives_encoding() {
        let mut pool = ConstantPool::new();
        let table = IrConstant::Table(vec![
            (IrConstant::Str("k".into()), IrConstant::Float(2.5)),
            (IrConstant::Int(3), IrConstant::Table(vec![])),
        ]);
        pool.add(&IrConstant::Bool(true));
        pool.add(&table);

        let mut writer = BytecodeWriter::new();
        pool.encode(&mut writer);
        let bytes = writer.into_bytes();
        let decoded = ConstantPool::decode(&mut BytecodeReader::new(&bytes)).unwrap();
        assert_eq!(decoded, pool);
        assert_eq!(decoded.get(1), Some(&table));
    }

    #[test]
    fn test_unknown_tag() {
        let bytes = [1, 0, 0, 0, 9];
        assert_eq!(
            ConstantPool::decode(&mut BytecodeReader::new(&bytes)),
            Err(DecodeError::InvalidTag(9, 4))
        );
    }
}
