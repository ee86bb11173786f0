//! Chunk references: `(offset, length)` pointers into the container.
//!
//! File nodes pick one of four encodings for each half of the pair through
//! the `stpFormat` / `cbFormat` bits of their header:
//!
//! | bits | offset (`stp`)          | length (`cb`)           |
//! |------|-------------------------|-------------------------|
//! | 0    | u64, absolute           | u32, absolute           |
//! | 1    | u32, absolute           | u64, absolute           |
//! | 2    | u16, compressed (×8)    | u8, compressed (×8)     |
//! | 3    | u32, compressed (×8)    | u16, compressed (×8)    |
//!
//! Headers and fragment trailers use two fixed forms instead:
//! `FileChunkReference64x32` (u64 + u32) and `FileChunkReference32` (u32 + u32).

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::reader::ByteReader;

/// Encoding of the offset half of a chunk reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetFormat {
    Absolute64,
    Absolute32,
    Compressed16,
    Compressed32,
}

impl OffsetFormat {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => OffsetFormat::Absolute64,
            1 => OffsetFormat::Absolute32,
            2 => OffsetFormat::Compressed16,
            _ => OffsetFormat::Compressed32,
        }
    }

    pub fn width(self) -> usize {
        match self {
            OffsetFormat::Absolute64   => 8,
            OffsetFormat::Absolute32   => 4,
            OffsetFormat::Compressed16 => 2,
            OffsetFormat::Compressed32 => 4,
        }
    }

    pub fn is_compressed(self) -> bool {
        matches!(self, OffsetFormat::Compressed16 | OffsetFormat::Compressed32)
    }

    /// The offset value that marks a nil reference in this encoding,
    /// after scaling.
    pub fn nil_offset(self) -> u64 {
        match self {
            OffsetFormat::Absolute64   => u64::MAX,
            OffsetFormat::Absolute32   => u32::MAX as u64,
            OffsetFormat::Compressed16 => 0x7FFF8,
            OffsetFormat::Compressed32 => 0x7_FFFF_FFF8,
        }
    }
}

/// Encoding of the length half of a chunk reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthFormat {
    Absolute32,
    Absolute64,
    Compressed8,
    Compressed16,
}

impl LengthFormat {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => LengthFormat::Absolute32,
            1 => LengthFormat::Absolute64,
            2 => LengthFormat::Compressed8,
            _ => LengthFormat::Compressed16,
        }
    }

    pub fn width(self) -> usize {
        match self {
            LengthFormat::Absolute32   => 4,
            LengthFormat::Absolute64   => 8,
            LengthFormat::Compressed8  => 1,
            LengthFormat::Compressed16 => 2,
        }
    }

    pub fn is_compressed(self) -> bool {
        matches!(self, LengthFormat::Compressed8 | LengthFormat::Compressed16)
    }
}

/// Size in bytes of a `FileChunkReference64x32`.
pub const CHUNK_REF_64X32_SIZE: usize = 12;
/// Size in bytes of a `FileChunkReference32`.
pub const CHUNK_REF_32_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkReference {
    pub offset: u64,
    pub length: u64,
    #[serde(skip)]
    nil_offset: u64,
}

impl ChunkReference {
    pub fn new(offset: u64, length: u64, format: OffsetFormat) -> Self {
        Self { offset, length, nil_offset: format.nil_offset() }
    }

    /// The canonical nil `FileChunkReference64x32`.
    pub fn nil() -> Self {
        Self::new(u64::MAX, 0, OffsetFormat::Absolute64)
    }

    /// Decode a variable-width reference selected by a file node header.
    pub fn read(reader: &mut ByteReader<'_>, stp_format: u8, cb_format: u8) -> Result<Self> {
        let stp = OffsetFormat::from_bits(stp_format);
        let cb  = LengthFormat::from_bits(cb_format);
        reader.ensure((stp.width() + cb.width()) as u64, "file node chunk reference")?;

        let mut offset = match stp {
            OffsetFormat::Absolute64   => reader.read_u64("chunk reference offset")?,
            OffsetFormat::Absolute32
            | OffsetFormat::Compressed32 => reader.read_u32("chunk reference offset")? as u64,
            OffsetFormat::Compressed16 => reader.read_u16("chunk reference offset")? as u64,
        };
        let mut length = match cb {
            LengthFormat::Absolute32   => reader.read_u32("chunk reference length")? as u64,
            LengthFormat::Absolute64   => reader.read_u64("chunk reference length")?,
            LengthFormat::Compressed8  => reader.read_u8("chunk reference length")? as u64,
            LengthFormat::Compressed16 => reader.read_u16("chunk reference length")? as u64,
        };
        if stp.is_compressed() {
            offset *= 8;
        }
        if cb.is_compressed() {
            length *= 8;
        }
        Ok(Self::new(offset, length, stp))
    }

    pub fn read_64x32(reader: &mut ByteReader<'_>) -> Result<Self> {
        reader.ensure(CHUNK_REF_64X32_SIZE as u64, "FileChunkReference64x32")?;
        let offset = reader.read_u64("FileChunkReference64x32 offset")?;
        let length = reader.read_u32("FileChunkReference64x32 length")? as u64;
        Ok(Self::new(offset, length, OffsetFormat::Absolute64))
    }

    pub fn read_32(reader: &mut ByteReader<'_>) -> Result<Self> {
        reader.ensure(CHUNK_REF_32_SIZE as u64, "FileChunkReference32")?;
        let offset = reader.read_u32("FileChunkReference32 offset")? as u64;
        let length = reader.read_u32("FileChunkReference32 length")? as u64;
        Ok(Self::new(offset, length, OffsetFormat::Absolute32))
    }

    pub fn is_nil(&self) -> bool {
        self.offset & self.nil_offset == self.nil_offset && self.length == 0
    }

    pub fn is_zero(&self) -> bool {
        self.offset == 0 && self.length == 0
    }

    /// One past the last byte of the referenced region, if representable.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }

    /// The referenced region as `(start, end)`, or `OutOfBounds` when any
    /// part of it lies outside a container of `container_len` bytes.
    pub fn bounds(&self, container_len: u64, context: &'static str) -> Result<(u64, u64)> {
        match self.end() {
            Some(end) if end <= container_len => Ok((self.offset, end)),
            _ => Err(Error::OutOfBounds {
                context,
                offset: self.offset,
                length: self.length,
                container_len,
            }),
        }
    }
}

impl fmt::Display for ChunkReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            write!(f, "ChunkReference(nil)")
        } else {
            write!(f, "ChunkReference(stp: {}, cb: {})", self.offset, self.length)
        }
    }
}
