//! Bounds-checked little-endian cursor over an immutable byte slice.
//!
//! Every structure in the container is addressed by absolute file offset, so
//! the decoder never shares one stream between recursive calls. Instead each
//! list, fragment, or referenced region gets its own [`ByteReader`] created at
//! an explicit offset. A reader never reads past the slice it was built on;
//! every read checks the remaining length first and fails with
//! [`Error::TruncatedInput`] without touching memory or allocating.

use byteorder::{ByteOrder, LittleEndian};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// A reader positioned at `offset`, which must not lie past the end.
    pub fn at(data: &'a [u8], offset: u64) -> Result<Self> {
        let mut reader = Self::new(data);
        reader.seek(offset)?;
        Ok(reader)
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// Total length of the underlying slice.
    #[inline]
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn remaining(&self) -> u64 {
        (self.data.len() - self.pos) as u64
    }

    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.len() {
            return Err(Error::OutOfBounds {
                context:       "seek",
                offset,
                length:        0,
                container_len: self.len(),
            });
        }
        self.pos = offset as usize;
        Ok(())
    }

    /// Fail unless at least `needed` bytes remain. Used before counted reads
    /// so that a hostile count never drives an allocation.
    pub fn ensure(&self, needed: u64, context: &'static str) -> Result<()> {
        if needed > self.remaining() {
            return Err(Error::TruncatedInput {
                context,
                offset:    self.position(),
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
        self.ensure(n as u64, context)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn skip(&mut self, n: usize, context: &'static str) -> Result<()> {
        self.read_bytes(n, context).map(|_| ())
    }

    #[inline]
    pub fn read_u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.read_bytes(1, context)?[0])
    }

    #[inline]
    pub fn read_u16(&mut self, context: &'static str) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2, context)?))
    }

    #[inline]
    pub fn read_u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4, context)?))
    }

    #[inline]
    pub fn read_u64(&mut self, context: &'static str) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8, context)?))
    }

    pub fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, context)?);
        Ok(out)
    }

    /// A GUID stored in the mixed-endian Windows layout.
    pub fn read_guid(&mut self, context: &'static str) -> Result<Uuid> {
        Ok(Uuid::from_bytes_le(self.read_array::<16>(context)?))
    }
}
