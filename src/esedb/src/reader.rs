use byteorder::{ByteOrder, LittleEndian};

use crate::error::EseError;

/// Bounded little-endian reader over a borrowed byte slice.
///
/// The decoder never performs I/O of its own, it only ever walks a
/// record blob the caller already holds in memory.
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, offset: 0 }
    }

    pub fn at(data: &'a [u8], offset: usize) -> Self {
        ByteReader { data, offset }
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    fn require(&self, count: usize, what: &'static str) -> Result<(), EseError> {
        if self.offset + count > self.data.len() {
            return Err(EseError::BoundsExceeded {
                what,
                offset: self.offset,
                length: count,
                blob_size: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, EseError> {
        self.require(1, "read_u8")?;
        let value = self.data[self.offset];
        self.offset += 1;
        Ok(value)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, EseError> {
        self.require(2, "read_u16_le")?;
        let value = LittleEndian::read_u16(&self.data[self.offset..]);
        self.offset += 2;
        Ok(value)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, EseError> {
        self.require(4, "read_u32_le")?;
        let value = LittleEndian::read_u32(&self.data[self.offset..]);
        self.offset += 4;
        Ok(value)
    }

    /// Borrows the next `count` bytes without copying, advancing the cursor.
    pub fn read_slice(&mut self, count: usize) -> Result<&'a [u8], EseError> {
        self.require(count, "read_slice")?;
        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
    }
}
