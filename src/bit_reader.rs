//! MSB-first bit reader used for OBU header parsing.

use crate::error::BitscopeError;

/// Reads bits (most significant first) from a byte slice, starting at a
/// byte offset.
///
/// # Example
///
/// ```
/// use bitscope::bit_reader::BitReader;
///
/// let data = [0b1011_0001, 0x05];
/// let mut reader = BitReader::new(&data, 0);
/// assert_eq!(reader.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(reader.read_bits(4).unwrap(), 0b0001);
/// assert_eq!(reader.read_leb128().unwrap(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    start: usize,
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at byte `offset` of `data`.
    pub fn new(data: &'a [u8], offset: usize) -> Self {
        Self {
            data,
            start: offset,
            byte_pos: offset,
            bit_pos: 0,
        }
    }

    /// Bits left before the end of the buffer.
    pub fn bits_left(&self) -> usize {
        if self.byte_pos >= self.data.len() {
            return 0;
        }
        (self.data.len() - self.byte_pos) * 8 - self.bit_pos as usize
    }

    /// Bytes touched since the start offset, counting a partially read byte
    /// as read.
    pub fn bytes_read(&self) -> usize {
        self.byte_pos - self.start + usize::from(self.bit_pos > 0)
    }

    /// Read `n` bits (at most 32).
    pub fn read_bits(&mut self, n: u32) -> Result<u32, BitscopeError> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 || n as usize > self.bits_left() {
            return Err(BitscopeError::BitstreamExhausted {
                needed: n as usize,
                available: self.bits_left(),
            });
        }

        let mut result: u32 = 0;
        let mut remaining = n;
        while remaining > 0 {
            let available = 8 - u32::from(self.bit_pos);
            let take = remaining.min(available);
            let shift = available - take;
            let mask = ((1u32 << take) - 1) as u8;
            let bits = (self.data[self.byte_pos] >> shift) & mask;
            result = (result << take) | u32::from(bits);

            self.bit_pos += take as u8;
            if self.bit_pos >= 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
            remaining -= take;
        }
        Ok(result)
    }

    /// Read a single bit as a flag.
    pub fn read_flag(&mut self) -> Result<bool, BitscopeError> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Read `n` bits and require them to equal `expected`.
    pub fn read_bits_expect(
        &mut self,
        n: u32,
        expected: u32,
        field: &'static str,
    ) -> Result<u32, BitscopeError> {
        let value = self.read_bits(n)?;
        if value != expected {
            return Err(BitscopeError::InvalidField {
                field,
                value: u64::from(value),
            });
        }
        Ok(value)
    }

    /// Read an unsigned LEB128 value (at most 8 bytes), byte aligned.
    pub fn read_leb128(&mut self) -> Result<u64, BitscopeError> {
        let mut value: u64 = 0;
        for i in 0..8 {
            let byte = self.read_bits(8)?;
            value |= u64::from(byte & 0x7f) << (i * 7);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(BitscopeError::InvalidField {
            field: "leb128",
            value,
        })
    }
}
