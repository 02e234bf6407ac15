/*!
 Positioned byte-level reads over an in-memory `typedstream`.
*/

use crate::{error::stream::StreamError, stream::events::ByteOrder};

/// A cursor over the raw bytes of a `typedstream`.
///
/// The header of a stream is byte-order independent; once the signature has
/// been validated, [`ByteReader::set_byte_order`] fixes the interpretation of
/// every subsequent multi-byte read.
#[derive(Debug)]
pub struct ByteReader<'a> {
    /// The raw bytes we are reading
    data: &'a [u8],
    /// The current index into the data
    idx: usize,
    /// The byte order recorded in the stream header
    byte_order: ByteOrder,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            idx: 0,
            byte_order: ByteOrder::Big,
        }
    }

    /// The current position, used in error diagnostics.
    pub fn position(&self) -> usize {
        self.idx
    }

    /// Whether every byte of the source has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.idx >= self.data.len()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }

    /// Read exactly `n` bytes, failing with [`StreamError::Truncated`] if the
    /// source runs out first.
    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], StreamError> {
        let range = self
            .data
            .get(self.idx..self.idx.saturating_add(n))
            .ok_or_else(|| StreamError::Truncated {
                offset: self.idx,
                needed: self.idx.saturating_add(n) - self.data.len(),
            })?;
        self.idx += n;
        Ok(range)
    }

    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        Ok(self.read_exact(1)?[0])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], StreamError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    pub fn read_i16(&mut self) -> Result<i16, StreamError> {
        let bytes = self.read_array::<2>()?;
        Ok(match self.byte_order {
            ByteOrder::Big => i16::from_be_bytes(bytes),
            ByteOrder::Little => i16::from_le_bytes(bytes),
        })
    }

    pub fn read_u16(&mut self) -> Result<u16, StreamError> {
        let bytes = self.read_array::<2>()?;
        Ok(match self.byte_order {
            ByteOrder::Big => u16::from_be_bytes(bytes),
            ByteOrder::Little => u16::from_le_bytes(bytes),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, StreamError> {
        let bytes = self.read_array::<4>()?;
        Ok(match self.byte_order {
            ByteOrder::Big => i32::from_be_bytes(bytes),
            ByteOrder::Little => i32::from_le_bytes(bytes),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, StreamError> {
        let bytes = self.read_array::<4>()?;
        Ok(match self.byte_order {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        })
    }

    pub fn read_f32(&mut self) -> Result<f32, StreamError> {
        let bytes = self.read_array::<4>()?;
        Ok(match self.byte_order {
            ByteOrder::Big => f32::from_be_bytes(bytes),
            ByteOrder::Little => f32::from_le_bytes(bytes),
        })
    }

    pub fn read_f64(&mut self) -> Result<f64, StreamError> {
        let bytes = self.read_array::<8>()?;
        Ok(match self.byte_order {
            ByteOrder::Big => f64::from_be_bytes(bytes),
            ByteOrder::Little => f64::from_le_bytes(bytes),
        })
    }
}
