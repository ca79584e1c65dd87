//! Bounds-checked little-endian cursor over a replay buffer
//!
//! [`ByteReader`] owns its read position. Every read validates that enough bytes remain
//! before advancing, and a failed read leaves the position untouched, so the error always
//! names the exact offset at which decoding stopped.

use half::f16;

use crate::{ReplayError, Result};

/// Cursor over an immutable byte buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Create a reader positioned at `offset`.
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut reader = Self::new(data);
        reader.seek(offset)?;
        Ok(reader)
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total buffer length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the position and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Move the cursor to an absolute offset (the end of the buffer is a valid target).
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(ReplayError::out_of_bounds(offset, 0, self.data.len()));
        }
        self.position = offset;
        Ok(())
    }

    /// Advance past `count` bytes without interpreting them.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// Borrow the next `count` bytes and advance past them.
    pub fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(ReplayError::out_of_bounds(self.position, count, remaining));
        }
        let start = self.position;
        self.position += count;
        Ok(&self.data[start..self.position])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.array().map(i32::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.array().map(f32::from_le_bytes)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.array().map(f64::from_le_bytes)
    }

    /// Read an IEEE-754 half precision value widened to `f32`.
    pub fn read_f16(&mut self) -> Result<f32> {
        self.array().map(|bytes| decode_f16(u16::from_le_bytes(bytes)))
    }

    /// Read a string prefixed by its `u32` byte length.
    ///
    /// The declared length is validated against the remaining buffer before any text is
    /// consumed; on failure the cursor stays on the length prefix.
    pub fn read_string(&mut self) -> Result<&'a str> {
        let start = self.position;
        let length = self.read_u32()?;
        let available = self.remaining();
        if length as usize > available {
            self.position = start;
            return Err(ReplayError::InvalidStringLength { offset: start, length, available });
        }

        let text_offset = self.position;
        let bytes = self.take(length as usize)?;
        std::str::from_utf8(bytes).map_err(|source| {
            self.position = start;
            ReplayError::InvalidUtf8 { offset: text_offset, source }
        })
    }
}

/// Decode the raw bits of an IEEE-754 half precision value.
///
/// Signed zeros, subnormals (`fraction × 2⁻²⁴`), infinities and NaN follow the standard; all
/// are exactly representable in `f32`.
pub fn decode_f16(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reads_little_endian_scalars() {
        let mut data = Vec::new();
        data.extend_from_slice(&(-7i32).to_le_bytes());
        data.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        data.push(200);
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&16.666f64.to_le_bytes());

        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_i32().unwrap(), -7);
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_u8().unwrap(), 200);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_f64().unwrap(), 16.666);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn short_read_reports_offset_and_keeps_position() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut reader = ByteReader::new(&data);
        reader.skip(4).unwrap();

        match reader.read_i32().unwrap_err() {
            ReplayError::OutOfBounds { offset, needed, available } => {
                assert_eq!(offset, 4);
                assert_eq!(needed, 4);
                assert_eq!(available, 2);
            }
            other => panic!("Expected OutOfBounds, got {:?}", other),
        }
        assert_eq!(reader.position(), 4);
        assert!(reader.skip(3).is_err());
        assert_eq!(reader.read_u8().unwrap(), 5);
    }

    #[test]
    fn half_precision_special_values() {
        assert_eq!(decode_f16(0x0000), 0.0);
        assert!(decode_f16(0x8000).is_sign_negative());
        assert_eq!(decode_f16(0x8000), 0.0);
        assert_eq!(decode_f16(0x0001), 2f32.powi(-24));
        assert_eq!(decode_f16(0x03FF), 1023.0 * 2f32.powi(-24));
        assert_eq!(decode_f16(0x3C00), 1.0);
        assert_eq!(decode_f16(0xC000), -2.0);
        assert_eq!(decode_f16(0x7BFF), 65504.0);
        assert_eq!(decode_f16(0x7C00), f32::INFINITY);
        assert_eq!(decode_f16(0xFC00), f32::NEG_INFINITY);
        assert!(decode_f16(0x7E00).is_nan());
    }

    #[test]
    fn strings_validate_declared_length() {
        let mut data = Vec::new();
        data.extend_from_slice(&5u32.to_le_bytes());
        data.extend_from_slice(b"Monza");
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(b"abc");

        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_string().unwrap(), "Monza");
        match reader.read_string().unwrap_err() {
            ReplayError::InvalidStringLength { offset, length, available } => {
                assert_eq!(offset, 9);
                assert_eq!(length, 100);
                assert_eq!(available, 3);
            }
            other => panic!("Expected InvalidStringLength, got {:?}", other),
        }
        assert_eq!(reader.position(), 9);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0xFF, 0xFE]);

        let err = ByteReader::new(&data).read_string().unwrap_err();
        assert!(matches!(err, ReplayError::InvalidUtf8 { offset: 4, .. }));
    }

    #[test]
    fn seek_allows_end_but_not_beyond() {
        let data = [0u8; 8];
        assert!(ByteReader::at(&data, 8).is_ok());
        assert!(ByteReader::at(&data, 9).is_err());
    }

    proptest! {
        #[test]
        fn f16_normals_follow_closed_form(
            sign in 0u16..2,
            exponent in 1u16..31,
            fraction in 0u16..1024,
        ) {
            let bits = (sign << 15) | (exponent << 10) | fraction;
            let magnitude =
                2f64.powi(i32::from(exponent) - 15) * (1.0 + f64::from(fraction) / 1024.0);
            let expected = if sign == 1 { -magnitude } else { magnitude };
            prop_assert_eq!(f64::from(decode_f16(bits)), expected);
        }

        #[test]
        fn reads_never_pass_the_end(
            data in prop::collection::vec(any::<u8>(), 0..32),
            reads in 0usize..16,
        ) {
            let mut reader = ByteReader::new(&data);
            for _ in 0..reads {
                let before = reader.position();
                if reader.read_i32().is_err() {
                    prop_assert_eq!(reader.position(), before);
                    prop_assert!(reader.remaining() < 4);
                    break;
                }
            }
            prop_assert!(reader.position() <= data.len());
        }
    }
}
