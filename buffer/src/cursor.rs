//! Position-tracked cursors over borrowed byte buffers.
//!
//! [`ByteReader`] hands out sub-slices of the buffer it wraps instead of
//! copying, so callers can keep `&'a [u8]` views for as long as the source
//! buffer lives. [`ByteWriter`] writes into a caller-provided slice whose
//! size was computed up front; it never grows.
//!
//! A failed read or write leaves the position untouched.

use crate::error::{Error, Result};
use crate::vint::{self, VInt};

macro_rules! read_int {
    ($($name:ident => $ty:ty, $from:ident;)*) => {
        $(
            #[doc = concat!("Reads a `", stringify!($ty), "` (`", stringify!($from), "`).")]
            pub fn $name(&mut self) -> Result<$ty> {
                Ok(<$ty>::$from(self.read_array()?))
            }
        )*
    };
}

macro_rules! write_int {
    ($($name:ident => $ty:ty, $to:ident;)*) => {
        $(
            #[doc = concat!("Writes a `", stringify!($ty), "` (`", stringify!($to), "`).")]
            pub fn $name(&mut self, v: $ty) -> Result<()> {
                self.write_bytes(&v.$to())
            }
        )*
    };
}

/// Read-only cursor over a byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Absolute offset of `buf[0]`, so errors from sub-readers still point
    /// into the original input.
    base: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_base(buf, 0)
    }

    /// Creates a reader whose reported offsets start at `base`.
    pub fn with_base(buf: &'a [u8], base: usize) -> Self {
        Self { buf, pos: 0, base }
    }

    /// Current position relative to the start of this reader.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Current position relative to the start of the original input.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Number of bytes left.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns true if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the unread part of the buffer without consuming it.
    pub fn peek_rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Reads `n` bytes as a borrowed sub-view.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::BufferUnderrun {
                offset: self.offset(),
                requested: n,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Reads a fixed-size array by value.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Skips `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Splits off the next `n` bytes as an independent reader.
    pub fn sub_reader(&mut self, n: usize) -> Result<ByteReader<'a>> {
        let base = self.offset();
        let bytes = self.read_bytes(n)?;
        Ok(ByteReader::with_base(bytes, base))
    }

    /// Reads an EBML VInt of at most `max_length` bytes.
    pub fn read_vint(&mut self, max_length: usize) -> Result<VInt> {
        let v = vint::decode_at(self.peek_rest(), max_length, self.offset())?;
        self.pos += v.length();
        Ok(v)
    }

    /// Reads a big-endian unsigned integer of `n` bytes (0-8), as used by
    /// EBML unsigned-integer elements.
    pub fn read_uint_be(&mut self, n: usize) -> Result<u64> {
        if n > 8 {
            return Err(Error::BufferUnderrun {
                offset: self.offset(),
                requested: n,
                available: 8,
            });
        }
        let bytes = self.read_bytes(n)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    read_int! {
        read_u8 => u8, from_be_bytes;
        read_i8 => i8, from_be_bytes;
        read_u16_be => u16, from_be_bytes;
        read_u16_le => u16, from_le_bytes;
        read_i16_be => i16, from_be_bytes;
        read_i16_le => i16, from_le_bytes;
        read_u32_be => u32, from_be_bytes;
        read_u32_le => u32, from_le_bytes;
        read_i32_be => i32, from_be_bytes;
        read_i32_le => i32, from_le_bytes;
        read_u64_be => u64, from_be_bytes;
        read_u64_le => u64, from_le_bytes;
        read_i64_be => i64, from_be_bytes;
        read_i64_le => i64, from_le_bytes;
        read_f32_be => f32, from_be_bytes;
        read_f64_be => f64, from_be_bytes;
    }
}

/// Write cursor over a pre-sized mutable slice.
#[derive(Debug)]
pub struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    /// Creates a writer positioned at the start of `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current write position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total bytes written so far.
    pub fn bytes_written(&self) -> usize {
        self.pos
    }

    /// Room left in the destination.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns the written prefix of the destination.
    pub fn into_written(self) -> &'a mut [u8] {
        let ByteWriter { buf, pos } = self;
        &mut buf[..pos]
    }

    /// Writes a raw byte run.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(Error::BufferOverflow {
                offset: self.pos,
                requested: bytes.len(),
                available: self.remaining(),
            });
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    /// Writes `n` zero bytes.
    pub fn write_zeros(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::BufferOverflow {
                offset: self.pos,
                requested: n,
                available: self.remaining(),
            });
        }
        self.buf[self.pos..self.pos + n].fill(0);
        self.pos += n;
        Ok(())
    }

    /// Writes `value` as a minimal-length EBML VInt.
    pub fn write_vint(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&vint::encode(value)?)
    }

    /// Writes `value` as an EBML VInt of exactly `length` bytes.
    pub fn write_vint_with_length(&mut self, value: u64, length: usize) -> Result<()> {
        self.write_bytes(&vint::encode_with_length(value, length)?)
    }

    write_int! {
        write_u8 => u8, to_be_bytes;
        write_i8 => i8, to_be_bytes;
        write_u16_be => u16, to_be_bytes;
        write_u16_le => u16, to_le_bytes;
        write_i16_be => i16, to_be_bytes;
        write_i16_le => i16, to_le_bytes;
        write_u32_be => u32, to_be_bytes;
        write_u32_le => u32, to_le_bytes;
        write_i32_be => i32, to_be_bytes;
        write_i32_le => i32, to_le_bytes;
        write_u64_be => u64, to_be_bytes;
        write_u64_le => u64, to_le_bytes;
        write_i64_be => i64, to_be_bytes;
        write_i64_le => i64, to_le_bytes;
        write_f32_be => f32, to_be_bytes;
        write_f64_be => f64, to_be_bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_symmetry() {
        let mut buf = [0u8; 64];
        let written = {
            let mut w = ByteWriter::new(&mut buf);
            w.write_u8(0xAB).unwrap();
            w.write_u16_le(0x1234).unwrap();
            w.write_u16_be(0x1234).unwrap();
            w.write_i16_le(-300).unwrap();
            w.write_u32_le(0xDEADBEEF).unwrap();
            w.write_i32_be(-7).unwrap();
            w.write_u64_le(u64::MAX - 1).unwrap();
            w.write_i64_be(i64::MIN).unwrap();
            w.write_vint(127).unwrap();
            w.write_bytes(b"OggS").unwrap();
            w.bytes_written()
        };

        let mut r = ByteReader::new(&buf[..written]);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
        assert_eq!(r.read_u16_le().unwrap(), 0x1234);
        assert_eq!(r.read_u16_be().unwrap(), 0x1234);
        assert_eq!(r.read_i16_le().unwrap(), -300);
        assert_eq!(r.read_u32_le().unwrap(), 0xDEADBEEF);
        assert_eq!(r.read_i32_be().unwrap(), -7);
        assert_eq!(r.read_u64_le().unwrap(), u64::MAX - 1);
        assert_eq!(r.read_i64_be().unwrap(), i64::MIN);
        assert_eq!(r.read_vint(8).unwrap().value(), 127);
        assert_eq!(r.read_bytes(4).unwrap(), b"OggS");
        assert_eq!(r.position(), written);
        assert!(r.is_empty());
    }

    #[test]
    fn test_byte_order() {
        let mut buf = [0u8; 4];
        let mut w = ByteWriter::new(&mut buf);
        w.write_u16_le(0x0102).unwrap();
        w.write_u16_be(0x0102).unwrap();
        assert_eq!(buf, [0x02, 0x01, 0x01, 0x02]);
    }

    #[test]
    fn test_read_underrun_keeps_position() {
        let data = [1u8, 2, 3];
        let mut r = ByteReader::new(&data);
        r.read_u8().unwrap();
        let err = r.read_u32_le().unwrap_err();
        assert_eq!(
            err,
            Error::BufferUnderrun {
                offset: 1,
                requested: 4,
                available: 2
            }
        );
        assert_eq!(r.position(), 1);
        assert_eq!(r.read_u16_be().unwrap(), 0x0203);
    }

    #[test]
    fn test_write_overflow_keeps_position() {
        let mut buf = [0u8; 3];
        let mut w = ByteWriter::new(&mut buf);
        w.write_u16_le(1).unwrap();
        let err = w.write_u32_le(1).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferOverflow {
                offset: 2,
                requested: 4,
                available: 1
            }
        ));
        assert_eq!(w.position(), 2);
        w.write_u8(9).unwrap();
        assert_eq!(w.remaining(), 0);
    }

    #[test]
    fn test_sub_reader_reports_absolute_offsets() {
        let data = [0u8, 0, 0, 0x40];
        let mut r = ByteReader::new(&data);
        r.skip(2).unwrap();
        let mut sub = r.sub_reader(2).unwrap();
        assert_eq!(sub.offset(), 2);
        sub.read_u8().unwrap();
        let err = sub.read_vint(8).unwrap_err();
        assert_eq!(
            err,
            Error::BufferUnderrun {
                offset: 3,
                requested: 2,
                available: 1
            }
        );
        assert!(r.is_empty());
    }

    #[test]
    fn test_read_bytes_borrows() {
        let data = vec![5u8, 6, 7, 8];
        let mut r = ByteReader::new(&data);
        let view = r.read_bytes(2).unwrap();
        assert_eq!(view.as_ptr(), data.as_ptr());
        assert_eq!(r.peek_rest(), &[7, 8]);
    }

    #[test]
    fn test_read_uint_be() {
        let data = [0x01, 0x00, 0x00];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_uint_be(3).unwrap(), 0x010000);
        assert_eq!(r.read_uint_be(0).unwrap(), 0);
        assert!(r.read_uint_be(9).is_err());
    }

    #[test]
    fn test_malformed_vint_offset() {
        let data = [0xAA, 0x00];
        let mut r = ByteReader::new(&data);
        r.read_u8().unwrap();
        assert!(matches!(
            r.read_vint(8).unwrap_err(),
            Error::MalformedVInt { offset: 1, .. }
        ));
        assert_eq!(r.position(), 1);
    }

    #[test]
    fn test_into_written() {
        let mut buf = [0u8; 8];
        let mut w = ByteWriter::new(&mut buf);
        w.write_zeros(2).unwrap();
        w.write_vint_with_length(1, 2).unwrap();
        assert_eq!(w.into_written(), &[0, 0, 0x40, 0x01]);
    }
}
