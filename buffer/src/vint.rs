//! EBML variable-length integers (RFC 8794 §4).
//!
//! Layout of the first byte for a VInt of `length` bytes:
//!
//! ```text
//!   length 1: 1xxx xxxx
//!   length 2: 01xx xxxx  xxxxxxxx
//!   length 3: 001x xxxx  xxxxxxxx xxxxxxxx
//!   ...
//!   length 8: 0000 0001  xxxxxxxx (x7)
//! ```
//!
//! The same encoding is used for element identifiers and element sizes.
//! An all-ones payload is reserved (the "unknown size" sentinel), so the
//! encoder never produces it.

use crate::error::{Error, Result};

/// Longest VInt the format allows.
pub const MAX_LENGTH: usize = 8;

/// A decoded variable-length integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VInt {
    length: usize,
    encoded_value: u64,
    value: u64,
}

impl VInt {
    /// Number of bytes the VInt occupies (1-8).
    pub fn length(&self) -> usize {
        self.length
    }

    /// The raw bytes, marker bit included, as a big-endian integer.
    pub fn encoded_value(&self) -> u64 {
        self.encoded_value
    }

    /// The integer with the marker bit stripped.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Returns true if every payload bit is set, the EBML "unknown size"
    /// sentinel.
    pub fn is_unknown_size(&self) -> bool {
        self.value == payload_mask(self.length)
    }
}

/// Decodes a VInt from the start of `bytes`.
///
/// Fails with [`Error::MalformedVInt`] if the first byte is zero or the
/// encoded length exceeds `max_length`, and with [`Error::BufferUnderrun`]
/// if `bytes` is shorter than the encoded length.
pub fn decode(bytes: &[u8], max_length: usize) -> Result<VInt> {
    decode_at(bytes, max_length, 0)
}

/// Like [`decode`], reporting errors relative to `offset`.
pub(crate) fn decode_at(bytes: &[u8], max_length: usize, offset: usize) -> Result<VInt> {
    let first = *bytes.first().ok_or(Error::BufferUnderrun {
        offset,
        requested: 1,
        available: 0,
    })?;

    let length = first.leading_zeros() as usize + 1;
    if first == 0 || length > max_length.min(MAX_LENGTH) {
        return Err(Error::MalformedVInt {
            offset,
            length,
            max_length,
        });
    }
    if bytes.len() < length {
        return Err(Error::BufferUnderrun {
            offset,
            requested: length,
            available: bytes.len(),
        });
    }

    let encoded_value = bytes[..length]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    let value = encoded_value & payload_mask(length);

    Ok(VInt {
        length,
        encoded_value,
        value,
    })
}

/// Returns the minimal length needed to encode `value`.
pub fn size_for(value: u64) -> Result<usize> {
    (1..=MAX_LENGTH)
        .find(|&length| value < payload_mask(length))
        .ok_or(Error::VIntOutOfRange(value))
}

/// Encodes `value` using the minimal length.
pub fn encode(value: u64) -> Result<Vec<u8>> {
    encode_with_length(value, size_for(value)?)
}

/// Encodes `value` using exactly `length` bytes.
///
/// Used when a size field is reserved at a fixed width before the value is
/// known.
pub fn encode_with_length(value: u64, length: usize) -> Result<Vec<u8>> {
    if !(1..=MAX_LENGTH).contains(&length) || value >= payload_mask(length) {
        return Err(Error::VIntOutOfRange(value));
    }

    let marked = value | (1u64 << (7 * length));
    Ok(marked.to_be_bytes()[8 - length..].to_vec())
}

/// All payload bits set for a VInt of `length` bytes.
fn payload_mask(length: usize) -> u64 {
    (1u64 << (7 * length)) - 1
}
