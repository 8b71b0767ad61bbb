//! Error types for cursor and VInt operations.

use thiserror::Error;

/// Result type alias for buffer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Cursor or VInt codec error.
///
/// Read and write failures carry the absolute byte offset at which the
/// operation was attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The leading byte of a VInt is zero, or its length exceeds the
    /// caller's maximum.
    #[error("buffer: malformed vint at offset {offset} (length {length}, max {max_length})")]
    MalformedVInt {
        offset: usize,
        length: usize,
        max_length: usize,
    },

    /// A read requested more bytes than remain in the buffer.
    #[error("buffer: underrun at offset {offset}: need {requested} bytes, {available} left")]
    BufferUnderrun {
        offset: usize,
        requested: usize,
        available: usize,
    },

    /// A write needs more room than the destination buffer has left.
    #[error("buffer: overflow at offset {offset}: need {requested} bytes, {available} left")]
    BufferOverflow {
        offset: usize,
        requested: usize,
        available: usize,
    },

    /// The value does not fit in an 8-byte VInt (or in the requested length).
    #[error("buffer: value {0} cannot be encoded as a vint")]
    VIntOutOfRange(u64),
}
