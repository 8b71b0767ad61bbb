//! Error types for demuxing and muxing.

use std::io;

use thiserror::Error;

/// Result type alias for audio operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Matroska parsing, Ogg muxing and remuxing.
///
/// Every error is terminal for the operation that produced it.
#[derive(Error, Debug)]
pub enum Error {
    /// Cursor or VInt failure while reading or writing binary data.
    #[error(transparent)]
    Buffer(#[from] webmopus_buffer::Error),

    /// A Matroska element is structurally invalid.
    #[error("mkv: malformed element {id:#x} at offset {offset}: {reason}")]
    MalformedElement {
        offset: usize,
        id: u64,
        reason: String,
    },

    /// A block's lacing header is inconsistent with its payload.
    #[error("mkv: invalid lacing at offset {offset}: {reason}")]
    InvalidLacing { offset: usize, reason: String },

    /// No usable Opus track, or the selected track is not Opus.
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// OpusHead declares a channel mapping family other than 0.
    #[error("opus: unsupported channel mapping family {0}")]
    UnsupportedChannelMapping(u8),

    /// An OpusHead or OpusTags packet is invalid.
    #[error("opus: invalid header: {0}")]
    InvalidHeader(String),

    /// An Ogg page read back from a stream is invalid.
    #[error("ogg: invalid page at offset {offset}: {reason}")]
    InvalidPage { offset: u64, reason: String },

    /// No random stream serial number could be drawn.
    #[error("ogg: cannot generate serial number: {0}")]
    SerialNumber(String),

    /// The output sink rejected a write.
    #[error("sink write failed: {0}")]
    SinkWriteFailure(#[from] io::Error),

    /// The muxer was used after it was finished.
    #[error("ogg: stream already finished")]
    Finished,

    /// The run failed after output had started; the sink holds
    /// `pages_written` complete pages of an unfinished stream.
    #[error("aborted after {pages_written} pages: {source}")]
    Aborted {
        pages_written: u32,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Creates a malformed-element error.
    pub fn malformed(offset: usize, id: u64, reason: impl Into<String>) -> Self {
        Error::MalformedElement {
            offset,
            id,
            reason: reason.into(),
        }
    }

    /// Creates an invalid-lacing error.
    pub fn lacing(offset: usize, reason: impl Into<String>) -> Self {
        Error::InvalidLacing {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns true if partial output was left in the sink.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted { .. })
    }
}
