//! OpusHead identification header (RFC 7845 §5.1).

use webmopus_buffer::{ByteReader, ByteWriter};

use crate::error::{Error, Result};

/// OpusHead magic signature.
pub const OPUS_HEAD_MAGIC: &[u8; 8] = b"OpusHead";

/// Opus identification header for channel mapping family 0.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// |      'O'      |      'p'      |      'u'      |      's'      |
/// |      'H'      |      'e'      |      'a'      |      'd'      |
/// |  Version = 1  | Channel Count |           Pre-skip            |
/// |                     Input Sample Rate (Hz)                    |
/// |   Output Gain (Q7.8 in dB)    | Mapping Family|
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpusHead {
    /// Channel count (1 or 2 for family 0).
    pub channels: u8,
    /// Samples at 48kHz to discard from the decoder output at the start.
    pub pre_skip: u16,
    /// Original input sample rate; advisory only.
    pub input_sample_rate: u32,
    /// Output gain, Q7.8 dB.
    pub output_gain: i16,
}

impl OpusHead {
    /// Encoded size of a family 0 header.
    pub const SIZE: usize = 19;
    /// Version written and accepted.
    pub const VERSION: u8 = 1;

    /// Creates a header with no output gain.
    pub fn new(channels: u8, pre_skip: u16, input_sample_rate: u32) -> Self {
        Self {
            channels,
            pre_skip,
            input_sample_rate,
            output_gain: 0,
        }
    }

    /// Parses an OpusHead packet, e.g. from a Matroska CodecPrivate.
    ///
    /// Only version 1 and channel mapping family 0 are accepted.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        if r.read_bytes(8)? != OPUS_HEAD_MAGIC {
            return Err(Error::InvalidHeader("missing OpusHead magic".into()));
        }
        let version = r.read_u8()?;
        // Version 1 only; it is what gets written back.
        if version != Self::VERSION {
            return Err(Error::InvalidHeader(format!("unsupported version {version}")));
        }
        let channels = r.read_u8()?;
        let pre_skip = r.read_u16_le()?;
        let input_sample_rate = r.read_u32_le()?;
        let output_gain = r.read_i16_le()?;
        let family = r.read_u8()?;
        if family != 0 {
            return Err(Error::UnsupportedChannelMapping(family));
        }
        if !(1..=2).contains(&channels) {
            return Err(Error::InvalidHeader(format!(
                "family 0 requires 1 or 2 channels, got {channels}"
            )));
        }

        Ok(Self {
            channels,
            pre_skip,
            input_sample_rate,
            output_gain,
        })
    }

    /// Serializes the header in wire order, no padding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; Self::SIZE];
        let mut w = ByteWriter::new(&mut buf);
        w.write_bytes(OPUS_HEAD_MAGIC)?;
        w.write_u8(Self::VERSION)?;
        w.write_u8(self.channels)?;
        w.write_u16_le(self.pre_skip)?;
        w.write_u32_le(self.input_sample_rate)?;
        w.write_i16_le(self.output_gain)?;
        w.write_u8(0)?;
        Ok(buf)
    }
}
