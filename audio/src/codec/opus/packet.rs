//! Borrowed Opus packet view.

use super::toc::{FrameCode, TOC};

/// Upper bound on audio carried by one packet (RFC 6716 §3.2.5: 120 ms).
pub const MAX_PACKET_SAMPLES_48K: u32 = 5760;

/// A raw Opus packet borrowed from its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a>(&'a [u8]);

impl<'a> Packet<'a> {
    /// Wraps packet bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self(data)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    /// Returns the TOC byte, if any.
    pub fn toc(&self) -> Option<TOC> {
        self.0.first().map(|&b| TOC::new(b))
    }

    /// Returns the number of frames coded in this packet.
    ///
    /// Code 3 packets carry the count in the low six bits of the second
    /// byte; a truncated code 3 packet counts as zero frames.
    pub fn frame_count(&self) -> u32 {
        match self.toc().map(|t| t.frame_code()) {
            None => 0,
            Some(FrameCode::OneFrame) => 1,
            Some(FrameCode::TwoEqualFrames | FrameCode::TwoDifferentFrames) => 2,
            Some(FrameCode::ArbitraryFrames) => {
                self.0.get(1).map_or(0, |&b| u32::from(b & 0b0011_1111))
            }
        }
    }

    /// Returns the number of 48 kHz samples this packet decodes to.
    pub fn samples_48k(&self) -> u32 {
        let Some(toc) = self.toc() else {
            return 0;
        };
        let per_frame = toc.configuration().frame_duration().samples_48k();
        (per_frame * self.frame_count()).min(MAX_PACKET_SAMPLES_48K)
    }
}
