//! Ogg/Opus page muxer.
//!
//! Packs Opus packets into Ogg pages: lacing, page boundaries, granule
//! positions and checksums. At most one page is buffered; it is flushed
//! only once the next packet or the end of stream is known, so the EOS
//! flag always lands on the last page.

use std::io::Write;

use tracing::debug;

use super::page::{GRANULE_UNSET, MAX_SEGMENTS, Page, flags};
use crate::codec::opus::{OpusHead, OpusTags};
use crate::error::{Error, Result};

/// Default soft limit on the payload of one audio page.
pub const DEFAULT_MAX_PAGE_BYTES: usize = 4096;

/// Default soft limit on the audio in one page: one second at 48 kHz.
pub const DEFAULT_MAX_PAGE_SAMPLES: u64 = 48_000;

/// Soft limits that close an audio page before the next packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// A page carrying at least this many body bytes is closed.
    pub max_page_bytes: usize,
    /// A page carrying at least this many 48 kHz samples is closed.
    pub max_page_samples: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
            max_page_samples: DEFAULT_MAX_PAGE_SAMPLES,
        }
    }
}

/// Counters reported by [`OpusMuxer::finish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuxStats {
    pub packets: u64,
    pub pages: u32,
    pub bytes: u64,
    /// Granule position of the last page.
    pub granule_position: u64,
}

#[derive(Debug, Default)]
struct PendingPage {
    header_type: u8,
    segments: Vec<u8>,
    body: Vec<u8>,
    /// Granule at the end of the last packet completed here.
    granule: Option<u64>,
    samples: u64,
    /// Holds header packets only; never shared with audio.
    header_only: bool,
}

/// Writes an Ogg/Opus logical stream to `W`.
///
/// The OpusHead page is written by [`OpusMuxer::new`]; the OpusTags page
/// is held back until the first audio packet or [`OpusMuxer::finish`].
pub struct OpusMuxer<W: Write> {
    writer: W,
    serial: u32,
    limits: PageLimits,
    sequence: u32,
    granule: u64,
    pending: Option<PendingPage>,
    packets: u64,
    bytes_written: u64,
    finished: bool,
}

impl<W: Write> OpusMuxer<W> {
    /// Creates a muxer and writes the OpusHead page.
    pub fn new(
        writer: W,
        serial: u32,
        head: &OpusHead,
        tags: &OpusTags,
        limits: PageLimits,
    ) -> Result<Self> {
        let mut muxer = Self {
            writer,
            serial,
            limits,
            sequence: 0,
            granule: 0,
            pending: None,
            packets: 0,
            bytes_written: 0,
            finished: false,
        };

        muxer.lace(&head.to_bytes()?, 0, flags::BOS, true)?;
        muxer.flush_pending(false)?;
        muxer.lace(&tags.to_bytes()?, 0, 0, true)?;
        Ok(muxer)
    }

    /// Returns the stream serial number.
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Returns the number of pages handed to the sink.
    pub fn pages_written(&self) -> u32 {
        self.sequence
    }

    /// Returns the number of bytes handed to the sink.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Returns the granule position after the last packet written.
    pub fn granule_position(&self) -> u64 {
        self.granule
    }

    /// Appends one audio packet that decodes to `samples` 48 kHz samples.
    pub fn write_packet(&mut self, packet: &[u8], samples: u32) -> Result<()> {
        if self.finished {
            return Err(Error::Finished);
        }

        let lacing_values = packet.len() / 255 + 1;
        if let Some(page) = &self.pending {
            let full = !page.segments.is_empty()
                && (page.body.len() >= self.limits.max_page_bytes
                    || page.samples >= self.limits.max_page_samples
                    || page.segments.len() + lacing_values > MAX_SEGMENTS);
            if page.header_only || full {
                self.flush_pending(false)?;
            }
        }

        self.granule += u64::from(samples);
        self.packets += 1;
        self.lace(packet, u64::from(samples), 0, false)
    }

    /// Flushes the last page with EOS set and flushes the sink.
    pub fn finish(&mut self) -> Result<MuxStats> {
        if self.finished {
            return Err(Error::Finished);
        }
        self.flush_pending(true)?;
        self.writer.flush()?;
        self.finished = true;

        Ok(MuxStats {
            packets: self.packets,
            pages: self.sequence,
            bytes: self.bytes_written,
            granule_position: self.granule,
        })
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Appends `data` as one packet to the pending page, splitting it over
    /// as many pages as its lacing needs.
    fn lace(
        &mut self,
        data: &[u8],
        samples: u64,
        header_type: u8,
        header_only: bool,
    ) -> Result<()> {
        let mut rest = data;
        let mut first_type = header_type;
        loop {
            let page = self.pending.get_or_insert_with(|| PendingPage {
                header_type: first_type,
                header_only,
                ..PendingPage::default()
            });

            let room = MAX_SEGMENTS - page.segments.len();
            let full_units = rest.len() / 255;
            if full_units < room {
                page.segments.extend(std::iter::repeat_n(255u8, full_units));
                page.segments.push((rest.len() % 255) as u8);
                page.body.extend_from_slice(rest);
                page.granule = Some(self.granule);
                page.samples += samples;
                return Ok(());
            }

            // The terminating lacing value does not fit; continue on the
            // next page.
            let (head, tail) = rest.split_at(room * 255);
            page.segments.extend(std::iter::repeat_n(255u8, room));
            page.body.extend_from_slice(head);
            rest = tail;
            self.flush_pending(false)?;
            first_type = flags::CONTINUATION;
        }
    }

    fn flush_pending(&mut self, eos: bool) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let mut header_type = pending.header_type;
        if eos {
            header_type |= flags::EOS;
        }
        let page = Page {
            version: 0,
            header_type,
            granule_position: pending.granule.unwrap_or(GRANULE_UNSET),
            serial: self.serial,
            sequence: self.sequence,
            checksum: 0,
            segment_table: pending.segments,
            body: pending.body,
        };
        let bytes = page.to_bytes()?;
        self.writer.write_all(&bytes)?;

        debug!(
            sequence = page.sequence,
            granule = page.granule_position,
            segments = page.segment_table.len(),
            bytes = bytes.len(),
            flags = page.header_type,
            "ogg page written"
        );
        self.sequence += 1;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ogg::OggSync;
    use std::io::{self, Cursor};

    const SERIAL: u32 = 0x1234_5678;

    fn muxer(limits: PageLimits) -> OpusMuxer<Vec<u8>> {
        OpusMuxer::new(
            Vec::new(),
            SERIAL,
            &OpusHead::new(2, 312, 48_000),
            &OpusTags::default(),
            limits,
        )
        .unwrap()
    }

    fn read_pages(data: Vec<u8>) -> Vec<Page> {
        let mut sync = OggSync::new(Cursor::new(data));
        let mut pages = Vec::new();
        while let Some(page) = sync.read_page().unwrap() {
            pages.push(page);
        }
        pages
    }

    #[test]
    fn test_headers_only() {
        let mut m = muxer(PageLimits::default());
        let stats = m.finish().unwrap();
        assert_eq!(stats.pages, 2);
        assert_eq!(stats.granule_position, 0);

        let pages = read_pages(m.into_inner());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].header_type, flags::BOS);
        assert_eq!(pages[0].body.len(), OpusHead::SIZE);
        assert_eq!(pages[1].header_type, flags::EOS);
        assert_eq!(pages[1].body.len(), 16);
        assert!(pages.iter().all(|p| p.granule_position == 0 && p.verify_crc()));
    }

    #[test]
    fn test_single_packet() {
        let mut m = muxer(PageLimits::default());
        m.write_packet(&[0x08, 1, 2, 3], 960).unwrap();
        m.finish().unwrap();

        let pages = read_pages(m.into_inner());
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].header_type, 0);
        assert_eq!(pages[2].header_type, flags::EOS);
        assert_eq!(pages[2].granule_position, 960);
        assert_eq!(pages[2].segment_table, vec![4]);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.sequence, i as u32);
            assert_eq!(page.serial, SERIAL);
        }
    }

    #[test]
    fn test_lacing_multiple_of_255() {
        let mut m = muxer(PageLimits::default());
        m.write_packet(&[0u8; 510], 960).unwrap();
        m.write_packet(&[0u8; 300], 960).unwrap();
        m.finish().unwrap();

        let pages = read_pages(m.into_inner());
        assert_eq!(pages[2].segment_table, vec![255, 255, 0, 255, 45]);
        assert_eq!(pages[2].body.len(), 810);
        assert_eq!(pages[2].granule_position, 1920);
    }

    #[test]
    fn test_byte_limit_closes_page() {
        let limits = PageLimits {
            max_page_bytes: 100,
            ..PageLimits::default()
        };
        let mut m = muxer(limits);
        for _ in 0..5 {
            m.write_packet(&[0u8; 60], 960).unwrap();
        }
        m.finish().unwrap();

        let pages = read_pages(m.into_inner());
        let audio: Vec<_> = pages[2..].iter().map(|p| p.segment_table.len()).collect();
        assert_eq!(audio, vec![2, 2, 1]);
        let granules: Vec<_> = pages[2..].iter().map(|p| p.granule_position).collect();
        assert_eq!(granules, vec![1920, 3840, 4800]);
        assert!(pages.last().unwrap().is_eos());
        assert_eq!(pages.iter().filter(|p| p.is_eos()).count(), 1);
    }

    #[test]
    fn test_sample_limit_closes_page() {
        let limits = PageLimits {
            max_page_samples: 2880,
            ..PageLimits::default()
        };
        let mut m = muxer(limits);
        for _ in 0..4 {
            m.write_packet(&[0u8; 10], 960).unwrap();
        }
        m.finish().unwrap();

        let pages = read_pages(m.into_inner());
        assert_eq!(pages.len(), 4);
        assert_eq!(pages[2].segment_table.len(), 3);
        assert_eq!(pages[2].granule_position, 2880);
        assert_eq!(pages[3].granule_position, 3840);
    }

    #[test]
    fn test_segment_limit_closes_page() {
        let mut m = muxer(PageLimits {
            max_page_bytes: usize::MAX,
            max_page_samples: u64::MAX,
        });
        for _ in 0..300 {
            m.write_packet(&[1], 120).unwrap();
        }
        m.finish().unwrap();

        let pages = read_pages(m.into_inner());
        assert_eq!(pages.len(), 4);
        assert_eq!(pages[2].segment_table.len(), 255);
        assert_eq!(pages[2].granule_position, 255 * 120);
        assert_eq!(pages[3].segment_table.len(), 45);
        assert_eq!(pages[3].granule_position, 300 * 120);
    }

    #[test]
    fn test_large_packet_spans_pages() {
        let mut m = muxer(PageLimits::default());
        // 255 * 255 bytes needs 256 lacing values.
        let big = vec![0xAB; 255 * 255];
        m.write_packet(&big, 2880).unwrap();
        m.write_packet(&[0x08], 960).unwrap();
        m.finish().unwrap();

        let pages = read_pages(m.into_inner());
        assert_eq!(pages.len(), 4);

        let first = &pages[2];
        assert_eq!(first.segment_table.len(), 255);
        assert!(first.segment_table.iter().all(|&v| v == 255));
        assert_eq!(first.granule_position, GRANULE_UNSET);
        assert!(!first.is_continuation());

        let second = &pages[3];
        assert!(second.is_continuation());
        assert!(second.is_eos());
        assert_eq!(second.segment_table, vec![0, 1]);
        assert_eq!(second.granule_position, 3840);

        let total: usize = pages[2..].iter().map(|p| p.body.len()).sum();
        assert_eq!(total, big.len() + 1);
    }

    #[test]
    fn test_write_after_finish() {
        let mut m = muxer(PageLimits::default());
        m.finish().unwrap();
        assert!(matches!(m.write_packet(&[0], 960), Err(Error::Finished)));
        assert!(matches!(m.finish(), Err(Error::Finished)));
    }

    struct FailingSink {
        accepted: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.accepted == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "sink closed"));
            }
            self.accepted -= 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure() {
        let mut m = OpusMuxer::new(
            FailingSink { accepted: 1 },
            SERIAL,
            &OpusHead::new(1, 0, 48_000),
            &OpusTags::default(),
            PageLimits::default(),
        )
        .unwrap();
        assert_eq!(m.pages_written(), 1);
        let err = m.write_packet(&[0x08], 960).unwrap_err();
        assert!(matches!(err, Error::SinkWriteFailure(_)));
        assert_eq!(m.pages_written(), 1);
    }
}
