//! Ogg page structures.

use webmopus_buffer::{ByteReader, ByteWriter};

use super::crc;
use crate::error::{Error, Result};

/// Capture pattern at the start of every page.
pub const OGG_MAGIC: &[u8; 4] = b"OggS";

/// Size of the fixed page header, before the segment table.
pub const PAGE_HEADER_SIZE: usize = 27;

/// Maximum number of lacing values in one page.
pub const MAX_SEGMENTS: usize = 255;

/// Granule position of a page on which no packet completes.
pub const GRANULE_UNSET: u64 = u64::MAX;

/// Byte offset of the CRC field within the header.
const CRC_OFFSET: usize = 22;

/// Header type flags.
pub mod flags {
    /// Continuation of previous packet.
    pub const CONTINUATION: u8 = 0x01;
    /// Beginning of stream.
    pub const BOS: u8 = 0x02;
    /// End of stream.
    pub const EOS: u8 = 0x04;
}

/// Ogg page.
///
/// ```text
/// | "OggS" | ver | flags | granule u64 | serial u32 | seq u32 | crc u32 | n | lacing[n] | body |
/// ```
/// All integers little-endian.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Version (always 0)
    pub version: u8,
    /// Header type flags
    pub header_type: u8,
    /// Absolute granule position
    pub granule_position: u64,
    /// Stream serial number
    pub serial: u32,
    /// Page sequence number
    pub sequence: u32,
    /// CRC checksum as stored in the header; filled by [`Page::to_bytes`]
    /// on write and by the reader on read.
    pub checksum: u32,
    /// Lacing values
    pub segment_table: Vec<u8>,
    /// Page body data
    pub body: Vec<u8>,
}

impl Page {
    /// Returns true if this is a beginning-of-stream page.
    pub fn is_bos(&self) -> bool {
        (self.header_type & flags::BOS) != 0
    }

    /// Returns true if this is an end-of-stream page.
    pub fn is_eos(&self) -> bool {
        (self.header_type & flags::EOS) != 0
    }

    /// Returns true if this is a continuation page.
    pub fn is_continuation(&self) -> bool {
        (self.header_type & flags::CONTINUATION) != 0
    }

    /// Number of packets that end on this page.
    pub fn packets_completed(&self) -> usize {
        self.segment_table.iter().filter(|&&v| v < 255).count()
    }

    /// Header size including the segment table.
    pub fn header_len(&self) -> usize {
        PAGE_HEADER_SIZE + self.segment_table.len()
    }

    /// Serialized page size.
    pub fn encoded_len(&self) -> usize {
        self.header_len() + self.body.len()
    }

    /// Serializes the page and patches the computed CRC into the header.
    ///
    /// The `checksum` field is ignored.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let segments = u8::try_from(self.segment_table.len()).map_err(|_| Error::InvalidPage {
            offset: 0,
            reason: format!("{} lacing values", self.segment_table.len()),
        })?;

        let mut buf = vec![0u8; self.encoded_len()];
        let mut w = ByteWriter::new(&mut buf);
        w.write_bytes(OGG_MAGIC)?;
        w.write_u8(self.version)?;
        w.write_u8(self.header_type)?;
        w.write_u64_le(self.granule_position)?;
        w.write_u32_le(self.serial)?;
        w.write_u32_le(self.sequence)?;
        w.write_u32_le(0)?;
        w.write_u8(segments)?;
        w.write_bytes(&self.segment_table)?;
        w.write_bytes(&self.body)?;

        let crc = crc::crc32(&buf);
        buf[CRC_OFFSET..CRC_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Recomputes the checksum and compares it with the stored one.
    pub fn verify_crc(&self) -> bool {
        self.compute_crc() == self.checksum
    }

    /// Computes the checksum of this page as it would be written.
    pub fn compute_crc(&self) -> u32 {
        let mut header = [0u8; PAGE_HEADER_SIZE];
        header[..4].copy_from_slice(OGG_MAGIC);
        header[4] = self.version;
        header[5] = self.header_type;
        header[6..14].copy_from_slice(&self.granule_position.to_le_bytes());
        header[14..18].copy_from_slice(&self.serial.to_le_bytes());
        header[18..22].copy_from_slice(&self.sequence.to_le_bytes());
        header[26] = self.segment_table.len() as u8;

        let crc = crc::update(0, &header);
        let crc = crc::update(crc, &self.segment_table);
        crc::update(crc, &self.body)
    }

    /// Parses one page from the front of `data`.
    ///
    /// Returns the page and the number of bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(Page, usize)> {
        let mut r = ByteReader::new(data);
        let (mut page, segments) = Self::parse_header(&mut r)?;
        page.segment_table = r.read_bytes(segments)?.to_vec();
        let body_len = page.body_len();
        page.body = r.read_bytes(body_len)?.to_vec();
        Ok((page, r.position()))
    }

    /// Parses the fixed header; returns the page without its segment table
    /// and body, plus the segment count.
    pub(crate) fn parse_header(r: &mut ByteReader<'_>) -> Result<(Page, usize)> {
        let offset = r.offset() as u64;
        if r.read_bytes(4)? != OGG_MAGIC {
            return Err(Error::InvalidPage {
                offset,
                reason: "missing OggS capture pattern".into(),
            });
        }
        let version = r.read_u8()?;
        if version != 0 {
            return Err(Error::InvalidPage {
                offset,
                reason: format!("unsupported version {version}"),
            });
        }
        let page = Page {
            version,
            header_type: r.read_u8()?,
            granule_position: r.read_u64_le()?,
            serial: r.read_u32_le()?,
            sequence: r.read_u32_le()?,
            checksum: r.read_u32_le()?,
            segment_table: Vec::new(),
            body: Vec::new(),
        };
        let segments = r.read_u8()? as usize;
        Ok((page, segments))
    }

    /// Body size declared by the segment table.
    pub fn body_len(&self) -> usize {
        self.segment_table.iter().map(|&s| s as usize).sum()
    }
}
