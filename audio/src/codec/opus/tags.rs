//! OpusTags comment header (RFC 7845 §5.2).

use webmopus_buffer::{ByteReader, ByteWriter};

use crate::error::{Error, Result};

/// OpusTags magic signature.
pub const OPUS_TAGS_MAGIC: &[u8; 8] = b"OpusTags";

/// Vorbis-style comment header carried in the second Ogg page.
///
/// The default value encodes to the minimal 16-byte packet: an empty
/// vendor string and no comments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpusTags {
    pub vendor: String,
    /// `KEY=value` entries, written in order.
    pub comments: Vec<String>,
}

impl OpusTags {
    /// Creates tags with a vendor string and no comments.
    pub fn with_vendor(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            comments: Vec::new(),
        }
    }

    /// Returns the serialized size in bytes.
    pub fn encoded_len(&self) -> usize {
        8 + 4 + self.vendor.len() + 4 + self.comments.iter().map(|c| 4 + c.len()).sum::<usize>()
    }

    /// Serializes the packet.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.encoded_len()];
        let mut w = ByteWriter::new(&mut buf);
        w.write_bytes(OPUS_TAGS_MAGIC)?;
        w.write_u32_le(len_u32(self.vendor.len())?)?;
        w.write_bytes(self.vendor.as_bytes())?;
        w.write_u32_le(len_u32(self.comments.len())?)?;
        for comment in &self.comments {
            w.write_u32_le(len_u32(comment.len())?)?;
            w.write_bytes(comment.as_bytes())?;
        }
        Ok(buf)
    }

    /// Parses an OpusTags packet. Trailing bytes after the last comment
    /// are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        if r.read_bytes(8)? != OPUS_TAGS_MAGIC {
            return Err(Error::InvalidHeader("missing OpusTags magic".into()));
        }
        let vendor = read_string(&mut r)?;
        let count = r.read_u32_le()? as usize;
        // Each comment needs at least its 4-byte length.
        if count > r.remaining() / 4 {
            return Err(Error::InvalidHeader(format!(
                "comment count {count} exceeds packet size"
            )));
        }
        let comments = (0..count)
            .map(|_| read_string(&mut r))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { vendor, comments })
    }
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::InvalidHeader(format!("field too long: {len} bytes")))
}

fn read_string(r: &mut ByteReader<'_>) -> Result<String> {
    let len = r.read_u32_le()? as usize;
    let bytes = r.read_bytes(len)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| Error::InvalidHeader("comment is not valid UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_minimal() {
        let bytes = OpusTags::default().to_bytes().unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], b"OpusTags");
        assert_eq!(&bytes[8..], &[0u8; 8]);
    }

    #[test]
    fn test_vendor_and_comments() {
        let tags = OpusTags {
            vendor: "webm2ogg".into(),
            comments: vec!["TITLE=demo".into(), "ARTIST=nobody".into()],
        };
        let bytes = tags.to_bytes().unwrap();
        assert_eq!(bytes.len(), tags.encoded_len());
        assert_eq!(&bytes[8..12], &8u32.to_le_bytes());
        assert_eq!(&bytes[12..20], b"webm2ogg");
        assert_eq!(&bytes[20..24], &2u32.to_le_bytes());
        assert_eq!(OpusTags::parse(&bytes).unwrap(), tags);
    }

    #[test]
    fn test_parse_rejects_huge_count() {
        let mut bytes = OpusTags::default().to_bytes().unwrap();
        bytes[12..16].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(OpusTags::parse(&bytes), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        assert!(matches!(
            OpusTags::parse(b"OpusHead\0\0\0\0\0\0\0\0"),
            Err(Error::InvalidHeader(_))
        ));
    }
}
