//! Ogg page reader.

use std::io::{self, Read};

use webmopus_buffer::ByteReader;

use super::page::{PAGE_HEADER_SIZE, Page};
use crate::error::{Error, Result};

/// Reads whole Ogg pages from a byte stream.
pub struct OggSync<R: Read> {
    reader: R,
    offset: u64,
}

impl<R: Read> OggSync<R> {
    /// Creates a new Ogg sync state.
    pub fn new(reader: R) -> Self {
        Self { reader, offset: 0 }
    }

    /// Byte offset of the next page.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next Ogg page, or `None` at a clean end of stream.
    ///
    /// The stream ends cleanly only on a page boundary; a partial header
    /// is an error. The stored checksum is not verified; see
    /// [`Page::verify_crc`].
    pub fn read_page(&mut self) -> Result<Option<Page>> {
        let mut header = [0u8; PAGE_HEADER_SIZE];
        let mut filled = 0;
        while filled < header.len() {
            match self.reader.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(self.truncated("truncated page header")),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut r = ByteReader::with_base(&header, self.offset as usize);
        let (mut page, segments) = Page::parse_header(&mut r)?;

        page.segment_table = vec![0u8; segments];
        self.read_exact(&mut page.segment_table)?;
        page.body = vec![0u8; page.body_len()];
        self.read_exact(&mut page.body)?;

        self.offset += page.encoded_len() as u64;
        Ok(Some(page))
    }

    /// Returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => self.truncated("truncated page"),
            _ => e.into(),
        })
    }

    fn truncated(&self, reason: &str) -> Error {
        Error::InvalidPage {
            offset: self.offset,
            reason: reason.into(),
        }
    }
}

impl<R: Read> Iterator for OggSync<R> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_page().transpose()
    }
}
