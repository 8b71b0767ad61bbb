//! SimpleBlock and Block payload parsing.

use webmopus_buffer::ByteReader;

use super::element::MAX_SIZE_LENGTH;
use crate::error::{Error, Result};

/// Flag bits selecting the lacing scheme.
const LACING_MASK: u8 = 0x06;

/// Frame lacing scheme of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lacing {
    None,
    Xiph,
    FixedSize,
    Ebml,
}

impl Lacing {
    fn from_flags(flags: u8) -> Self {
        match (flags & LACING_MASK) >> 1 {
            0 => Lacing::None,
            1 => Lacing::Xiph,
            2 => Lacing::FixedSize,
            _ => Lacing::Ebml,
        }
    }
}

/// A parsed block with its frames split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    /// Absolute offset of the block payload.
    pub offset: usize,
    pub track: u64,
    /// Timecode relative to the enclosing cluster.
    pub timecode: i16,
    pub flags: u8,
    pub lacing: Lacing,
    pub frames: Vec<&'a [u8]>,
}

impl<'a> Block<'a> {
    /// Parses a block payload located at absolute `offset`.
    pub fn parse(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut r = ByteReader::with_base(data, offset);
        let track = r.read_vint(MAX_SIZE_LENGTH)?.value();
        let timecode = r.read_i16_be()?;
        let flags = r.read_u8()?;
        let lacing = Lacing::from_flags(flags);

        let frames = match lacing {
            Lacing::None => vec![r.peek_rest()],
            _ => {
                let count = usize::from(r.read_u8()?) + 1;
                let sizes = match lacing {
                    Lacing::Xiph => xiph_sizes(&mut r, count)?,
                    Lacing::Ebml => ebml_sizes(&mut r, count)?,
                    _ => fixed_sizes(&r, count)?,
                };
                split_frames(&mut r, &sizes)?
            }
        };

        Ok(Self {
            offset,
            track,
            timecode,
            flags,
            lacing,
            frames,
        })
    }
}

/// Reads Xiph lacing: every size but the last as a run of 255s plus a
/// terminating byte below 255.
fn xiph_sizes(r: &mut ByteReader<'_>, count: usize) -> Result<Vec<usize>> {
    let mut sizes = Vec::with_capacity(count);
    for _ in 0..count - 1 {
        let mut size = 0usize;
        loop {
            let byte = r
                .read_u8()
                .map_err(|_| Error::lacing(r.offset(), "xiph lacing: unexpected end of data"))?;
            size += usize::from(byte);
            if byte < 255 {
                break;
            }
        }
        sizes.push(size);
    }
    last_size(r, sizes)
}

/// Reads EBML lacing: the first size as an unsigned VInt, then signed
/// VInt deltas from the previous size.
fn ebml_sizes(r: &mut ByteReader<'_>, count: usize) -> Result<Vec<usize>> {
    let mut sizes = Vec::with_capacity(count);
    if count > 1 {
        let first = r.read_vint(MAX_SIZE_LENGTH)?.value();
        let mut prev = i64::try_from(first)
            .map_err(|_| Error::lacing(r.offset(), "ebml lacing: size out of range"))?;
        sizes.push(prev as usize);
        for _ in 1..count - 1 {
            let at = r.offset();
            let raw = r.read_vint(MAX_SIZE_LENGTH)?;
            // Bias is 2^(7*len - 1) - 1.
            let bias = (1i64 << (7 * raw.length() - 1)) - 1;
            prev += raw.value() as i64 - bias;
            if prev < 0 {
                return Err(Error::lacing(at, "ebml lacing: negative frame size"));
            }
            sizes.push(prev as usize);
        }
    }
    last_size(r, sizes)
}

fn fixed_sizes(r: &ByteReader<'_>, count: usize) -> Result<Vec<usize>> {
    let total = r.remaining();
    if total % count != 0 {
        return Err(Error::lacing(
            r.offset(),
            format!("fixed lacing: {total} bytes not divisible into {count} frames"),
        ));
    }
    Ok(vec![total / count; count])
}

/// Appends the implied size of the last frame.
fn last_size(r: &ByteReader<'_>, mut sizes: Vec<usize>) -> Result<Vec<usize>> {
    let laced: usize = sizes.iter().sum();
    let last = r.remaining().checked_sub(laced).ok_or_else(|| {
        Error::lacing(
            r.offset(),
            format!("laced sizes total {laced} bytes, only {} available", r.remaining()),
        )
    })?;
    sizes.push(last);
    Ok(sizes)
}

fn split_frames<'a>(r: &mut ByteReader<'a>, sizes: &[usize]) -> Result<Vec<&'a [u8]>> {
    sizes
        .iter()
        .map(|&size| {
            let at = r.offset();
            r.read_bytes(size)
                .map_err(|_| Error::lacing(at, format!("frame of {size} bytes overruns block")))
        })
        .collect()
}
