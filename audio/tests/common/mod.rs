//! Synthetic WebM documents and Ogg stream checks shared by the
//! integration tests.

#![allow(dead_code)]

use std::io::Cursor;

use webmopus_audio::codec::ogg::{GRANULE_UNSET, OggSync, Page};
use webmopus_buffer::{ByteWriter, vint};

pub const EBML: u64 = 0x1A45_DFA3;
pub const DOC_TYPE: u64 = 0x4282;
pub const SEGMENT: u64 = 0x1853_8067;
pub const INFO: u64 = 0x1549_A966;
pub const TIMECODE_SCALE: u64 = 0x2A_D7B1;
pub const TRACKS: u64 = 0x1654_AE6B;
pub const TRACK_ENTRY: u64 = 0xAE;
pub const TRACK_NUMBER: u64 = 0xD7;
pub const TRACK_TYPE: u64 = 0x83;
pub const CODEC_ID: u64 = 0x86;
pub const CODEC_PRIVATE: u64 = 0x63A2;
pub const CODEC_DELAY: u64 = 0x56AA;
pub const AUDIO: u64 = 0xE1;
pub const SAMPLING_FREQUENCY: u64 = 0xB5;
pub const CHANNELS: u64 = 0x9F;
pub const CLUSTER: u64 = 0x1F43_B675;
pub const TIMECODE: u64 = 0xE7;
pub const SIMPLE_BLOCK: u64 = 0xA3;
pub const BLOCK_GROUP: u64 = 0xA0;
pub const BLOCK: u64 = 0xA1;
pub const CUES: u64 = 0x1C53_BB6B;
pub const VOID: u64 = 0xEC;

const UNKNOWN_SIZE: [u8; 8] = [0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];

fn id_bytes(id: u64) -> Vec<u8> {
    let len = (8 - id.leading_zeros() / 8) as usize;
    id.to_be_bytes()[8 - len..].to_vec()
}

/// Encodes one element with a minimal size field.
pub fn element(id: u64, payload: &[u8]) -> Vec<u8> {
    let id = id_bytes(id);
    let size_len = vint::size_for(payload.len() as u64).unwrap();
    let mut buf = vec![0u8; id.len() + size_len + payload.len()];
    let mut w = ByteWriter::new(&mut buf);
    w.write_bytes(&id).unwrap();
    w.write_vint(payload.len() as u64).unwrap();
    w.write_bytes(payload).unwrap();
    assert_eq!(w.remaining(), 0);
    buf
}

/// Encodes a container with the unknown-size sentinel.
pub fn unknown_size(id: u64, payload: &[u8]) -> Vec<u8> {
    [id_bytes(id), UNKNOWN_SIZE.to_vec(), payload.to_vec()].concat()
}

pub fn uint(id: u64, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take(7).take_while(|&&b| b == 0).count();
    element(id, &bytes[skip..])
}

pub fn float(id: u64, value: f64) -> Vec<u8> {
    element(id, &value.to_be_bytes())
}

pub fn string(id: u64, value: &str) -> Vec<u8> {
    element(id, value.as_bytes())
}

pub fn ebml_header() -> Vec<u8> {
    element(EBML, &string(DOC_TYPE, "webm"))
}

pub fn info(timecode_scale: u64) -> Vec<u8> {
    element(INFO, &uint(TIMECODE_SCALE, timecode_scale))
}

/// Opus TrackEntry; `codec_private` is written verbatim when given.
pub fn opus_track(
    number: u64,
    channels: u64,
    codec_delay: u64,
    codec_private: Option<&[u8]>,
) -> Vec<u8> {
    let mut body = [
        uint(TRACK_NUMBER, number),
        uint(TRACK_TYPE, 2),
        string(CODEC_ID, "A_OPUS"),
        uint(CODEC_DELAY, codec_delay),
        element(
            AUDIO,
            &[float(SAMPLING_FREQUENCY, 48_000.0), uint(CHANNELS, channels)].concat(),
        ),
    ]
    .concat();
    if let Some(private) = codec_private {
        body.extend(element(CODEC_PRIVATE, private));
    }
    element(TRACK_ENTRY, &body)
}

pub fn other_track(number: u64, track_type: u64, codec: &str) -> Vec<u8> {
    element(
        TRACK_ENTRY,
        &[
            uint(TRACK_NUMBER, number),
            uint(TRACK_TYPE, track_type),
            string(CODEC_ID, codec),
        ]
        .concat(),
    )
}

pub fn tracks(entries: &[Vec<u8>]) -> Vec<u8> {
    element(TRACKS, &entries.concat())
}

fn block_header(track: u64, timecode: i16, flags: u8) -> Vec<u8> {
    [vint::encode(track).unwrap(), timecode.to_be_bytes().to_vec(), vec![flags]].concat()
}

/// SimpleBlock carrying one frame.
pub fn simple_block(track: u64, timecode: i16, frame: &[u8]) -> Vec<u8> {
    element(SIMPLE_BLOCK, &[block_header(track, timecode, 0x80), frame.to_vec()].concat())
}

/// SimpleBlock with Xiph lacing.
pub fn xiph_block(track: u64, timecode: i16, frames: &[Vec<u8>]) -> Vec<u8> {
    let mut body = block_header(track, timecode, 0x80 | 0x02);
    body.push((frames.len() - 1) as u8);
    for frame in &frames[..frames.len() - 1] {
        body.extend(std::iter::repeat_n(255u8, frame.len() / 255));
        body.push((frame.len() % 255) as u8);
    }
    body.extend(frames.concat());
    element(SIMPLE_BLOCK, &body)
}

/// SimpleBlock with fixed-size lacing.
pub fn fixed_block(track: u64, timecode: i16, frames: &[Vec<u8>]) -> Vec<u8> {
    let mut body = block_header(track, timecode, 0x80 | 0x04);
    body.push((frames.len() - 1) as u8);
    body.extend(frames.concat());
    element(SIMPLE_BLOCK, &body)
}

/// BlockGroup wrapping a single-frame Block.
pub fn block_group(track: u64, timecode: i16, frame: &[u8]) -> Vec<u8> {
    let block = element(BLOCK, &[block_header(track, timecode, 0), frame.to_vec()].concat());
    element(BLOCK_GROUP, &block)
}

pub fn cluster(timecode: u64, blocks: &[Vec<u8>]) -> Vec<u8> {
    element(CLUSTER, &[uint(TIMECODE, timecode), blocks.concat()].concat())
}

/// Full document: EBML header plus a Segment of `children`.
pub fn webm(children: &[Vec<u8>]) -> Vec<u8> {
    [ebml_header(), element(SEGMENT, &children.concat())].concat()
}

/// Opus packet: one 20 ms SILK frame (config 1, mono, code 0) of `len`
/// bytes, TOC included.
pub fn opus_20ms(len: usize, fill: u8) -> Vec<u8> {
    let mut packet = vec![fill; len.max(1)];
    packet[0] = 0x08;
    packet
}

/// Opus packet: two 10 ms CELT frames (config 30, stereo, code 1).
pub fn opus_2x10ms(len: usize) -> Vec<u8> {
    let mut packet = vec![0x55; len.max(1)];
    packet[0] = (30 << 3) | 0x04 | 0x01;
    packet
}

pub fn read_pages(data: &[u8]) -> Vec<Page> {
    OggSync::new(Cursor::new(data))
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

/// Rebuilds the packets of a logical stream from its pages.
pub fn packets(pages: &[Page]) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();
    let mut current = Vec::new();
    for page in pages {
        let mut pos = 0;
        for &lacing in &page.segment_table {
            let len = lacing as usize;
            current.extend_from_slice(&page.body[pos..pos + len]);
            pos += len;
            if lacing < 255 {
                packets.push(std::mem::take(&mut current));
            }
        }
        assert_eq!(pos, page.body.len());
    }
    assert!(current.is_empty(), "stream ends inside a packet");
    packets
}

/// Checks the stream-level invariants every emitted file must satisfy.
pub fn assert_valid_stream(pages: &[Page]) {
    assert!(pages.len() >= 2, "missing header pages");
    let serial = pages[0].serial;
    let mut last_granule = 0;
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(page.sequence, i as u32, "sequence gap at page {i}");
        assert_eq!(page.serial, serial);
        assert_eq!(page.version, 0);
        assert!(page.verify_crc(), "bad CRC on page {i}");
        assert_eq!(page.is_bos(), i == 0, "BOS on page {i}");
        assert_eq!(page.is_eos(), i == pages.len() - 1, "EOS on page {i}");
        assert!(page.segment_table.len() <= 255);
        if page.granule_position != GRANULE_UNSET {
            assert!(page.granule_position >= last_granule, "granule went back at page {i}");
            last_granule = page.granule_position;
        }
    }
    assert_eq!(&pages[0].body[..8], b"OpusHead");
    assert_eq!(pages[0].segment_table.len(), 1);
    assert_eq!(&pages[1].body[..8], b"OpusTags");
    assert_eq!(pages[0].granule_position, 0);
    assert_eq!(pages[1].granule_position, 0);
}
