//! Navigable view of a decoded Matroska document.

use tracing::warn;

use super::block::Block;
use super::element::{self, Element};
use super::schema::ids;
use crate::error::{Error, Result};

/// TimecodeScale used when Info does not carry one: 1 ms.
pub const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// Matroska codec id of Opus tracks.
pub const CODEC_OPUS: &str = "A_OPUS";

/// Matroska track types.
pub mod track_type {
    pub const VIDEO: u64 = 1;
    pub const AUDIO: u64 = 2;
    pub const SUBTITLE: u64 = 17;
}

/// A whole Matroska/WebM file decoded into an element tree.
#[derive(Debug)]
pub struct Document<'a> {
    elements: Vec<Element<'a>>,
    segment: usize,
}

impl<'a> Document<'a> {
    /// Decodes `data` and locates the Segment.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let elements = element::parse_document(data)?;
        let segment = elements
            .iter()
            .position(|e| e.id == ids::SEGMENT)
            .ok_or_else(|| Error::malformed(0, ids::SEGMENT, "document has no Segment"))?;

        let doc = Self { elements, segment };
        match doc.doc_type() {
            Some("webm" | "matroska") | None => {}
            Some(other) => warn!(doc_type = other, "unexpected EBML DocType"),
        }
        Ok(doc)
    }

    pub fn segment(&self) -> &Element<'a> {
        &self.elements[self.segment]
    }

    /// DocType from the EBML header, if present and readable.
    pub fn doc_type(&self) -> Option<&'a str> {
        self.elements
            .iter()
            .find(|e| e.id == ids::EBML)?
            .child(ids::DOC_TYPE)?
            .as_str()
            .ok()
    }

    /// Nanoseconds per timecode unit.
    pub fn timecode_scale(&self) -> Result<u64> {
        let scale = match self.info().and_then(|info| info.child(ids::TIMECODE_SCALE)) {
            Some(e) => e.as_uint()?,
            None => DEFAULT_TIMECODE_SCALE,
        };
        if scale == 0 {
            let offset = self.segment().offset;
            return Err(Error::malformed(offset, ids::TIMECODE_SCALE, "zero TimecodeScale"));
        }
        Ok(scale)
    }

    /// Segment duration in timecode units.
    pub fn duration(&self) -> Result<Option<f64>> {
        self.info()
            .and_then(|info| info.child(ids::DURATION))
            .map(Element::as_float)
            .transpose()
    }

    /// Track entries of every Tracks element, in document order.
    pub fn tracks(&self) -> Result<Vec<TrackEntry<'a>>> {
        self.segment()
            .children_with(ids::TRACKS)
            .flat_map(|tracks| tracks.children_with(ids::TRACK_ENTRY))
            .map(TrackEntry::from_element)
            .collect()
    }

    /// Clusters in document order; each is decoded when reached.
    pub fn clusters(&self) -> impl Iterator<Item = Result<Cluster<'a>>> + '_ {
        self.segment()
            .children_with(ids::CLUSTER)
            .map(Cluster::from_element)
    }

    fn info(&self) -> Option<&Element<'a>> {
        self.segment().child(ids::INFO)
    }
}

/// Audio settings of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSettings {
    pub sampling_frequency: f64,
    pub channels: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sampling_frequency: 8000.0,
            channels: 1,
        }
    }
}

/// One TrackEntry.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEntry<'a> {
    pub number: u64,
    pub uid: Option<u64>,
    pub track_type: u64,
    pub name: Option<&'a str>,
    pub language: Option<&'a str>,
    pub codec_id: &'a str,
    pub codec_private: Option<&'a [u8]>,
    /// Nanoseconds of codec-inherent delay.
    pub codec_delay: u64,
    /// Nanoseconds of data to decode before a seek target.
    pub seek_pre_roll: u64,
    pub audio: Option<AudioSettings>,
}

impl<'a> TrackEntry<'a> {
    fn from_element(e: &Element<'a>) -> Result<Self> {
        let uint = |id: u64| e.child(id).map(Element::as_uint).transpose();
        let string = |id: u64| e.child(id).map(Element::as_str).transpose();

        let number = uint(ids::TRACK_NUMBER)?
            .filter(|&n| n != 0)
            .ok_or_else(|| e.malformed("TrackEntry without a TrackNumber"))?;
        let audio = e
            .child(ids::AUDIO)
            .map(|a| -> Result<AudioSettings> {
                let defaults = AudioSettings::default();
                Ok(AudioSettings {
                    sampling_frequency: match a.child(ids::SAMPLING_FREQUENCY) {
                        Some(f) => f.as_float()?,
                        None => defaults.sampling_frequency,
                    },
                    channels: match a.child(ids::CHANNELS) {
                        Some(c) => c.as_uint()?,
                        None => defaults.channels,
                    },
                })
            })
            .transpose()?;

        Ok(Self {
            number,
            uid: uint(ids::TRACK_UID)?,
            track_type: uint(ids::TRACK_TYPE)?.unwrap_or(0),
            name: string(ids::NAME)?,
            language: string(ids::LANGUAGE)?,
            codec_id: string(ids::CODEC_ID)?.unwrap_or(""),
            codec_private: e.child(ids::CODEC_PRIVATE).map(Element::bytes).transpose()?,
            codec_delay: uint(ids::CODEC_DELAY)?.unwrap_or(0),
            seek_pre_roll: uint(ids::SEEK_PRE_ROLL)?.unwrap_or(0),
            audio,
        })
    }

    pub fn is_opus(&self) -> bool {
        self.codec_id == CODEC_OPUS
    }

    pub fn is_audio(&self) -> bool {
        self.track_type == track_type::AUDIO
    }

    /// Human-readable track type.
    pub fn type_name(&self) -> &'static str {
        match self.track_type {
            track_type::VIDEO => "video",
            track_type::AUDIO => "audio",
            track_type::SUBTITLE => "subtitle",
            _ => "other",
        }
    }
}

/// One Cluster with its blocks parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster<'a> {
    pub offset: usize,
    /// Absolute timecode in TimecodeScale units.
    pub timecode: u64,
    /// SimpleBlocks and BlockGroup Blocks in document order.
    pub blocks: Vec<Block<'a>>,
}

impl<'a> Cluster<'a> {
    fn from_element(e: &Element<'a>) -> Result<Self> {
        let timecode = match e.child(ids::TIMECODE) {
            Some(t) => {
                let timecode = t.as_uint()?;
                if i64::try_from(timecode).is_err() {
                    return Err(t.malformed("Cluster Timecode out of range"));
                }
                timecode
            }
            None => {
                warn!(offset = e.offset, "Cluster without Timecode, assuming 0");
                0
            }
        };

        let mut blocks = Vec::new();
        for child in e.children() {
            let block = match child.id {
                ids::SIMPLE_BLOCK => child,
                ids::BLOCK_GROUP => match child.child(ids::BLOCK) {
                    Some(block) => block,
                    None => {
                        warn!(offset = child.offset, "BlockGroup without Block");
                        continue;
                    }
                },
                _ => continue,
            };
            blocks.push(Block::parse(block.bytes()?, block.data_offset)?);
        }

        Ok(Self {
            offset: e.offset,
            timecode,
            blocks,
        })
    }

    /// Frames of `track`, unlaced, in document order.
    ///
    /// Timecodes saturate at the `i64` range.
    pub fn frames(&self, track: u64) -> impl Iterator<Item = Frame<'a>> + '_ {
        let base = i64::try_from(self.timecode).unwrap_or(i64::MAX);
        self.blocks
            .iter()
            .filter(move |b| b.track == track)
            .flat_map(move |b| {
                let timecode = base.saturating_add(i64::from(b.timecode));
                b.frames.iter().map(move |&payload| Frame {
                    track,
                    timecode,
                    payload,
                })
            })
    }
}

/// One Opus packet extracted from a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub track: u64,
    /// Absolute timecode in TimecodeScale units; laced frames share their
    /// block's timecode.
    pub timecode: i64,
    pub payload: &'a [u8],
}
