//! Matroska/WebM demuxing.
//!
//! The tree decoder is driven by a static element registry: containers are
//! descended into, leaves are kept as borrowed slices, and elements the
//! registry does not know are skipped by size.

mod block;
mod document;
mod element;
pub mod schema;

pub use block::{Block, Lacing};
pub use document::{
    AudioSettings, CODEC_OPUS, Cluster, DEFAULT_TIMECODE_SCALE, Document, Frame, TrackEntry,
    track_type,
};
pub use element::{Element, ElementData, MAX_ID_LENGTH, MAX_SIZE_LENGTH, parse_document};
pub use schema::{ElementDescriptor, Kind, Model, ids};
