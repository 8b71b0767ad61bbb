//! Ogg container support for Opus streams.

pub mod crc;
mod muxer;
mod page;
mod sync;

pub use muxer::{DEFAULT_MAX_PAGE_BYTES, DEFAULT_MAX_PAGE_SAMPLES, MuxStats, OpusMuxer, PageLimits};
pub use page::{GRANULE_UNSET, MAX_SEGMENTS, OGG_MAGIC, PAGE_HEADER_SIZE, Page, flags};
pub use sync::OggSync;
