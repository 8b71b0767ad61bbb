//! Opus packet inspection and Ogg/Opus header packets.

mod head;
mod packet;
mod tags;
mod toc;

pub use head::{OPUS_HEAD_MAGIC, OpusHead};
pub use packet::{MAX_PACKET_SAMPLES_48K, Packet};
pub use tags::{OPUS_TAGS_MAGIC, OpusTags};
pub use toc::{Configuration, FrameCode, FrameDuration, TOC};
