//! Container and codec formats.

pub mod mkv;
pub mod ogg;
pub mod opus;
