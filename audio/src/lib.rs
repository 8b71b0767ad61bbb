//! Opus extraction from Matroska/WebM into Ogg/Opus.
//!
//! This crate provides:
//!
//! - `codec::mkv`: registry-driven EBML tree decoder, Matroska document view
//!   and block lacing
//! - `codec::ogg`: Ogg page model, CRC, page muxer and page reader
//! - `codec::opus`: TOC parsing and the OpusHead / OpusTags header packets
//! - `remux`: the WebM-to-Ogg pipeline tying them together
//!
//! # Example
//!
//! ```rust,no_run
//! use webmopus_audio::remux::{RemuxOptions, remux};
//!
//! let input = std::fs::read("talk.webm")?;
//! let mut output = Vec::new();
//! let summary = remux(&input, &mut output, &RemuxOptions::default())?;
//! println!("{} packets in {} pages", summary.packets, summary.pages);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
pub mod error;
pub mod remux;

pub use error::{Error, Result};
pub use remux::{RemuxOptions, RemuxSummary, TrackSelector, remux};
