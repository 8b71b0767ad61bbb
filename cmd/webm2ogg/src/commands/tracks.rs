//! Tracks command: list the tracks of a WebM/Matroska file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use webmopus_audio::codec::mkv::{Document, TrackEntry};

use super::output_result;
use crate::Cli;

/// List the tracks of a WebM/Matroska file.
#[derive(Args)]
pub struct TracksCommand {
    /// Input WebM/Matroska file
    pub input: PathBuf,
}

#[derive(Debug, Serialize)]
struct TracksReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    doc_type: Option<String>,
    timecode_scale: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<f64>,
    tracks: Vec<TrackRow>,
}

#[derive(Debug, Serialize)]
struct TrackRow {
    number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<u64>,
    #[serde(rename = "type")]
    kind: &'static str,
    codec: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sampling_frequency: Option<f64>,
    codec_delay_ns: u64,
    seek_pre_roll_ns: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

impl From<&TrackEntry<'_>> for TrackRow {
    fn from(track: &TrackEntry<'_>) -> Self {
        Self {
            number: track.number,
            uid: track.uid,
            kind: track.type_name(),
            codec: track.codec_id.to_string(),
            channels: track.audio.map(|a| a.channels),
            sampling_frequency: track.audio.map(|a| a.sampling_frequency),
            codec_delay_ns: track.codec_delay,
            seek_pre_roll_ns: track.seek_pre_roll,
            name: track.name.map(str::to_string),
            language: track.language.map(str::to_string),
        }
    }
}

impl TracksCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let data = std::fs::read(&self.input)
            .with_context(|| format!("failed to read {}", self.input.display()))?;
        let report = build_report(&data)
            .with_context(|| format!("failed to parse {}", self.input.display()))?;

        if cli.json {
            return output_result(&report, true);
        }

        println!(
            "{:<6} {:<9} {:<16} {:>8} {:>10}  NAME",
            "TRACK", "TYPE", "CODEC", "CHANNELS", "RATE"
        );
        for t in &report.tracks {
            println!(
                "{:<6} {:<9} {:<16} {:>8} {:>10}  {}",
                t.number,
                t.kind,
                t.codec,
                t.channels.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
                t.sampling_frequency
                    .map(|r| format!("{r}"))
                    .unwrap_or_else(|| "-".into()),
                t.name.as_deref().unwrap_or(""),
            );
        }
        if let Some(seconds) = report.duration_seconds {
            println!("\nduration: {seconds:.3} s");
        }
        Ok(())
    }
}

fn build_report(data: &[u8]) -> anyhow::Result<TracksReport> {
    let doc = Document::parse(data)?;
    let timecode_scale = doc.timecode_scale()?;
    let duration_seconds = doc
        .duration()?
        .map(|d| d * timecode_scale as f64 / 1_000_000_000.0);
    let tracks = doc.tracks()?.iter().map(TrackRow::from).collect();

    Ok(TracksReport {
        doc_type: doc.doc_type().map(str::to_string),
        timecode_scale,
        duration_seconds,
        tracks,
    })
}
