//! Remux options: config file plus command-line overrides.

use clap::Args;
use webmopus_audio::RemuxOptions;

use super::load_request;

/// 48 kHz samples per millisecond.
const SAMPLES_PER_MS: u64 = 48;

/// Flags that override the options file.
#[derive(Args, Debug, Clone, Default)]
pub struct RemuxFlags {
    /// Track number to extract (default: first Opus track)
    #[arg(short = 't', long)]
    pub track: Option<u64>,

    /// Soft limit on the payload bytes of one page
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_page_bytes: Option<u64>,

    /// Soft limit on the audio in one page, in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_page_ms: Option<u64>,

    /// Ogg stream serial number (default: random)
    #[arg(long)]
    pub serial: Option<u32>,

    /// OpusTags vendor string
    #[arg(long)]
    pub vendor: Option<String>,

    /// OpusTags comment as KEY=value (repeatable)
    #[arg(long = "comment", value_name = "KEY=VALUE")]
    pub comments: Vec<String>,
}

/// Loads the options file (if any) and applies `flags` on top.
pub fn load_options(path: Option<&str>, flags: &RemuxFlags) -> anyhow::Result<RemuxOptions> {
    let mut options: RemuxOptions = match path {
        Some(path) => load_request(path)
            .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path, e))?,
        None => RemuxOptions::default(),
    };

    if let Some(track) = flags.track {
        options.track = Some(track);
    }
    if let Some(bytes) = flags.max_page_bytes {
        options.max_page_bytes = usize::try_from(bytes)?;
    }
    if let Some(ms) = flags.max_page_ms {
        options.max_page_samples = ms.saturating_mul(SAMPLES_PER_MS);
    }
    if let Some(serial) = flags.serial {
        options.serial = Some(serial);
    }
    if let Some(vendor) = &flags.vendor {
        options.vendor = vendor.clone();
    }
    for comment in &flags.comments {
        if !comment.contains('=') {
            anyhow::bail!("comment {:?} is not KEY=value", comment);
        }
        options.comments.push(comment.clone());
    }

    Ok(options)
}
