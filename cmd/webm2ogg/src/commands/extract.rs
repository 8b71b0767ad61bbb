//! Extract command: remux the Opus track into an Ogg file.

use std::ffi::OsString;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tempfile::NamedTempFile;
use tracing::warn;
use webmopus_audio::{Error, remux};

use super::{
    RemuxFlags, format_bytes, format_duration, load_options, output_result, print_success,
};
use crate::Cli;

/// Remux the Opus track of a WebM/Matroska file into Ogg/Opus.
#[derive(Args)]
pub struct ExtractCommand {
    /// Input WebM/Matroska file
    pub input: PathBuf,

    /// Output file (default: input with .ogg extension)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Keep the pages written before a failure as <output>.partial
    #[arg(long)]
    pub keep_partial: bool,

    #[command(flatten)]
    pub flags: RemuxFlags,
}

impl ExtractCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let options = load_options(cli.config.as_deref(), &self.flags)?;
        let output = self.output_path()?;

        let input = std::fs::read(&self.input)
            .with_context(|| format!("failed to read {}", self.input.display()))?;

        let mut tmp = NamedTempFile::new_in(parent_dir(&output))
            .with_context(|| format!("failed to create temporary file for {}", output.display()))?;

        let mut writer = BufWriter::new(tmp.as_file_mut());
        let result = remux(&input, &mut writer, &options);
        let flushed = writer.flush();
        drop(writer);

        let summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                if let Error::Aborted { pages_written, .. } = &e
                    && self.keep_partial
                {
                    let partial = partial_path(&output);
                    match keep_partial(tmp, flushed, &partial) {
                        Ok(()) => warn!(
                            path = %partial.display(),
                            pages = pages_written,
                            "aborted early, partial output kept"
                        ),
                        Err(err) => warn!(error = %format!("{err:#}"), "partial output discarded"),
                    }
                }
                return Err(e)
                    .with_context(|| format!("failed to extract {}", self.input.display()));
            }
        };

        flushed.with_context(|| format!("failed to write {}", output.display()))?;
        tmp.persist(&output)
            .with_context(|| format!("failed to write {}", output.display()))?;

        print_success(&format!(
            "{}: track {}, {} packets in {} pages, {}, {}",
            output.display(),
            summary.track,
            summary.packets,
            summary.pages,
            format_duration(
                summary.granule_position.saturating_sub(u64::from(summary.pre_skip))
            ),
            format_bytes(summary.bytes),
        ));
        output_result(&summary, cli.json)
    }

    fn output_path(&self) -> anyhow::Result<PathBuf> {
        let output = match &self.output {
            Some(path) => path.clone(),
            None => self.input.with_extension("ogg"),
        };
        if output == self.input {
            anyhow::bail!(
                "output {} would overwrite the input, use -o to pick another path",
                output.display()
            );
        }
        Ok(output)
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Moves the pages written before an abort to `partial`, provided they
/// were flushed to the temporary file.
fn keep_partial(tmp: NamedTempFile, flushed: io::Result<()>, partial: &Path) -> anyhow::Result<()> {
    flushed.with_context(|| format!("failed to write {}", partial.display()))?;
    tmp.persist(partial)
        .with_context(|| format!("failed to keep {}", partial.display()))?;
    Ok(())
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}
