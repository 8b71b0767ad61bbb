//! webm2ogg - extract the Opus track of a WebM/Matroska file into Ogg/Opus.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ExtractCommand, InspectCommand, TracksCommand};

/// webm2ogg - Opus extraction without transcoding.
///
/// Packets are copied byte for byte from the Matroska blocks into Ogg
/// pages; nothing is decoded or re-encoded.
#[derive(Parser)]
#[command(name = "webm2ogg")]
#[command(about = "Extract Opus audio from WebM/Matroska into Ogg/Opus")]
#[command(version)]
pub struct Cli {
    /// Remux options file (YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remux the Opus track into an Ogg file
    Extract(ExtractCommand),
    /// List the tracks of a WebM/Matroska file
    Tracks(TracksCommand),
    /// Walk and verify the pages of an Ogg file
    Inspect(InspectCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Extract(cmd) => cmd.run(&cli),
        Commands::Tracks(cmd) => cmd.run(&cli),
        Commands::Inspect(cmd) => cmd.run(&cli),
    }
}
