//! Video Snapper CLI: load a local video and save the frame on screen.
//!
//! Usage:
//!   snapper snap <VIDEO>          Save one frame and exit
//!   snapper interactive <VIDEO>   Play, scrub and capture from the terminal
//!   snapper probe <VIDEO>         Show the video's size and duration
//!   snapper formats               List the supported output formats

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use snapper_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "snapper",
    about = "Save the frame on screen of a local video as PNG, JPEG or WebP",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a single frame and exit
    Snap {
        /// Video file to load
        video: PathBuf,

        /// Seek to this position (seconds) before capturing
        #[arg(long, value_parser = commands::parse_seconds, allow_hyphen_values = true)]
        at: Option<f64>,

        /// Output format: png, jpeg, webp or a mime type
        #[arg(short, long)]
        format: Option<String>,

        /// Directory to save the snapshot into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Drive a capture session from the keyboard
    Interactive {
        /// Video file to load
        video: PathBuf,

        /// Initially selected format
        #[arg(short, long)]
        format: Option<String>,

        /// Directory to save snapshots into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show intrinsic size and duration of a video
    Probe {
        /// Video file to inspect
        video: PathBuf,

        /// Print the metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported output formats
    Formats,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    snapper_common::logging::init_logging(&config.logging)?;

    match cli.command {
        Commands::Snap {
            video,
            at,
            format,
            output,
        } => commands::snap::run(&config, video, at, format, output).await,
        Commands::Interactive {
            video,
            format,
            output,
        } => commands::interactive::run(&config, video, format, output).await,
        Commands::Probe { video, json } => commands::probe::run(&config, video, json),
        Commands::Formats => commands::formats::run(),
    }
}
