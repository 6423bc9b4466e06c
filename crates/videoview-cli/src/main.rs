//! VideoView CLI - Player logic without a platform
//!
//! Features:
//! - Source classification
//! - Default track selection
//! - Scripted playback against the simulated engine

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;
mod scenario;

/// VideoView CLI - Video view toolkit
#[derive(Parser)]
#[command(name = "videoview")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Inspect and simulate embedded video player behavior", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a source string and detect its manifest type
    Classify {
        /// Asset URI, file path, or network URL
        source: String,

        /// Directory asset:// sources resolve under
        #[arg(long)]
        asset_root: Option<PathBuf>,
    },

    /// Pick the default track among a list
    Select {
        /// Track kind (audio, subtitle)
        #[arg(short, long, default_value = "audio")]
        kind: String,

        /// Tracks as id=language[,primary]
        #[arg(short, long, required = true, num_args = 1..)]
        tracks: Vec<String>,

        /// Preferred language tag
        #[arg(short, long, default_value = "")]
        preferred: String,

        /// System language tags, most preferred first (defaults to the environment)
        #[arg(short, long, num_args = 1..)]
        system: Vec<String>,
    },

    /// Run a scenario file against the simulated engine
    Simulate {
        /// Scenario JSON
        scenario: PathBuf,

        /// Player configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for command output
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();
    videoview_core::init();

    match cli.command {
        Commands::Classify { source, asset_root } => {
            commands::classify(&source, asset_root.as_deref(), &cli.format)?;
        }
        Commands::Select { kind, tracks, preferred, system } => {
            commands::select(&kind, &tracks, &preferred, &system, &cli.format)?;
        }
        Commands::Simulate { scenario, config } => {
            commands::simulate(&scenario, config.as_deref(), &cli.format)?;
        }
    }

    Ok(())
}
