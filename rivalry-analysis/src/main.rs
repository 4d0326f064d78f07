//! Turns saved rivalry sessions into a behaviour table.
//!
//! - `rivalry-analysis normalize <dir>` rewrites event files with `\n` line endings
//! - `rivalry-analysis extract <dir>` writes `<dir>/behavior.tsv`

use clap::{Parser, Subcommand};
use rivalry_analysis::{extract_dir, normalize_dir};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rivalry-analysis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite event files with Unix line endings
    Normalize {
        /// Directory holding the session event files
        #[arg(default_value = "data")]
        data_dir: PathBuf,
    },

    /// Extract key presses from every event file into one table
    Extract {
        /// Directory holding the session event files
        #[arg(default_value = "data")]
        data_dir: PathBuf,

        /// Output table (defaults to <DATA_DIR>/behavior.tsv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Normalize line endings first
        #[arg(long)]
        normalize: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Normalize { data_dir } => {
            let changed = normalize_dir(&data_dir)?;
            info!(dir = %data_dir.display(), changed = changed.len(), "normalization done");
        }
        Commands::Extract {
            data_dir,
            output,
            normalize,
        } => {
            if normalize {
                normalize_dir(&data_dir)?;
            }
            let (table, rows) = extract_dir(&data_dir, output.as_deref())?;
            info!(path = %table.display(), rows, "extraction done");
        }
    }

    Ok(())
}
