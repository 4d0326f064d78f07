//! Binocular rivalry with red/green anaglyph gratings.
//!
//! Shows an intro screen, then `n_runs` stimulus runs separated by pauses.
//! Key presses during a run are logged and the session is written to
//! `<output_dir>/<subject>_<session>_<timestamp>_outputDict.json`.

use anyhow::Context;
use clap::Parser;
use rivalry_experiment::{ExperimentConfig, Participant};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod keys;

pub use app::App;

/// Config file picked up from the working directory when none is given
const DEFAULT_CONFIG: &str = "rivalry.toml";

#[derive(Parser)]
#[command(name = "rivalry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subject number
    #[arg(short = 's', long)]
    subject: u32,

    /// Session number
    #[arg(short = 'n', long, default_value = "1")]
    session: u32,

    /// Experiment configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run in a window instead of fullscreen
    #[arg(long)]
    windowed: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<ExperimentConfig> {
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => ExperimentConfig::from_file(DEFAULT_CONFIG)?,
        None => {
            info!("no config file, using defaults");
            ExperimentConfig::default()
        }
    };
    if cli.windowed {
        config.screen.fullscreen = false;
    }
    config.validate().context("invalid experiment configuration")?;
    Ok(config)
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

    let config = load_config(&cli)?;
    let participant = Participant {
        subject: cli.subject,
        session: cli.session,
    };

    let app = App::new(config, participant);
    match app.run()? {
        Some(path) => info!(path = %path.display(), "session saved"),
        None => info!("session ended before it started"),
    }

    Ok(())
}
