//! LikeLines CLI: heatmap synthesis and interaction log tooling.
//!
//! Usage:
//!   likelines heatmap <AGGREGATE> --duration S   Compose a heatmap from an aggregate
//!   likelines compact <INTERACTIONS>             Compact an interaction log
//!   likelines timeline <INTERACTIONS>            Rebuild played intervals, likes, seeks
//!   likelines replay <INTERACTIONS> ...          Replay a log through the player
//!   likelines palette                            Print the palette gradient

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use likelines_common::config::{AppConfig, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "likelines",
    about = "Engagement heatmaps and interaction telemetry for video players",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/likelines/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a heatmap from an aggregate JSON file
    Heatmap {
        /// Path to the aggregate JSON
        aggregate: PathBuf,

        /// Video duration in seconds
        #[arg(long)]
        duration: f64,

        /// Number of bins (defaults to the configured width)
        #[arg(long)]
        width: Option<usize>,

        /// Smoothing kernel: gaussian|tricube
        #[arg(long)]
        kernel: Option<String>,

        /// Smoothing bandwidth in seconds
        #[arg(long)]
        bandwidth: Option<f64>,

        /// Only use the first N playback sessions
        #[arg(long)]
        limit: Option<usize>,

        /// Leave likes out of the heatmap
        #[arg(long)]
        no_likes: bool,

        /// Print the bins as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Compact an interaction log and write it to stdout
    Compact {
        /// Path to the interactions JSONL
        path: PathBuf,
    },

    /// Rebuild what was watched from an interaction log
    Timeline {
        /// Path to the interactions JSONL
        path: PathBuf,
    },

    /// Replay an interaction log through the player into a session store
    Replay {
        /// Path to the interactions JSONL
        path: PathBuf,

        /// Video URL the interactions belong to
        #[arg(long)]
        video: String,

        /// Video duration in seconds
        #[arg(long)]
        duration: f64,

        /// Session store directory
        #[arg(long, default_value = "likelines-store")]
        store: PathBuf,

        /// Viewer the session belongs to (a fresh one if omitted)
        #[arg(long)]
        viewer: Option<String>,
    },

    /// Print the palette gradient
    Palette {
        /// Number of colour steps
        #[arg(long, default_value = "11")]
        width: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    likelines_common::logging::init_logging(&LoggingConfig {
        level,
        json: config.logging.json,
    });

    match cli.command {
        Commands::Heatmap {
            aggregate,
            duration,
            width,
            kernel,
            bandwidth,
            limit,
            no_likes,
            json,
        } => commands::heatmap::run(
            &config.player,
            commands::heatmap::HeatmapArgs {
                aggregate,
                duration,
                width,
                kernel,
                bandwidth,
                limit,
                include_likes: !no_likes,
                json,
            },
        ),
        Commands::Compact { path } => commands::compact::run(path),
        Commands::Timeline { path } => commands::timeline::run(path),
        Commands::Replay {
            path,
            video,
            duration,
            store,
            viewer,
        } => {
            commands::replay::run(
                &config.player,
                commands::replay::ReplayArgs {
                    path,
                    video,
                    duration,
                    store,
                    viewer,
                },
            )
            .await
        }
        Commands::Palette { width } => commands::palette::run(&config.player, width),
    }
}
