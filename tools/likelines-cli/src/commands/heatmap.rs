//! Compose a heatmap from a saved aggregate.

use std::path::PathBuf;

use likelines_common::config::{KernelName, PlayerConfig};
use likelines_heatmap_core::palette::to_hex;
use likelines_heatmap_core::signals::{signals_from_aggregate, SignalOptions};
use likelines_heatmap_core::{HeatmapComposer, Kernel, Palette};
use likelines_interaction_model::aggregate::AggregateResult;

pub struct HeatmapArgs {
    pub aggregate: PathBuf,
    pub duration: f64,
    pub width: Option<usize>,
    pub kernel: Option<String>,
    pub bandwidth: Option<f64>,
    pub limit: Option<usize>,
    pub include_likes: bool,
    pub json: bool,
}

fn parse_kernel(name: &str) -> anyhow::Result<KernelName> {
    match name.to_ascii_lowercase().as_str() {
        "gaussian" => Ok(KernelName::Gaussian),
        "tricube" => Ok(KernelName::Tricube),
        other => anyhow::bail!("Unknown kernel '{other}' (expected gaussian or tricube)"),
    }
}

pub fn run(config: &PlayerConfig, args: HeatmapArgs) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(kernel) = args.kernel.as_deref() {
        config.kernel = parse_kernel(kernel)?;
    }
    if let Some(bandwidth) = args.bandwidth {
        config.smoothing_bandwidth = bandwidth;
    }
    if let Some(width) = args.width {
        config.heatmap_width = width;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid heatmap options: {e}"))?;

    let content = std::fs::read_to_string(&args.aggregate)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", args.aggregate.display()))?;
    let aggregate: AggregateResult = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse aggregate: {e}"))?;

    let options = SignalOptions {
        session_limit: args.limit,
        include_likes: args.include_likes,
    };
    let signals = signals_from_aggregate(&aggregate, args.duration, options);
    let composer = HeatmapComposer::from_config(&config);
    let heatmap = composer.compose(args.duration, config.heatmap_width, &signals);

    tracing::debug!(
        kernel = Kernel::from(config.kernel).name(),
        bandwidth = config.smoothing_bandwidth,
        sessions = aggregate.num_sessions,
        "Heatmap composed"
    );

    if args.json {
        println!("{}", serde_json::to_string(&heatmap)?);
        return Ok(());
    }

    let palette = Palette::from_name(config.palette);
    for (bin, value) in heatmap.values().iter().enumerate() {
        println!(
            "{bin:4} {:9.2} {value:.4} {}",
            heatmap.bin_start(bin, args.duration),
            to_hex(palette.color_at(*value))
        );
    }
    Ok(())
}
