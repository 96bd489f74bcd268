//! Application and player configuration.
//!
//! Every field of [`PlayerConfig`] has a named default. Caller-supplied
//! JSON only needs to mention the fields it overrides; everything else
//! falls back to the default for that field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LikelinesError, LikelinesResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Player and heatmap settings.
    pub player: PlayerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Configuration consumed by the telemetry buffer and heatmap composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Where interactions are stored. `None` runs the player as a
    /// local-only heatmap renderer: nothing is sent or aggregated.
    pub backend: Option<BackendTarget>,

    /// Kernel smoothing bandwidth `h` (seconds).
    pub smoothing_bandwidth: f64,

    /// Smoothing kernel for discrete timepoint signals.
    pub kernel: KernelName,

    /// Palette used to colour heatmap bins.
    pub palette: PaletteName,

    /// Per-signal weight factors.
    pub heatmap_weights: HeatmapWeights,

    /// Minimum seconds between two non-forced flushes.
    pub backend_throttle_secs: f64,

    /// When set, nothing is ever sent to the backend (aggregates still load).
    pub backend_read_only: bool,

    /// Number of heatmap bins.
    pub heatmap_width: usize,
}

/// Where the interaction backend lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendTarget {
    /// In-process store; lost when the process exits.
    Memory,
    /// One JSONL file per session under `path`.
    Directory { path: PathBuf },
}

/// Built-in smoothing kernels selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelName {
    #[default]
    Gaussian,
    Tricube,
}

/// Built-in palettes selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteName {
    #[default]
    Heat,
}

/// Weight factor applied to each normalized signal before summing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapWeights {
    /// Explicit likes.
    pub likes: f64,
    /// Implicit playback coverage.
    pub playback: f64,
    /// Detected seek targets.
    pub seeks: f64,
    /// Multimedia content analysis.
    pub mca: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "likelines_telemetry=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            backend: None,
            smoothing_bandwidth: 1.0,
            kernel: KernelName::Gaussian,
            palette: PaletteName::Heat,
            heatmap_weights: HeatmapWeights::default(),
            backend_throttle_secs: 5.0,
            backend_read_only: false,
            heatmap_width: 425,
        }
    }
}

impl Default for HeatmapWeights {
    fn default() -> Self {
        Self {
            likes: 1.0,
            playback: 1.0,
            seeks: 1.0,
            mca: 1.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl PlayerConfig {
    /// Apply a JSON object of overrides on top of this configuration.
    ///
    /// Fields absent from `overrides` keep their current value. Nested
    /// records such as `heatmap_weights` merge field by field; a tagged
    /// value such as `backend` is replaced whole.
    pub fn merged(&self, overrides: &serde_json::Value) -> LikelinesResult<Self> {
        if !overrides.is_null() && !overrides.is_object() {
            return Err(LikelinesError::config("overrides must be a JSON object"));
        }
        let mut base = serde_json::to_value(self)?;
        merge_json(&mut base, overrides);
        let merged: PlayerConfig = serde_json::from_value(base)?;
        merged.validate()?;
        Ok(merged)
    }

    /// Check value ranges.
    pub fn validate(&self) -> LikelinesResult<()> {
        if !(self.smoothing_bandwidth.is_finite() && self.smoothing_bandwidth > 0.0) {
            return Err(LikelinesError::config(format!(
                "smoothing_bandwidth must be a positive number, got {}",
                self.smoothing_bandwidth
            )));
        }
        if !(self.backend_throttle_secs.is_finite() && self.backend_throttle_secs >= 0.0) {
            return Err(LikelinesError::config(format!(
                "backend_throttle_secs must be >= 0, got {}",
                self.backend_throttle_secs
            )));
        }
        if self.heatmap_width == 0 {
            return Err(LikelinesError::config("heatmap_width must be at least 1"));
        }
        let w = &self.heatmap_weights;
        for (name, value) in [
            ("likes", w.likes),
            ("playback", w.playback),
            ("seeks", w.seeks),
            ("mca", w.mca),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(LikelinesError::config(format!(
                    "heatmap weight '{name}' must be >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> LikelinesResult<Self> {
        if !path.exists() {
            return Err(LikelinesError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.player.validate()?;
        Ok(config)
    }
}

/// Overlay `over` onto `base`, recursing into objects.
///
/// An object carrying a `kind` tag is an enum variant and replaces the
/// base value instead of merging into it.
fn merge_json(base: &mut serde_json::Value, over: &serde_json::Value) {
    match (base, over) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(over_map))
            if !over_map.contains_key("kind") =>
        {
            for (key, value) in over_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, over) => *base = over.clone(),
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("likelines").join("config.json")
}
