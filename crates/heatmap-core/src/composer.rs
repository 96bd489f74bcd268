//! Heatmap composition.
//!
//! # Algorithm
//!
//! 1. **Rasterize** every present signal to `width` values: discrete
//!    timepoints (likes, seeks) through a kernel smoother sampled from
//!    `0` to `duration - 1`, dense arrays (playback, mca) through the
//!    resampler.
//! 2. **Normalize** each signal into `[-1, 1]` by its largest magnitude.
//! 3. **Weight** and sum the signals per bin.
//! 4. **Clamp** negative bins to zero.
//! 5. **Rescale** so the hottest bin is exactly 1.
//!
//! Absent signals are skipped at every step; they never dilute the sum.

use serde::{Deserialize, Serialize};

use likelines_common::config::{HeatmapWeights, PlayerConfig};

use crate::kernel::Kernel;
use crate::resample::resample;
use crate::smoother::KernelSmoother;

/// The four engagement signals a heatmap can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Likes,
    Playback,
    Seeks,
    Mca,
}

impl Signal {
    pub const ALL: [Signal; 4] = [Signal::Likes, Signal::Playback, Signal::Seeks, Signal::Mca];

    pub fn name(&self) -> &'static str {
        match self {
            Signal::Likes => "likes",
            Signal::Playback => "playback",
            Signal::Seeks => "seeks",
            Signal::Mca => "mca",
        }
    }

    /// Discrete signals are timepoint lists; the rest are dense arrays.
    pub fn is_discrete(&self) -> bool {
        matches!(self, Signal::Likes | Signal::Seeks)
    }

    /// This signal's factor in `weights`.
    pub fn weight_in(&self, weights: &HeatmapWeights) -> f64 {
        match self {
            Signal::Likes => weights.likes,
            Signal::Playback => weights.playback,
            Signal::Seeks => weights.seeks,
            Signal::Mca => weights.mca,
        }
    }
}

/// Raw inputs for one composition. `None` means the signal is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSet {
    /// Like timepoints (seconds).
    pub likes: Option<Vec<f64>>,
    /// Per-second playback counts.
    pub playback: Option<Vec<f64>>,
    /// Seek timepoints (seconds).
    pub seeks: Option<Vec<f64>>,
    /// Content-analysis weights spread over the duration.
    pub mca: Option<Vec<f64>>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_likes(mut self, likes: Vec<f64>) -> Self {
        self.likes = Some(likes);
        self
    }

    pub fn with_playback(mut self, playback: Vec<f64>) -> Self {
        self.playback = Some(playback);
        self
    }

    pub fn with_seeks(mut self, seeks: Vec<f64>) -> Self {
        self.seeks = Some(seeks);
        self
    }

    pub fn with_mca(mut self, mca: Vec<f64>) -> Self {
        self.mca = Some(mca);
        self
    }

    pub fn get(&self, signal: Signal) -> Option<&[f64]> {
        match signal {
            Signal::Likes => self.likes.as_deref(),
            Signal::Playback => self.playback.as_deref(),
            Signal::Seeks => self.seeks.as_deref(),
            Signal::Mca => self.mca.as_deref(),
        }
    }

    /// Signals that are present, in canonical order.
    pub fn present(&self) -> impl Iterator<Item = (Signal, &[f64])> + '_ {
        Signal::ALL
            .into_iter()
            .filter_map(move |s| self.get(s).map(|data| (s, data)))
    }
}

/// A composed heatmap: `width` values in `[0, 1]`.
///
/// Bin `i` covers `[i/width, (i+1)/width) · duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Heatmap {
    values: Vec<f64>,
}

impl Heatmap {
    /// An all-zero heatmap.
    pub fn zeros(width: usize) -> Self {
        Self {
            values: vec![0.0; width],
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, bin: usize) -> Option<f64> {
        self.values.get(bin).copied()
    }

    /// Whether every bin is zero.
    pub fn is_flat(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// Bin containing video time `t` (clamped to the heatmap).
    pub fn bin_at(&self, t: f64, duration: f64) -> Option<usize> {
        if self.values.is_empty() || !(duration > 0.0) {
            return None;
        }
        let w = self.values.len();
        let bin = (t / duration * w as f64).floor();
        Some((bin.max(0.0) as usize).min(w - 1))
    }

    /// Heat value at video time `t`.
    pub fn value_at(&self, t: f64, duration: f64) -> Option<f64> {
        self.bin_at(t, duration).map(|b| self.values[b])
    }

    /// Start time (seconds) of `bin`.
    pub fn bin_start(&self, bin: usize, duration: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        bin as f64 * duration / self.values.len() as f64
    }

    /// Index of the hottest bin (first one on ties).
    pub fn peak_bin(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, v) in self.values.iter().copied().enumerate() {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.filter(|(_, v)| *v > 0.0).map(|(i, _)| i)
    }
}

/// Combines engagement signals into a heatmap.
#[derive(Debug, Clone)]
pub struct HeatmapComposer {
    kernel: Kernel,
    bandwidth: f64,
    weights: HeatmapWeights,
}

impl Default for HeatmapComposer {
    fn default() -> Self {
        Self::from_config(&PlayerConfig::default())
    }
}

impl HeatmapComposer {
    pub fn new(kernel: Kernel, bandwidth: f64, weights: HeatmapWeights) -> Self {
        Self {
            kernel,
            bandwidth,
            weights,
        }
    }

    /// Composer using the configured kernel, bandwidth, and weights.
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(
            Kernel::from(config.kernel),
            config.smoothing_bandwidth,
            config.heatmap_weights,
        )
    }

    /// Replace the kernel (e.g. with a custom function).
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn weights(&self) -> &HeatmapWeights {
        &self.weights
    }

    /// Compose `signals` for a video of `duration` seconds into `width` bins.
    ///
    /// A non-positive duration or an all-absent signal set yields the
    /// zero heatmap.
    pub fn compose(&self, duration: f64, width: usize, signals: &SignalSet) -> Heatmap {
        let mut heatmap = Heatmap::zeros(width);
        if width == 0 || !(duration > 0.0) {
            return heatmap;
        }

        for (signal, data) in signals.present() {
            let mut raster = self.rasterize(signal, data, duration, width);
            normalize_symmetric(&mut raster);
            let weight = signal.weight_in(&self.weights);
            for (bin, value) in heatmap.values.iter_mut().zip(&raster) {
                *bin += value * weight;
            }
            tracing::trace!(signal = signal.name(), weight, "Signal composed");
        }

        let mut peak = 0.0_f64;
        for value in heatmap.values.iter_mut() {
            *value = value.max(0.0);
            peak = peak.max(*value);
        }
        if peak > 0.0 && peak.is_finite() {
            for value in heatmap.values.iter_mut() {
                *value /= peak;
            }
        } else if !peak.is_finite() {
            tracing::warn!("Non-finite heatmap peak, returning flat heatmap");
            return Heatmap::zeros(width);
        }

        heatmap
    }

    /// Produce `width` raw values for one signal.
    fn rasterize(&self, signal: Signal, data: &[f64], duration: f64, width: usize) -> Vec<f64> {
        if signal.is_discrete() {
            KernelSmoother::new(data, self.kernel).sample(
                0.0,
                duration - 1.0,
                width,
                self.bandwidth,
            )
        } else {
            resample(data, width)
        }
    }
}

/// Scale `values` into `[-1, 1]` by the largest of `|min|` and `|max|`.
///
/// All-zero input is left unchanged.
pub fn normalize_symmetric(values: &mut [f64]) {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let scale = min.abs().max(max.abs());
    if scale != 0.0 && scale.is_finite() {
        for v in values.iter_mut() {
            *v /= scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn weights(likes: f64, playback: f64, seeks: f64, mca: f64) -> HeatmapWeights {
        HeatmapWeights {
            likes,
            playback,
            seeks,
            mca,
        }
    }

    #[test]
    fn test_no_signals_is_zero_vector() {
        let composer = HeatmapComposer::default();
        let heatmap = composer.compose(60.0, 10, &SignalSet::new());
        assert_eq!(heatmap.len(), 10);
        assert!(heatmap.is_flat());
        assert_eq!(heatmap.peak_bin(), None);
    }

    #[test]
    fn test_empty_signals_are_zero_vector() {
        let composer = HeatmapComposer::default();
        let signals = SignalSet::new()
            .with_likes(vec![])
            .with_playback(vec![])
            .with_seeks(vec![])
            .with_mca(vec![]);
        assert!(composer.compose(60.0, 16, &signals).is_flat());
    }

    #[test]
    fn test_zero_duration_is_flat() {
        let composer = HeatmapComposer::default();
        let signals = SignalSet::new().with_likes(vec![0.0, 1.0]);
        let heatmap = composer.compose(0.0, 8, &signals);
        assert_eq!(heatmap.len(), 8);
        assert!(heatmap.is_flat());
    }

    #[test]
    fn test_likes_shape_peaks_near_likes() {
        let composer = HeatmapComposer::new(Kernel::Gaussian, 1.0, weights(1.0, 0.0, 0.0, 0.0));
        let signals = SignalSet::new().with_likes(vec![10.0, 10.0, 30.0]);
        let heatmap = composer.compose(60.0, 60, &signals);
        let v = heatmap.values();

        // samples are spaced 59/59 = 1s apart, so bin i sits at t = i
        assert!((v[10] - 1.0).abs() < 1e-12);
        assert!(v[30] > 0.3 && v[30] < 1.0);
        assert!(v[10] > v[20]);
        assert!(v[30] > v[45]);
        assert!(v[55] < 1e-6);
        assert_eq!(heatmap.peak_bin(), Some(10));
    }

    #[test]
    fn test_likes_small_width_smoke() {
        let composer = HeatmapComposer::new(Kernel::Gaussian, 1.0, weights(1.0, 1.0, 1.0, 1.0));
        let signals = SignalSet::new().with_likes(vec![10.0, 10.0, 30.0]);
        let heatmap = composer.compose(60.0, 4, &signals);
        // bins sampled at t = 0, 19.67, 39.33, 59: all far from the likes
        assert_eq!(heatmap.len(), 4);
        assert!(heatmap.values().iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((heatmap.values().iter().copied().fold(0.0, f64::max) - 1.0).abs() < 1e-12);
        assert!(heatmap.values()[3] < heatmap.values()[1]);
    }

    #[test]
    fn test_playback_only_is_rescaled_input() {
        let composer = HeatmapComposer::new(Kernel::Gaussian, 1.0, weights(0.0, 1.0, 0.0, 0.0));
        let signals = SignalSet::new().with_playback(vec![0.0, 0.0, 5.0, 5.0, 0.0]);
        let heatmap = composer.compose(5.0, 5, &signals);
        assert_eq!(heatmap.values(), &[0.0, 0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_negative_signal_is_clamped() {
        let composer = HeatmapComposer::new(Kernel::Gaussian, 1.0, weights(1.0, 1.0, 1.0, 1.0));
        let signals = SignalSet::new().with_mca(vec![-4.0, -2.0, 0.0, 2.0]);
        let heatmap = composer.compose(4.0, 4, &signals);
        assert_eq!(heatmap.values(), &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_absent_signal_does_not_dilute() {
        let w = weights(1.0, 1.0, 1.0, 1.0);
        let composer = HeatmapComposer::new(Kernel::Gaussian, 1.0, w);
        let playback = vec![1.0, 3.0, 2.0, 0.0, 4.0];

        let alone = composer.compose(5.0, 5, &SignalSet::new().with_playback(playback.clone()));
        let with_empty_seeks = composer.compose(
            5.0,
            5,
            &SignalSet::new().with_playback(playback).with_seeks(vec![]),
        );
        assert_eq!(alone, with_empty_seeks);
    }

    #[test]
    fn test_weights_shift_balance() {
        let signals = SignalSet::new()
            .with_likes(vec![50.0])
            .with_playback(vec![10.0, 0.0, 0.0, 0.0, 0.0]);

        let likes_heavy = HeatmapComposer::new(Kernel::Gaussian, 1.0, weights(3.0, 1.0, 0.0, 0.0))
            .compose(100.0, 5, &signals);
        let playback_heavy =
            HeatmapComposer::new(Kernel::Gaussian, 1.0, weights(1.0, 3.0, 0.0, 0.0))
                .compose(100.0, 5, &signals);

        assert_eq!(likes_heavy.peak_bin(), Some(2));
        assert_eq!(playback_heavy.peak_bin(), Some(0));
    }

    #[test]
    fn test_tricube_zero_far_from_points() {
        let composer = HeatmapComposer::new(Kernel::Tricube, 2.0, weights(1.0, 0.0, 0.0, 0.0));
        let heatmap = composer.compose(21.0, 21, &SignalSet::new().with_likes(vec![10.0]));
        assert_eq!(heatmap.values()[0], 0.0);
        assert_eq!(heatmap.values()[20], 0.0);
        assert!((heatmap.values()[10] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bin_lookup() {
        let heatmap = Heatmap {
            values: vec![0.0, 0.5, 1.0, 0.25],
        };
        assert_eq!(heatmap.bin_at(0.0, 40.0), Some(0));
        assert_eq!(heatmap.bin_at(25.0, 40.0), Some(2));
        assert_eq!(heatmap.bin_at(40.0, 40.0), Some(3));
        assert_eq!(heatmap.value_at(15.0, 40.0), Some(0.5));
        assert_eq!(heatmap.bin_start(2, 40.0), 20.0);
        assert_eq!(heatmap.bin_at(5.0, 0.0), None);
    }

    #[test]
    fn test_normalize_symmetric() {
        let mut v = vec![-4.0, 2.0, 1.0];
        normalize_symmetric(&mut v);
        assert_eq!(v, vec![-1.0, 0.5, 0.25]);

        let mut zeros = vec![0.0; 3];
        normalize_symmetric(&mut zeros);
        assert_eq!(zeros, vec![0.0; 3]);
    }

    fn arb_signal(range: std::ops::Range<f64>) -> impl Strategy<Value = Option<Vec<f64>>> {
        proptest::option::of(proptest::collection::vec(range, 0..40))
    }

    proptest! {
        #[test]
        fn compose_output_is_width_long_and_unit_ranged(
            likes in arb_signal(-10.0..200.0),
            playback in arb_signal(0.0..50.0),
            seeks in arb_signal(0.0..200.0),
            mca in arb_signal(-5.0..5.0),
            duration in 0.0f64..300.0,
            width in 0usize..120,
            w in proptest::collection::vec(0.0f64..3.0, 4)
        ) {
            let composer = HeatmapComposer::new(
                Kernel::Gaussian,
                1.5,
                weights(w[0], w[1], w[2], w[3]),
            );
            let signals = SignalSet { likes, playback, seeks, mca };
            let heatmap = composer.compose(duration, width, &signals);
            prop_assert_eq!(heatmap.len(), width);
            for v in heatmap.values() {
                prop_assert!((0.0..=1.0).contains(v), "value {} out of range", v);
            }
        }
    }
}
