//! Kernel smoothing of discrete timepoints.
//!
//! Builds a continuous curve from sparse events (likes, seeks):
//!
//! ```text
//! estimate(x, h) = 1/(n·h) · Σ kernel((x - pointᵢ) / h) · weightᵢ
//! ```
//!
//! Point counts are viewer-interaction volumes, so every evaluation
//! walks all points; nothing is cached.

use likelines_common::error::{LikelinesError, LikelinesResult};

use crate::kernel::Kernel;
use crate::resample::linspace;

/// Kernel density estimator over a fixed set of timepoints.
#[derive(Debug, Clone)]
pub struct KernelSmoother {
    points: Vec<f64>,
    weights: Option<Vec<f64>>,
    kernel: Kernel,
}

impl KernelSmoother {
    /// Unweighted estimator.
    pub fn new(points: &[f64], kernel: Kernel) -> Self {
        Self {
            points: points.to_vec(),
            weights: None,
            kernel,
        }
    }

    /// Estimator where each point carries its own weight.
    pub fn weighted(points: &[f64], weights: &[f64], kernel: Kernel) -> LikelinesResult<Self> {
        if points.len() != weights.len() {
            return Err(LikelinesError::processing(format!(
                "smoother got {} points but {} weights",
                points.len(),
                weights.len()
            )));
        }
        Ok(Self {
            points: points.to_vec(),
            weights: Some(weights.to_vec()),
            kernel,
        })
    }

    /// Evaluate the estimate at `x` with bandwidth `h`.
    ///
    /// Returns zero when there are no points. A bandwidth that is not a
    /// positive finite number falls back to 1.
    pub fn estimate(&self, x: f64, bandwidth: f64) -> f64 {
        let n = self.points.len();
        if n == 0 {
            return 0.0;
        }
        let h = effective_bandwidth(bandwidth);

        let sum: f64 = match &self.weights {
            None => self
                .points
                .iter()
                .map(|p| self.kernel.weight((x - p) / h))
                .sum(),
            Some(weights) => self
                .points
                .iter()
                .zip(weights)
                .map(|(p, w)| self.kernel.weight((x - p) / h) * w)
                .sum(),
        };
        sum / (n as f64 * h)
    }

    /// Sample the estimate at `count` points evenly spaced from `start`
    /// to `end` inclusive; the last sample is taken exactly at `end`.
    pub fn sample(&self, start: f64, end: f64, count: usize, bandwidth: f64) -> Vec<f64> {
        linspace(start, end, count)
            .into_iter()
            .map(|x| self.estimate(x, bandwidth))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Build a closure `(x, h) -> estimate` over `points`.
///
/// With no points the closure is constantly zero.
pub fn build_estimator(
    points: &[f64],
    weights: Option<&[f64]>,
    kernel: Kernel,
) -> LikelinesResult<impl Fn(f64, f64) -> f64> {
    let smoother = match weights {
        Some(w) => KernelSmoother::weighted(points, w, kernel)?,
        None => KernelSmoother::new(points, kernel),
    };
    Ok(move |x: f64, h: f64| smoother.estimate(x, h))
}

fn effective_bandwidth(h: f64) -> f64 {
    if h.is_finite() && h > 0.0 {
        h
    } else {
        1.0
    }
}
