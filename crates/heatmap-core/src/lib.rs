//! LikeLines Heatmap Core
//!
//! Converts heterogeneous engagement signals into a single render-ready
//! heatmap curve:
//! - **Kernels:** Gaussian and tricube smoothing weights
//! - **Smoother:** Kernel density estimate over discrete timepoints
//! - **Resampler:** Piecewise-linear fit of dense arrays to a fixed width
//! - **Composer:** Per-signal normalization, weighting, clamping, rescaling
//! - **Palette:** Heat value to RGB via interpolated colour stops
//!
//! This crate is pure computation: no I/O, no backend access.
//! All inputs are data; all outputs are data.

pub mod composer;
pub mod kernel;
pub mod markers;
pub mod palette;
pub mod resample;
pub mod signals;
pub mod smoother;

pub use composer::{Heatmap, HeatmapComposer, Signal, SignalSet};
pub use kernel::Kernel;
pub use markers::MarkerSet;
pub use palette::{Palette, Rgb};
pub use smoother::KernelSmoother;
