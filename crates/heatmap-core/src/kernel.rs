//! Smoothing kernels.
//!
//! A kernel maps a scaled distance `x = (t - point) / h` to a
//! non-negative weight.

use likelines_common::config::KernelName;

/// Plain kernel function pointer, for caller-supplied kernels.
pub type KernelFn = fn(f64) -> f64;

/// Standard normal density: `exp(-x²/2) / sqrt(2π)`.
pub fn gaussian(x: f64) -> f64 {
    (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Tricube kernel: `(70/81)·(1-|x|³)³` on `|x| <= 1`, zero outside.
pub fn tricube(x: f64) -> f64 {
    if x.abs() > 1.0 {
        return 0.0;
    }
    let sub = 1.0 - (x * x * x).abs();
    70.0 / 81.0 * sub * sub * sub
}

/// Available smoothing kernels.
#[derive(Debug, Clone, Copy, Default)]
pub enum Kernel {
    /// Infinite support, smooth falloff.
    #[default]
    Gaussian,

    /// Compact support on `[-1, 1]`.
    Tricube,

    /// Caller-supplied kernel. Must return a non-negative weight.
    Custom(KernelFn),
}

impl Kernel {
    /// Weight for the scaled distance `x`.
    pub fn weight(&self, x: f64) -> f64 {
        match self {
            Kernel::Gaussian => gaussian(x),
            Kernel::Tricube => tricube(x),
            Kernel::Custom(f) => f(x),
        }
    }

    /// Name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Gaussian => "gaussian",
            Kernel::Tricube => "tricube",
            Kernel::Custom(_) => "custom",
        }
    }
}

impl From<KernelName> for Kernel {
    fn from(name: KernelName) -> Self {
        match name {
            KernelName::Gaussian => Kernel::Gaussian,
            KernelName::Tricube => Kernel::Tricube,
        }
    }
}
