//! LikeLines Common Utilities
//!
//! Shared infrastructure for all LikeLines crates:
//! - Error types and result aliases
//! - Wall clock and throttling utilities for telemetry flushing
//! - Tracing/logging initialization
//! - Player configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
