//! LikeLines Interaction Model
//!
//! Defines the data contracts shared by the telemetry runtime, the
//! backends, and the heatmap composer:
//! - **Events:** Timestamped playback/like interactions in wire format
//! - **Timeline:** Played intervals, likes, and seeks reconstructed per session
//! - **Aggregate:** Per-video summary of every recorded session
//! - **Video:** Tagged video sources and their canonical identifiers
//!
//! Timepoints (`current_time`, interval bounds, likes) are seconds into
//! the video; interaction timestamps are wall-clock seconds since epoch.

pub mod aggregate;
pub mod event;
pub mod timeline;
pub mod video;

pub use aggregate::*;
pub use event::*;
pub use timeline::*;
pub use video::*;
