//! LikeLines Telemetry
//!
//! The effectful half of the engine:
//! - **Buffer:** per-session interaction buffer and its compaction rules
//! - **Backends:** session storage and aggregation (in-memory, directory)
//! - **Session:** token handshake, throttled flushing, supersede on reload
//! - **Player:** host-facing controller tying telemetry to the heatmap
//! - **Ready barrier:** one-shot "notify me when loaded" for shared resources
//!
//! Backend failures never reach the caller. They are logged and the
//! player keeps working with whatever it already has.

pub mod backend;
pub mod buffer;
pub mod player;
pub mod ready;
pub mod session;

pub use backend::{backend_from_target, InteractionBackend, SessionToken, ViewerId};
pub use buffer::{compact, InteractionBuffer};
pub use player::{LoadedVideo, PendingAggregate, Player};
pub use ready::ReadyBarrier;
pub use session::{FlushOutcome, SessionPhase, TelemetrySession};
