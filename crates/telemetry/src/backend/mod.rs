use std::sync::Arc;

use serde::{Deserialize, Serialize};

use likelines_common::config::BackendTarget;
use likelines_common::error::{LikelinesError, LikelinesResult};
use likelines_interaction_model::aggregate::AggregateResult;
use likelines_interaction_model::event::InteractionEvent;

/// Opaque token identifying one interaction session on a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// A fresh random token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the viewer a session belongs to.
///
/// A viewer owns many sessions, one per video load. Only the owner may
/// append to a session, and `myLikes` in an aggregate are the likes of
/// the viewer asking for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(String);

impl ViewerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random identity.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ViewerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage and aggregation service for interaction sessions.
#[async_trait::async_trait]
pub trait InteractionBackend: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Open a new interaction session of `viewer` for `video_id`.
    async fn create_session(
        &self,
        viewer: &ViewerId,
        video_id: &str,
        timestamp: f64,
    ) -> LikelinesResult<SessionToken>;

    /// Append `interactions` to the session. Success is the ack.
    ///
    /// Fails when the session belongs to another viewer.
    async fn send_interactions(
        &self,
        viewer: &ViewerId,
        token: &SessionToken,
        interactions: &[InteractionEvent],
    ) -> LikelinesResult<()>;

    /// Aggregate every recorded session of `video_id`, with `myLikes`
    /// taken from the sessions of `viewer`.
    async fn aggregate(&self, viewer: &ViewerId, video_id: &str)
        -> LikelinesResult<AggregateResult>;
}

pub mod directory;
pub mod memory;

pub use directory::DirectoryBackend;
pub use memory::MemoryBackend;

/// Build the configured backend; `None` runs without one.
pub fn backend_from_target(target: Option<&BackendTarget>) -> Option<Arc<dyn InteractionBackend>> {
    let backend: Arc<dyn InteractionBackend> = match target? {
        BackendTarget::Memory => Arc::new(MemoryBackend::new()),
        BackendTarget::Directory { path } => Arc::new(DirectoryBackend::new(path.clone())),
    };
    tracing::debug!(backend = backend.name(), "Backend configured");
    Some(backend)
}

/// Reject interactions a timeline cannot place.
pub(crate) fn validate_interactions(interactions: &[InteractionEvent]) -> LikelinesResult<()> {
    for (i, event) in interactions.iter().enumerate() {
        if !(event.timestamp.is_finite()
            && event.current_time.is_finite()
            && event.last_tick_time.is_finite())
        {
            return Err(LikelinesError::invalid_event(format!(
                "interaction {i} ({}) has a non-finite time",
                event.kind
            )));
        }
    }
    Ok(())
}

/// Error for a session appended to by someone other than its owner.
pub(crate) fn foreign_session(token: &SessionToken) -> LikelinesError {
    LikelinesError::backend(format!("session {token} belongs to another viewer"))
}

/// Likes recorded in `sessions`, in session order.
pub(crate) fn likes_in<'a>(sessions: impl IntoIterator<Item = &'a [InteractionEvent]>) -> Vec<f64> {
    sessions
        .into_iter()
        .flatten()
        .filter(|e| e.kind == likelines_interaction_model::event::InteractionKind::Like)
        .map(|e| e.current_time)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_backend_from_target() {
        assert!(backend_from_target(None).is_none());
        let memory = backend_from_target(Some(&BackendTarget::Memory)).unwrap();
        assert_eq!(memory.name(), "memory");
        let dir = backend_from_target(Some(&BackendTarget::Directory {
            path: PathBuf::from("/tmp/likelines"),
        }))
        .unwrap();
        assert_eq!(dir.name(), "directory");
    }

    #[test]
    fn test_generated_tokens_differ() {
        assert_ne!(SessionToken::generate(), SessionToken::generate());
        assert_eq!(SessionToken::new("abc").to_string(), "abc");
        let viewer = ViewerId::generate();
        assert_eq!(viewer.as_str().len(), 32);
        assert_ne!(viewer, ViewerId::generate());
    }

    #[test]
    fn test_non_finite_interactions_rejected() {
        use likelines_interaction_model::event::InteractionKind;

        let good = [InteractionEvent::new(1.0, InteractionKind::Like, 2.0, 1.5)];
        assert!(validate_interactions(&good).is_ok());
        let bad = [
            good[0],
            InteractionEvent::new(2.0, InteractionKind::Tick, f64::NAN, 1.5),
        ];
        let err = validate_interactions(&bad).unwrap_err();
        assert!(matches!(err, LikelinesError::InvalidEvent { .. }));
    }
}
