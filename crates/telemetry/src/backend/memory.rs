//! In-process interaction store.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::Mutex;

use likelines_common::error::{LikelinesError, LikelinesResult};
use likelines_interaction_model::aggregate::{AggregateBuilder, AggregateResult, McaTrack};
use likelines_interaction_model::event::InteractionEvent;

use super::{
    foreign_session, likes_in, validate_interactions, InteractionBackend, SessionToken, ViewerId,
};

#[derive(Debug)]
struct StoredSession {
    viewer: ViewerId,
    video_id: String,
    created_at: f64,
    interactions: Vec<InteractionEvent>,
}

#[derive(Debug, Default)]
struct Store {
    sessions: Vec<StoredSession>,
    by_token: HashMap<SessionToken, usize>,
    mca: HashMap<String, BTreeMap<String, McaTrack>>,
}

/// Keeps every session in memory; lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: Mutex<Store>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a content-analysis track to a video, replacing one with the same name.
    pub async fn post_mca(&self, video_id: &str, name: &str, track: McaTrack) {
        let mut store = self.store.lock().await;
        store
            .mca
            .entry(video_id.to_string())
            .or_default()
            .insert(name.to_string(), track);
    }

    /// Remove a content-analysis track. Returns whether it existed.
    pub async fn delete_mca(&self, video_id: &str, name: &str) -> bool {
        let mut store = self.store.lock().await;
        store
            .mca
            .get_mut(video_id)
            .map_or(false, |tracks| tracks.remove(name).is_some())
    }

    /// Interactions stored for a session.
    pub async fn interactions(&self, token: &SessionToken) -> Option<Vec<InteractionEvent>> {
        let store = self.store.lock().await;
        let idx = *store.by_token.get(token)?;
        Some(store.sessions[idx].interactions.clone())
    }

    /// Number of sessions created for `video_id`.
    pub async fn session_count(&self, video_id: &str) -> usize {
        let store = self.store.lock().await;
        store
            .sessions
            .iter()
            .filter(|s| s.video_id == video_id)
            .count()
    }
}

#[async_trait::async_trait]
impl InteractionBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_session(
        &self,
        viewer: &ViewerId,
        video_id: &str,
        timestamp: f64,
    ) -> LikelinesResult<SessionToken> {
        let token = SessionToken::generate();
        let mut store = self.store.lock().await;
        let idx = store.sessions.len();
        store.sessions.push(StoredSession {
            viewer: viewer.clone(),
            video_id: video_id.to_string(),
            created_at: timestamp,
            interactions: Vec::new(),
        });
        store.by_token.insert(token.clone(), idx);
        tracing::debug!(video_id, token = %token, "Memory session created");
        Ok(token)
    }

    async fn send_interactions(
        &self,
        viewer: &ViewerId,
        token: &SessionToken,
        interactions: &[InteractionEvent],
    ) -> LikelinesResult<()> {
        validate_interactions(interactions)?;
        let mut store = self.store.lock().await;
        let idx = *store
            .by_token
            .get(token)
            .ok_or_else(|| LikelinesError::backend(format!("unknown session token {token}")))?;
        let session = &mut store.sessions[idx];
        if &session.viewer != viewer {
            return Err(foreign_session(token));
        }
        session.interactions.extend_from_slice(interactions);
        Ok(())
    }

    async fn aggregate(
        &self,
        viewer: &ViewerId,
        video_id: &str,
    ) -> LikelinesResult<AggregateResult> {
        let store = self.store.lock().await;
        let mut sessions: Vec<&StoredSession> = store
            .sessions
            .iter()
            .filter(|s| s.video_id == video_id)
            .collect();
        sessions.sort_by(|a, b| a.created_at.total_cmp(&b.created_at));

        let mut builder = AggregateBuilder::new();
        for session in &sessions {
            builder.add_session(&session.interactions);
        }
        let my_likes = likes_in(
            sessions
                .iter()
                .filter(|s| &s.viewer == viewer)
                .map(|s| s.interactions.as_slice()),
        );
        let mca = store.mca.get(video_id).cloned().unwrap_or_default();
        Ok(builder.finish(my_likes, mca))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use likelines_interaction_model::aggregate::McaKind;
    use likelines_interaction_model::event::InteractionKind;
    use likelines_interaction_model::timeline::PlayedInterval;

    #[tokio::test]
    async fn test_sessions_aggregate_per_video() {
        let backend = MemoryBackend::new();
        let viewer = ViewerId::new("viewer-1");
        let a = backend
            .create_session(&viewer, "YouTube:a", 100.0)
            .await
            .unwrap();
        let b = backend
            .create_session(&viewer, "YouTube:b", 101.0)
            .await
            .unwrap();

        backend
            .send_interactions(
                &viewer,
                &a,
                &[
                    InteractionEvent::new(100.0, InteractionKind::Playing, 0.0, 0.0),
                    InteractionEvent::new(103.0, InteractionKind::Like, 3.0, 2.75),
                    InteractionEvent::new(105.0, InteractionKind::Paused, 5.0, 5.0),
                ],
            )
            .await
            .unwrap();
        backend
            .send_interactions(
                &viewer,
                &b,
                &[InteractionEvent::new(101.0, InteractionKind::Like, 9.0, 0.0)],
            )
            .await
            .unwrap();

        let aggregate = backend.aggregate(&viewer, "YouTube:a").await.unwrap();
        assert_eq!(aggregate.num_sessions, 1);
        assert_eq!(
            aggregate.playback_sessions,
            vec![vec![PlayedInterval::new(0.0, 5.0)]]
        );
        assert_eq!(aggregate.liked_points, vec![3.0]);
        assert_eq!(aggregate.my_likes, vec![3.0]);
        assert_eq!(backend.session_count("YouTube:b").await, 1);
        assert_eq!(backend.interactions(&b).await.map(|v| v.len()), Some(1));
    }

    #[tokio::test]
    async fn test_my_likes_belong_to_the_asking_viewer() {
        let backend = MemoryBackend::new();
        let alice = ViewerId::new("alice");
        let bob = ViewerId::new("bob");
        for (viewer, like_at, ts) in [(&alice, 5.0, 10.0), (&bob, 40.0, 20.0)] {
            let token = backend.create_session(viewer, "v", ts).await.unwrap();
            backend
                .send_interactions(
                    viewer,
                    &token,
                    &[InteractionEvent::new(ts, InteractionKind::Like, like_at, like_at)],
                )
                .await
                .unwrap();
        }

        let for_alice = backend.aggregate(&alice, "v").await.unwrap();
        assert_eq!(for_alice.liked_points, vec![5.0, 40.0]);
        assert_eq!(for_alice.my_likes, vec![5.0]);
        let for_bob = backend.aggregate(&bob, "v").await.unwrap();
        assert_eq!(for_bob.my_likes, vec![40.0]);
        let stranger = backend.aggregate(&ViewerId::new("carol"), "v").await.unwrap();
        assert!(stranger.my_likes.is_empty());
        assert_eq!(stranger.num_sessions, 2);
    }

    #[tokio::test]
    async fn test_foreign_session_rejected() {
        let backend = MemoryBackend::new();
        let owner = ViewerId::new("owner");
        let token = backend.create_session(&owner, "v", 1.0).await.unwrap();
        let like = [InteractionEvent::new(2.0, InteractionKind::Like, 1.0, 1.0)];

        let err = backend
            .send_interactions(&ViewerId::new("intruder"), &token, &like)
            .await
            .unwrap_err();
        assert!(matches!(err, LikelinesError::Backend { .. }));
        assert_eq!(backend.interactions(&token).await.map(|v| v.len()), Some(0));
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let backend = MemoryBackend::new();
        let err = backend
            .send_interactions(&ViewerId::new("v"), &SessionToken::new("nope"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LikelinesError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_mca_tracks() {
        let backend = MemoryBackend::new();
        let viewer = ViewerId::default();
        backend
            .post_mca("v", "faces", McaTrack::curve(vec![0.0, 1.0], 2.0))
            .await;
        let aggregate = backend.aggregate(&viewer, "v").await.unwrap();
        assert_eq!(aggregate.mca["faces"].kind, McaKind::Curve);
        assert_eq!(aggregate.num_sessions, 0);

        assert!(backend.delete_mca("v", "faces").await);
        assert!(!backend.delete_mca("v", "faces").await);
        assert!(backend.aggregate(&viewer, "v").await.unwrap().mca.is_empty());
    }
}
