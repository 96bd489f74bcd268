use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use likelines_common::clock::{Clock, ManualClock};
use likelines_common::config::{BackendTarget, PlayerConfig};
use likelines_common::error::LikelinesResult;
use likelines_interaction_model::aggregate::AggregateResult;
use likelines_interaction_model::event::{InteractionEvent, InteractionKind};
use likelines_interaction_model::timeline::PlayedInterval;
use likelines_telemetry::backend::MemoryBackend;
use likelines_telemetry::{FlushOutcome, InteractionBackend, Player, SessionToken, ViewerId};

fn config(width: usize) -> PlayerConfig {
    PlayerConfig {
        heatmap_width: width,
        ..PlayerConfig::default()
    }
}

fn memory_player(clock: &ManualClock) -> (Player, Arc<MemoryBackend>) {
    let memory = Arc::new(MemoryBackend::new());
    let backend: Arc<dyn InteractionBackend> = memory.clone();
    let clock: Arc<dyn Clock> = Arc::new(clock.clone());
    let player = Player::with_backend(config(60), Some(backend), clock).unwrap();
    (player, memory)
}

/// Issues tokens but never finishes a send.
struct HungBackend;

#[async_trait::async_trait]
impl InteractionBackend for HungBackend {
    fn name(&self) -> &'static str {
        "hung"
    }

    async fn create_session(
        &self,
        _viewer: &ViewerId,
        _video_id: &str,
        _ts: f64,
    ) -> LikelinesResult<SessionToken> {
        Ok(SessionToken::new("hung"))
    }

    async fn send_interactions(
        &self,
        _viewer: &ViewerId,
        _token: &SessionToken,
        _interactions: &[InteractionEvent],
    ) -> LikelinesResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn aggregate(&self, _viewer: &ViewerId, _video_id: &str) -> LikelinesResult<AggregateResult> {
        Ok(AggregateResult::default())
    }
}

/// Play from 0 to `until` one second per tick, liking at `like_at`.
async fn watch(player: &mut Player, clock: &ManualClock, until: u32, like_at: u32) {
    player.on_playback_event(InteractionKind::Playing, 0.0).await;
    for t in 1..=until {
        clock.advance(1.0);
        player.on_tick(t as f64).await;
        if t == like_at {
            player.on_like(t as f64).await;
        }
    }
    clock.advance(0.5);
    player.on_playback_event(InteractionKind::Paused, until as f64).await;
}

#[tokio::test]
async fn aggregate_for_previous_video_is_discarded() {
    let clock = ManualClock::new(1000.0);
    let (mut player, memory) = memory_player(&clock);

    player.load_video("https://youtu.be/aaa", 60.0).await;
    assert!(player.wait_for_session().await);
    watch(&mut player, &clock, 20, 12).await;

    let pending = player.request_aggregate().unwrap();
    assert_eq!(pending.video_id(), "YouTube:aaa");

    player.load_video("https://www.youtube.com/watch?v=bbb", 30.0).await;
    let (video_id, aggregate) = pending.resolve().await.unwrap();
    assert!(!player.apply_aggregate(&video_id, &aggregate));
    assert!(player.heatmap().is_flat());
    assert_eq!(player.heatmap().len(), 60);
    assert!(player.markers().is_empty());

    // the superseded session delivered everything before it ended
    let stored = memory.aggregate(player.viewer(), "YouTube:aaa").await.unwrap();
    assert_eq!(stored.num_sessions, 1);
    assert_eq!(stored.playback_sessions, vec![vec![PlayedInterval::new(0.0, 20.0)]]);
    assert_eq!(stored.liked_points, vec![12.0]);
    assert_eq!(stored.my_likes, vec![12.0]);
}

#[tokio::test]
async fn refresh_builds_heatmap_and_markers() {
    let clock = ManualClock::new(2000.0);
    let (mut player, _memory) = memory_player(&clock);

    player.load_video("https://youtu.be/ccc", 60.0).await;
    player.wait_for_session().await;
    watch(&mut player, &clock, 30, 25).await;
    player.settle().await;
    assert!(player.on_like(28.0).await.is_dispatched());
    player.settle().await;

    assert!(player.refresh_heatmap().await);
    let heatmap = player.heatmap();
    assert_eq!(heatmap.len(), 60);
    assert!(!heatmap.is_flat());
    assert!(heatmap.values()[26] > heatmap.values()[50]);
    assert_eq!(player.markers().as_slice(), &[25.0, 28.0]);
    assert_eq!(player.colors().len(), 60);
}

#[tokio::test]
async fn reloading_supersedes_exactly_once() {
    let clock = ManualClock::new(3000.0);
    let (mut player, memory) = memory_player(&clock);

    player.load_video("https://youtu.be/aaa", 10.0).await;
    player.wait_for_session().await;
    player.on_like(1.0).await;
    player.load_video("https://youtu.be/bbb", 10.0).await;
    player.wait_for_session().await;
    player.load_video("https://youtu.be/aaa", 10.0).await;
    player.wait_for_session().await;

    assert_eq!(memory.session_count("YouTube:aaa").await, 2);
    assert_eq!(memory.session_count("YouTube:bbb").await, 1);
    assert_eq!(player.video_id(), Some("YouTube:aaa"));
    assert_eq!(player.last_tick_time(), 0.0);
}

#[tokio::test]
async fn markers_show_only_the_viewers_own_likes() {
    let clock = ManualClock::new(4000.0);
    let memory = Arc::new(MemoryBackend::new());
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());

    let mut players = Vec::new();
    for (name, like_at) in [("alice", 5.0), ("bob", 40.0)] {
        let backend: Arc<dyn InteractionBackend> = memory.clone();
        let mut player = Player::with_backend(config(60), Some(backend), shared.clone())
            .unwrap()
            .with_viewer(ViewerId::new(name));
        player.load_video("https://youtu.be/shared", 60.0).await;
        assert!(player.wait_for_session().await);
        player.on_like(like_at).await;
        player.close().await;
        players.push(player);
    }

    for player in &mut players {
        assert!(player.refresh_heatmap().await);
    }
    assert_eq!(players[0].markers().as_slice(), &[5.0]);
    assert_eq!(players[1].markers().as_slice(), &[40.0]);

    let everyone = memory
        .aggregate(&ViewerId::new("carol"), "YouTube:shared")
        .await
        .unwrap();
    assert_eq!(everyone.liked_points, vec![5.0, 40.0]);
    assert!(everyone.my_likes.is_empty());
}

#[tokio::test]
async fn hung_backend_never_blocks_the_player() {
    let clock = ManualClock::new(6000.0);
    let backend: Arc<dyn InteractionBackend> = Arc::new(HungBackend);
    let mut player =
        Player::with_backend(config(20), Some(backend), Arc::new(clock.clone())).unwrap();
    player.set_delivery_grace(Duration::from_millis(50));
    let limit = Duration::from_secs(2);

    player.load_video("https://youtu.be/hung", 20.0).await;
    assert!(player.wait_for_session().await);
    assert!(player.on_tick(0.25).await.is_dispatched());

    clock.advance(0.5);
    let liked = tokio::time::timeout(limit, player.on_like(1.0))
        .await
        .expect("like waited on the backend");
    assert_eq!(liked, FlushOutcome::InFlight);
    let ended = tokio::time::timeout(limit, player.on_playback_event(InteractionKind::Ended, 2.0))
        .await
        .expect("end of playback waited on the backend");
    assert_eq!(ended, FlushOutcome::InFlight);

    tokio::time::timeout(limit, player.load_video("https://youtu.be/next", 20.0))
        .await
        .expect("video switch waited on the backend");
    tokio::time::timeout(limit, player.close())
        .await
        .expect("close waited on the backend");
    assert!(player.session().is_none());
}

#[tokio::test]
async fn local_only_player_still_renders() {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0.0));
    let mut player = Player::with_backend(config(10), None, clock).unwrap();

    assert_eq!(player.on_tick(1.0).await, FlushOutcome::Disabled);
    player.load_video("/media/clip.mp4", 10.0).await;
    assert_eq!(player.on_tick(1.0).await, FlushOutcome::Disabled);
    assert_eq!(player.on_like(4.0).await, FlushOutcome::Disabled);
    assert_eq!(player.markers().as_slice(), &[4.0]);
    assert!(player.request_aggregate().is_none());
    assert!(!player.refresh_heatmap().await);

    let aggregate = AggregateResult {
        num_sessions: 1,
        playback_sessions: vec![vec![PlayedInterval::new(2.0, 5.0)]],
        liked_points: vec![4.0],
        my_likes: vec![4.0, 7.0],
        seeks: None,
        mca: BTreeMap::new(),
    };
    assert!(!player.apply_aggregate("/media/other.mp4", &aggregate));
    assert!(player.apply_aggregate("/media/clip.mp4", &aggregate));
    assert_eq!(player.heatmap().peak_bin(), Some(4));
    assert_eq!(player.markers().as_slice(), &[4.0, 7.0]);
}

#[tokio::test]
async fn directory_backend_persists_across_players() {
    let dir = std::env::temp_dir().join("likelines_test_player_directory");
    let _ = std::fs::remove_dir_all(&dir);
    let config = PlayerConfig {
        backend: Some(BackendTarget::Directory { path: dir.clone() }),
        heatmap_width: 40,
        ..PlayerConfig::default()
    };

    let clock = ManualClock::new(5000.0);
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    let mut first = Player::new(config.clone(), shared.clone()).unwrap();
    first.load_video("https://youtu.be/persist", 40.0).await;
    first.wait_for_session().await;
    watch(&mut first, &clock, 15, 10).await;
    first.close().await;

    let mut second = Player::new(config, shared)
        .unwrap()
        .with_viewer(first.viewer().clone());
    second.load_video("https://youtu.be/persist", 40.0).await;
    assert!(second.refresh_heatmap().await);
    assert!(!second.heatmap().is_flat());
    assert_eq!(second.markers().as_slice(), &[10.0]);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn invalid_config_is_rejected() {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0.0));
    let bad = PlayerConfig {
        smoothing_bandwidth: 0.0,
        ..PlayerConfig::default()
    };
    assert!(Player::with_backend(bad, None, clock).is_err());
}
