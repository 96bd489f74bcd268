//! Host-facing player controller.
//!
//! The host (a UI, a test, or the CLI replay) feeds playback callbacks
//! in and reads the heatmap, markers, and colours out. The controller
//! owns the telemetry session of the loaded video and guards the
//! heatmap against aggregates that arrive after a video switch.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use likelines_common::clock::Clock;
use likelines_common::config::PlayerConfig;
use likelines_common::error::{LikelinesError, LikelinesResult};
use likelines_heatmap_core::signals::{signals_from_aggregate, SignalOptions};
use likelines_heatmap_core::{Heatmap, HeatmapComposer, Kernel, MarkerSet, Palette, Rgb};
use likelines_interaction_model::aggregate::AggregateResult;
use likelines_interaction_model::event::{InteractionEvent, InteractionKind};
use likelines_interaction_model::video::VideoSource;

use crate::backend::{backend_from_target, InteractionBackend, ViewerId};
use crate::session::{FlushOutcome, TelemetrySession, DELIVERY_GRACE};

/// The video currently loaded into the player.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedVideo {
    pub source: VideoSource,
    pub video_id: String,
    pub duration: f64,
}

/// An aggregate request bound to the video that was current when it was made.
pub struct PendingAggregate {
    video_id: String,
    handle: JoinHandle<LikelinesResult<AggregateResult>>,
}

impl PendingAggregate {
    /// Video the aggregate was requested for.
    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Wait for the backend's answer.
    pub async fn resolve(self) -> LikelinesResult<(String, AggregateResult)> {
        let aggregate = self
            .handle
            .await
            .map_err(|e| LikelinesError::backend(format!("aggregate task failed: {e}")))??;
        Ok((self.video_id, aggregate))
    }
}

/// Player controller without any UI.
pub struct Player {
    config: PlayerConfig,
    backend: Option<Arc<dyn InteractionBackend>>,
    viewer: ViewerId,
    delivery_grace: Duration,
    clock: Arc<dyn Clock>,
    composer: HeatmapComposer,
    palette: Palette,
    signal_options: SignalOptions,
    video: Option<LoadedVideo>,
    session: Option<TelemetrySession>,
    last_tick_time: f64,
    heatmap: Heatmap,
    markers: MarkerSet,
}

impl Player {
    /// Build a player for `config`, creating the configured backend.
    pub fn new(config: PlayerConfig, clock: Arc<dyn Clock>) -> LikelinesResult<Self> {
        let backend = backend_from_target(config.backend.as_ref());
        Self::with_backend(config, backend, clock)
    }

    /// Build a player around an existing backend (or none).
    pub fn with_backend(
        config: PlayerConfig,
        backend: Option<Arc<dyn InteractionBackend>>,
        clock: Arc<dyn Clock>,
    ) -> LikelinesResult<Self> {
        config.validate()?;
        if backend.is_none() {
            tracing::info!("No backend configured, running as local-only heatmap renderer");
        }
        Ok(Self {
            composer: HeatmapComposer::from_config(&config),
            palette: Palette::from_name(config.palette),
            heatmap: Heatmap::zeros(config.heatmap_width),
            signal_options: SignalOptions::default(),
            config,
            backend,
            viewer: ViewerId::generate(),
            delivery_grace: DELIVERY_GRACE,
            clock,
            video: None,
            session: None,
            last_tick_time: 0.0,
            markers: MarkerSet::new(),
        })
    }

    /// Act as a known viewer instead of a fresh anonymous one.
    ///
    /// Takes effect from the next loaded video.
    pub fn with_viewer(mut self, viewer: ViewerId) -> Self {
        self.viewer = viewer;
        self
    }

    pub fn viewer(&self) -> &ViewerId {
        &self.viewer
    }

    /// Bound on how long a video switch or [`close`](Self::close) waits
    /// for the backend.
    pub fn set_delivery_grace(&mut self, grace: Duration) {
        self.delivery_grace = grace;
        if let Some(session) = self.session.as_mut() {
            session.set_delivery_grace(grace);
        }
    }

    /// Use a caller-supplied kernel instead of the configured one.
    pub fn set_kernel(&mut self, kernel: Kernel) {
        self.composer = self.composer.clone().with_kernel(kernel);
    }

    pub fn set_signal_options(&mut self, options: SignalOptions) {
        self.signal_options = options;
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn video(&self) -> Option<&LoadedVideo> {
        self.video.as_ref()
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video.as_ref().map(|v| v.video_id.as_str())
    }

    pub fn session(&self) -> Option<&TelemetrySession> {
        self.session.as_ref()
    }

    pub fn last_tick_time(&self) -> f64 {
        self.last_tick_time
    }

    /// Load a new video, superseding the previous session.
    pub async fn load_video(&mut self, url: &str, duration: f64) -> &LoadedVideo {
        if let Some(mut previous) = self.session.take() {
            previous.supersede().await;
        }

        let source = VideoSource::from_url(url);
        let video_id = source.canonical_id();
        tracing::info!(
            video_id = %video_id,
            player = source.player_name(),
            duration,
            "Loading video"
        );

        let mut session = TelemetrySession::new(
            video_id.clone(),
            self.viewer.clone(),
            self.backend.clone(),
            self.config.backend_read_only,
            self.config.backend_throttle_secs,
            self.clock.clone(),
        );
        session.set_delivery_grace(self.delivery_grace);
        session.start();
        self.session = Some(session);

        self.last_tick_time = 0.0;
        self.heatmap = Heatmap::zeros(self.config.heatmap_width);
        self.markers.clear();
        self.video.insert(LoadedVideo {
            source,
            video_id,
            duration,
        })
    }

    /// Wait until the current session has its token.
    pub async fn wait_for_session(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) => session.wait_for_token().await,
            None => false,
        }
    }

    /// Wait for the current session's outstanding send, if any.
    pub async fn settle(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.settle().await;
        }
    }

    /// Polling tick at playhead `current_time`.
    pub async fn on_tick(&mut self, current_time: f64) -> FlushOutcome {
        self.last_tick_time = current_time;
        let event = InteractionEvent::tick(self.clock.now_secs(), current_time);
        self.record_and_flush(event, false).await
    }

    /// A player state change or like at playhead `current_time`.
    pub async fn on_playback_event(
        &mut self,
        kind: InteractionKind,
        current_time: f64,
    ) -> FlushOutcome {
        let event = InteractionEvent::new(
            self.clock.now_secs(),
            kind,
            current_time,
            self.last_tick_time,
        );
        self.record_and_flush(event, kind.forces_send()).await
    }

    /// The viewer liked the moment at `current_time`.
    pub async fn on_like(&mut self, current_time: f64) -> FlushOutcome {
        self.markers.add(current_time);
        self.on_playback_event(InteractionKind::Like, current_time).await
    }

    async fn record_and_flush(&mut self, event: InteractionEvent, force: bool) -> FlushOutcome {
        let Some(session) = self.session.as_mut() else {
            return FlushOutcome::Disabled;
        };
        session.record(event);
        session.maybe_flush(force).await
    }

    /// Ask the backend for the current video's aggregate.
    ///
    /// `None` without a backend or a loaded video.
    pub fn request_aggregate(&self) -> Option<PendingAggregate> {
        let backend = self.backend.clone()?;
        let video_id = self.video_id()?.to_string();
        let request_id = video_id.clone();
        let viewer = self.viewer.clone();
        let handle = tokio::spawn(async move { backend.aggregate(&viewer, &request_id).await });
        Some(PendingAggregate { video_id, handle })
    }

    /// Rebuild the heatmap and markers from an aggregate of `video_id`.
    ///
    /// Returns `false` and leaves everything untouched when `video_id`
    /// is no longer the loaded video.
    pub fn apply_aggregate(&mut self, video_id: &str, aggregate: &AggregateResult) -> bool {
        let Some(video) = self.video.as_ref() else {
            return false;
        };
        if video.video_id != video_id {
            tracing::debug!(
                stale = video_id,
                current = %video.video_id,
                "Discarding aggregate for a video that is no longer loaded"
            );
            return false;
        }

        let signals = signals_from_aggregate(aggregate, video.duration, self.signal_options);
        self.heatmap = self
            .composer
            .compose(video.duration, self.config.heatmap_width, &signals);
        self.markers.replace_all(&aggregate.my_likes);
        tracing::debug!(
            video_id,
            sessions = aggregate.num_sessions,
            likes = aggregate.liked_points.len(),
            "Heatmap refreshed"
        );
        true
    }

    /// Request, await, and apply the current video's aggregate.
    ///
    /// Backend failures are logged and leave the heatmap as it was.
    pub async fn refresh_heatmap(&mut self) -> bool {
        let Some(pending) = self.request_aggregate() else {
            return false;
        };
        match pending.resolve().await {
            Ok((video_id, aggregate)) => self.apply_aggregate(&video_id, &aggregate),
            Err(e) => {
                tracing::warn!(error = %e, "Loading aggregate failed");
                false
            }
        }
    }

    /// Flush and end the current session.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.supersede().await;
        }
    }

    pub fn heatmap(&self) -> &Heatmap {
        &self.heatmap
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Heatmap bins painted with the configured palette.
    pub fn colors(&self) -> Vec<Rgb> {
        self.palette.paint(&self.heatmap)
    }
}
