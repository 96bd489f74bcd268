//! One interaction session: buffering, throttled flushing, and teardown.
//!
//! A session moves through three phases:
//!
//! ```text
//! AwaitingToken --(createSession ack)--> Active --(supersede)--> Superseded
//! ```
//!
//! Events are accepted in every phase. Sends happen only while
//! `Active`, and only one send is outstanding at a time. The buffer is
//! trimmed when the backend acknowledges a send, so anything recorded
//! while the send was in flight is kept for the next flush.
//!
//! Recording never waits on the backend. A forced flush that finds a
//! send outstanding is remembered and goes out, throttle or not, on the
//! first flush after that send completes. Only [`TelemetrySession::supersede`]
//! waits for delivery, and never longer than the delivery grace.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use likelines_common::clock::{Clock, Throttle};
use likelines_common::error::{LikelinesError, LikelinesResult};
use likelines_interaction_model::event::InteractionEvent;

use crate::backend::{InteractionBackend, SessionToken, ViewerId};
use crate::buffer::InteractionBuffer;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the backend to issue a session token.
    AwaitingToken,
    /// Token received; flushes may transmit.
    Active,
    /// Replaced by a newer session. Terminal.
    Superseded,
}

/// What a flush attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// No backend, read-only mode, or the session is over.
    Disabled,
    /// No session token yet; events stay buffered.
    AwaitingToken,
    /// Inside the throttle window.
    Throttled,
    /// A previous send has not been acknowledged yet.
    InFlight,
    /// Nothing to send.
    Empty,
    /// A send of `events` compacted interactions was started.
    Dispatched { events: usize },
}

impl FlushOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, FlushOutcome::Dispatched { .. })
    }
}

type TokenReceiver = oneshot::Receiver<LikelinesResult<SessionToken>>;

/// How long teardown waits for a send before detaching it.
pub const DELIVERY_GRACE: Duration = Duration::from_secs(2);

/// Buffered telemetry for one loaded video.
pub struct TelemetrySession {
    video_id: String,
    viewer: ViewerId,
    backend: Option<Arc<dyn InteractionBackend>>,
    read_only: bool,
    clock: Arc<dyn Clock>,
    phase: SessionPhase,
    token: Option<SessionToken>,
    token_rx: Option<TokenReceiver>,
    buffer: InteractionBuffer,
    throttle: Throttle,
    in_flight: Option<JoinHandle<LikelinesResult<usize>>>,
    in_flight_len: usize,
    force_pending: bool,
    delivery_grace: Duration,
    degraded_logged: bool,
    sends_acked: u64,
}

impl TelemetrySession {
    pub fn new(
        video_id: impl Into<String>,
        viewer: ViewerId,
        backend: Option<Arc<dyn InteractionBackend>>,
        read_only: bool,
        throttle_secs: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            viewer,
            backend,
            read_only,
            clock,
            phase: SessionPhase::AwaitingToken,
            token: None,
            token_rx: None,
            buffer: InteractionBuffer::new(),
            throttle: Throttle::new(throttle_secs),
            in_flight: None,
            in_flight_len: 0,
            force_pending: false,
            delivery_grace: DELIVERY_GRACE,
            degraded_logged: false,
            sends_acked: 0,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn viewer(&self) -> &ViewerId {
        &self.viewer
    }

    /// Bound on how long [`supersede`](Self::supersede) waits per send.
    pub fn set_delivery_grace(&mut self, grace: Duration) {
        self.delivery_grace = grace;
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    pub fn buffered(&self) -> &[InteractionEvent] {
        self.buffer.events()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a send is waiting for its acknowledgement.
    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether a forced flush is waiting for the outstanding send.
    pub fn has_pending_force(&self) -> bool {
        self.force_pending
    }

    /// Number of sends the backend acknowledged.
    pub fn sends_acked(&self) -> u64 {
        self.sends_acked
    }

    fn sending_enabled(&self) -> bool {
        self.backend.is_some() && !self.read_only
    }

    /// Start the session handshake in the background.
    ///
    /// Does nothing without a backend or in read-only mode. Must be
    /// called from within a Tokio runtime.
    pub fn start(&mut self) {
        if self.token_rx.is_some() || self.token.is_some() {
            return;
        }
        let Some(backend) = self.backend.clone().filter(|_| !self.read_only) else {
            tracing::debug!(video_id = %self.video_id, "No writable backend, telemetry disabled");
            self.degraded_logged = true;
            return;
        };

        let (tx, rx) = oneshot::channel();
        let video_id = self.video_id.clone();
        let viewer = self.viewer.clone();
        let timestamp = self.clock.now_secs();
        tokio::spawn(async move {
            let result = backend.create_session(&viewer, &video_id, timestamp).await;
            let _ = tx.send(result);
        });
        self.token_rx = Some(rx);
        tracing::info!(video_id = %self.video_id, "Interaction session starting");
    }

    /// Append an interaction. Never flushes.
    pub fn record(&mut self, event: InteractionEvent) {
        self.buffer.record(event);
    }

    /// Adopt the token if the handshake has finished.
    fn poll_token(&mut self) {
        let Some(rx) = self.token_rx.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(result) => {
                self.token_rx = None;
                self.adopt(result);
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                self.token_rx = None;
                self.adopt(Err(handshake_dropped()));
            }
        }
    }

    fn adopt(&mut self, result: LikelinesResult<SessionToken>) {
        match result {
            Ok(token) => {
                tracing::info!(video_id = %self.video_id, token = %token, "Session token received");
                self.token = Some(token);
                if self.phase == SessionPhase::AwaitingToken {
                    self.phase = SessionPhase::Active;
                }
            }
            Err(e) => {
                tracing::warn!(
                    video_id = %self.video_id,
                    error = %e,
                    "Session handshake failed, interactions will not be sent"
                );
            }
        }
    }

    /// Wait for the handshake to finish. Returns whether a token is held.
    pub async fn wait_for_token(&mut self) -> bool {
        if let Some(rx) = self.token_rx.take() {
            match rx.await {
                Ok(result) => self.adopt(result),
                Err(_) => self.adopt(Err(handshake_dropped())),
            }
        }
        self.token.is_some()
    }

    /// Apply the result of a finished send.
    fn complete_send(&mut self, joined: Result<LikelinesResult<usize>, tokio::task::JoinError>) {
        self.in_flight_len = 0;
        match joined {
            Ok(Ok(sent)) => {
                self.buffer.acknowledge(sent);
                self.sends_acked += 1;
                tracing::debug!(
                    video_id = %self.video_id,
                    events = sent,
                    remaining = self.buffer.len(),
                    "Interactions acknowledged"
                );
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    video_id = %self.video_id,
                    error = %e,
                    "Sending interactions failed, keeping them for the next flush"
                );
            }
            Err(e) => {
                tracing::warn!(video_id = %self.video_id, error = %e, "Send task aborted");
            }
        }
    }

    /// Collect a finished send. Returns `true` if one is still outstanding.
    async fn reap_in_flight(&mut self) -> bool {
        match self.in_flight.take() {
            None => false,
            Some(handle) if handle.is_finished() => {
                let joined = handle.await;
                self.complete_send(joined);
                false
            }
            Some(handle) => {
                self.in_flight = Some(handle);
                true
            }
        }
    }

    /// Wait for any outstanding send and apply its result.
    ///
    /// Unbounded; the record path never calls this.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            let joined = handle.await;
            self.complete_send(joined);
        }
    }

    /// Wait up to the delivery grace for the outstanding send.
    ///
    /// A send still running after the grace is detached. Its events are
    /// dropped from the buffer so they are not sent twice. Returns how
    /// many events were handed off that way.
    async fn finish_in_flight(&mut self) -> usize {
        let Some(mut handle) = self.in_flight.take() else {
            return 0;
        };
        match tokio::time::timeout(self.delivery_grace, &mut handle).await {
            Ok(joined) => {
                self.complete_send(joined);
                0
            }
            Err(_) => {
                let handed_off = std::mem::take(&mut self.in_flight_len);
                self.buffer.acknowledge(handed_off);
                tracing::warn!(
                    video_id = %self.video_id,
                    events = handed_off,
                    grace_ms = self.delivery_grace.as_millis() as u64,
                    "Send still pending after grace, detaching it"
                );
                handed_off
            }
        }
    }

    /// Try to send the buffer.
    ///
    /// Sends when `force` is set or the throttle window has passed, a
    /// token is held, and no other send is outstanding. Never waits for
    /// the backend: a forced flush that meets an outstanding send returns
    /// [`FlushOutcome::InFlight`] and is carried over to the next flush.
    pub async fn maybe_flush(&mut self, force: bool) -> FlushOutcome {
        if self.phase == SessionPhase::Superseded {
            return FlushOutcome::Disabled;
        }
        if !self.sending_enabled() {
            if !self.degraded_logged {
                tracing::debug!(video_id = %self.video_id, "No writable backend, telemetry disabled");
                self.degraded_logged = true;
            }
            return FlushOutcome::Disabled;
        }

        self.poll_token();
        let (Some(token), Some(backend)) = (self.token.clone(), self.backend.clone()) else {
            return FlushOutcome::AwaitingToken;
        };

        if self.reap_in_flight().await {
            if force && !self.force_pending {
                tracing::debug!(video_id = %self.video_id, "Send outstanding, deferring forced flush");
                self.force_pending = true;
            }
            return FlushOutcome::InFlight;
        }
        let force = force || std::mem::take(&mut self.force_pending);

        let now = self.clock.now_secs();
        if !force && !self.throttle.is_ready(now) {
            return FlushOutcome::Throttled;
        }

        let before = self.buffer.len();
        self.buffer.compact_in_place();
        if self.buffer.is_empty() {
            return FlushOutcome::Empty;
        }

        let batch = self.buffer.events().to_vec();
        let count = batch.len();
        self.throttle.mark(now);
        tracing::debug!(
            video_id = %self.video_id,
            buffered = before,
            events = count,
            force,
            "Dispatching interactions"
        );

        let viewer = self.viewer.clone();
        self.in_flight_len = count;
        self.in_flight = Some(tokio::spawn(async move {
            backend.send_interactions(&viewer, &token, &batch).await?;
            Ok::<usize, LikelinesError>(count)
        }));
        FlushOutcome::Dispatched { events: count }
    }

    /// Force-flush once and end the session.
    ///
    /// Waits at most the delivery grace for the outstanding send and
    /// again for the final one. Returns the number of events that never
    /// reached a send.
    pub async fn supersede(&mut self) -> usize {
        if self.phase == SessionPhase::Superseded {
            return self.buffer.len();
        }
        let mut handed_off = self.finish_in_flight().await;
        let outcome = self.maybe_flush(true).await;
        handed_off += self.finish_in_flight().await;
        self.force_pending = false;
        self.phase = SessionPhase::Superseded;

        let dropped = self.buffer.clear();
        tracing::info!(
            video_id = %self.video_id,
            ?outcome,
            handed_off,
            dropped,
            "Interaction session superseded"
        );
        dropped
    }
}

fn handshake_dropped() -> LikelinesError {
    LikelinesError::session("handshake task ended without a token")
}
