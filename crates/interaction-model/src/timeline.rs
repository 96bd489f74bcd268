//! Per-session timeline reconstruction.
//!
//! Turns one session's raw interactions back into what the viewer
//! actually watched: played intervals, like timepoints, and forward
//! seeks detected from tick jumps.

use serde::{Deserialize, Serialize};

use crate::event::{InteractionEvent, InteractionKind};

/// A tick whose playhead advanced more than this many times the elapsed
/// wall-clock time is treated as a seek rather than playback.
pub const SEEK_SPEED_FACTOR: f64 = 30.0;

/// A contiguous stretch of the video that was played.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct PlayedInterval {
    /// Playhead position where playback started (seconds).
    pub start: f64,
    /// Playhead position where playback stopped (seconds).
    pub end: f64,
}

impl PlayedInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Played length in seconds (zero for inverted intervals).
    pub fn length(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

impl From<(f64, f64)> for PlayedInterval {
    fn from((start, end): (f64, f64)) -> Self {
        Self { start, end }
    }
}

impl From<PlayedInterval> for (f64, f64) {
    fn from(i: PlayedInterval) -> Self {
        (i.start, i.end)
    }
}

/// What one viewing session amounted to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTimeline {
    pub intervals: Vec<PlayedInterval>,
    pub likes: Vec<f64>,
    pub seeks: Vec<f64>,
}

impl SessionTimeline {
    /// Reconstruct a session from its interactions (any order).
    pub fn reconstruct(interactions: &[InteractionEvent]) -> Self {
        let mut sorted = interactions.to_vec();
        sorted.sort_by(InteractionEvent::replay_cmp);

        let mut timeline = SessionTimeline::default();
        let mut open_start: Option<f64> = None;
        let mut prev: Option<&InteractionEvent> = None;

        for event in &sorted {
            match event.kind {
                InteractionKind::Like => timeline.likes.push(event.current_time),
                InteractionKind::Playing => {
                    if let Some(start) = open_start {
                        timeline
                            .intervals
                            .push(PlayedInterval::new(start, event.last_tick_time));
                    }
                    open_start = Some(event.current_time);
                }
                InteractionKind::Paused => {
                    if let Some(start) = open_start.take() {
                        timeline
                            .intervals
                            .push(PlayedInterval::new(start, event.last_tick_time));
                    }
                }
                InteractionKind::Tick => {
                    if let Some(p) = prev {
                        let wall_elapsed = event.timestamp - p.timestamp;
                        let playhead_moved = event.current_time - p.current_time;
                        if wall_elapsed * SEEK_SPEED_FACTOR < playhead_moved {
                            timeline.seeks.push(event.current_time);
                            if let Some(start) = open_start {
                                timeline
                                    .intervals
                                    .push(PlayedInterval::new(start, p.current_time));
                                open_start = Some(event.current_time);
                            }
                        }
                    }
                }
                InteractionKind::Ended => {}
            }
            prev = Some(event);
        }

        if let (Some(start), Some(last)) = (open_start, prev) {
            timeline
                .intervals
                .push(PlayedInterval::new(start, last.last_tick_time));
        }

        timeline
    }

    /// Total seconds played across all intervals.
    pub fn played_secs(&self) -> f64 {
        self.intervals.iter().map(PlayedInterval::length).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty() && self.likes.is_empty() && self.seeks.is_empty()
    }
}
