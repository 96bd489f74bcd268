//! Per-video aggregate of all recorded sessions.
//!
//! Field names follow the backend's JSON (`playbacks`, `likedPoints`,
//! `myLikes`, ...), so an aggregate can be loaded straight from a
//! backend response or a saved file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::InteractionEvent;
use crate::timeline::{PlayedInterval, SessionTimeline};

/// Everything known about how a video has been watched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    /// Number of interaction sessions recorded for the video.
    #[serde(default)]
    pub num_sessions: usize,

    /// Played intervals, one list per session that played anything.
    #[serde(rename = "playbacks", default)]
    pub playback_sessions: Vec<Vec<PlayedInterval>>,

    /// Like timepoints from all viewers.
    #[serde(default)]
    pub liked_points: Vec<f64>,

    /// Like timepoints from the local viewer.
    #[serde(default)]
    pub my_likes: Vec<f64>,

    /// Detected seek targets, when the backend reports them.
    #[serde(default)]
    pub seeks: Option<Vec<f64>>,

    /// Content-analysis tracks by name.
    #[serde(default)]
    pub mca: BTreeMap<String, McaTrack>,
}

/// Shape of a content-analysis track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McaKind {
    /// Dense weights spread evenly across the video duration.
    Curve,
    /// Discrete timepoints (seconds).
    Point,
}

/// An externally computed content-analysis signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McaTrack {
    #[serde(rename = "type")]
    pub kind: McaKind,
    pub data: Vec<f64>,
    #[serde(default = "default_mca_weight")]
    pub weight: f64,
}

fn default_mca_weight() -> f64 {
    1.0
}

impl McaTrack {
    pub fn curve(data: Vec<f64>, weight: f64) -> Self {
        Self {
            kind: McaKind::Curve,
            data,
            weight,
        }
    }

    pub fn points(data: Vec<f64>, weight: f64) -> Self {
        Self {
            kind: McaKind::Point,
            data,
            weight,
        }
    }
}

impl AggregateResult {
    /// Total number of played intervals across sessions.
    pub fn interval_count(&self) -> usize {
        self.playback_sessions.iter().map(Vec::len).sum()
    }
}

/// Accumulates sessions of one video into an [`AggregateResult`].
#[derive(Debug, Default)]
pub struct AggregateBuilder {
    num_sessions: usize,
    playback_sessions: Vec<Vec<PlayedInterval>>,
    liked_points: Vec<f64>,
    seeks: Vec<f64>,
}

impl AggregateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one session's interactions into the aggregate.
    pub fn add_session(&mut self, interactions: &[InteractionEvent]) -> &mut Self {
        self.add_timeline(SessionTimeline::reconstruct(interactions))
    }

    /// Fold an already reconstructed session into the aggregate.
    pub fn add_timeline(&mut self, timeline: SessionTimeline) -> &mut Self {
        self.num_sessions += 1;
        if !timeline.intervals.is_empty() {
            self.playback_sessions.push(timeline.intervals);
        }
        self.liked_points.extend(timeline.likes);
        self.seeks.extend(timeline.seeks);
        self
    }

    pub fn finish(self, my_likes: Vec<f64>, mca: BTreeMap<String, McaTrack>) -> AggregateResult {
        AggregateResult {
            num_sessions: self.num_sessions,
            playback_sessions: self.playback_sessions,
            liked_points: self.liked_points,
            my_likes,
            seeks: Some(self.seeks),
            mca,
        }
    }
}
