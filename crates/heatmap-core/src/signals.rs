//! Derive composer inputs from a per-video aggregate.

use std::collections::BTreeMap;

use likelines_interaction_model::aggregate::{AggregateResult, McaKind, McaTrack};
use likelines_interaction_model::timeline::PlayedInterval;

use crate::composer::SignalSet;
use crate::resample::resample;

/// Options for turning an aggregate into signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalOptions {
    /// Only the first `n` playback sessions feed the histogram.
    pub session_limit: Option<usize>,
    /// Whether liked points become the likes signal.
    pub include_likes: bool,
}

impl Default for SignalOptions {
    fn default() -> Self {
        Self {
            session_limit: None,
            include_likes: true,
        }
    }
}

/// Number of whole-second bins covering `duration`.
fn second_bins(duration: f64) -> usize {
    if duration > 0.0 && duration.is_finite() {
        duration.ceil() as usize
    } else {
        0
    }
}

/// Per-second count of how many played intervals covered each second.
///
/// Each interval `(start, end)` increments every second from
/// `floor(start)` through `floor(end)` that lies in `[0, duration)`.
pub fn playback_histogram(
    sessions: &[Vec<PlayedInterval>],
    duration: f64,
    limit: Option<usize>,
) -> Vec<f64> {
    let bins = second_bins(duration);
    let mut histogram = vec![0.0; bins];
    if bins == 0 {
        return histogram;
    }

    let take = limit.unwrap_or(sessions.len());
    for interval in sessions.iter().take(take).flatten() {
        if !(interval.start.is_finite() && interval.end.is_finite()) {
            continue;
        }
        let first = interval.start.floor().max(0.0);
        let last = interval.end.floor().min((bins - 1) as f64);
        if first > last {
            continue;
        }
        for s in first as usize..=last as usize {
            histogram[s] += 1.0;
        }
    }
    histogram
}

/// Weighted per-second sum of content-analysis tracks.
///
/// `None` when there are no tracks.
pub fn mca_signal(tracks: &BTreeMap<String, McaTrack>, duration: f64) -> Option<Vec<f64>> {
    if tracks.is_empty() {
        return None;
    }
    let bins = second_bins(duration);
    let mut out = vec![0.0; bins];
    if bins == 0 {
        return Some(out);
    }

    for (name, track) in tracks {
        let values = match track.kind {
            McaKind::Curve => resample(&track.data, bins),
            McaKind::Point => {
                let mut hits = vec![0.0; bins];
                for t in &track.data {
                    if *t >= 0.0 && *t < duration {
                        hits[(t.floor() as usize).min(bins - 1)] += 1.0;
                    }
                }
                hits
            }
        };
        for (acc, v) in out.iter_mut().zip(values) {
            *acc += v * track.weight;
        }
        tracing::trace!(track = %name, kind = ?track.kind, "MCA track folded");
    }
    Some(out)
}

/// Build the composer's signal set from an aggregate.
pub fn signals_from_aggregate(
    aggregate: &AggregateResult,
    duration: f64,
    options: SignalOptions,
) -> SignalSet {
    let likes = options
        .include_likes
        .then(|| aggregate.liked_points.clone());
    let playback = Some(playback_histogram(
        &aggregate.playback_sessions,
        duration,
        options.session_limit,
    ));

    SignalSet {
        likes,
        playback,
        seeks: aggregate.seeks.clone(),
        mca: mca_signal(&aggregate.mca, duration),
    }
}
