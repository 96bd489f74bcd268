//! Interaction event types for the LikeLines telemetry stream.
//!
//! On the wire every interaction is a four-element JSON array
//! `[timestamp, "TYPE", current_time, last_tick_time]`. Buffered or
//! stored streams use JSONL, one interaction per line.

use serde::{Deserialize, Serialize};

/// Kind of playback interaction.
///
/// `Tick` is emitted by a fixed polling timer while a video is loaded;
/// the others mirror player state changes and the like button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionKind {
    Tick,
    Playing,
    Paused,
    Ended,
    Like,
}

impl InteractionKind {
    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Tick => "TICK",
            InteractionKind::Playing => "PLAYING",
            InteractionKind::Paused => "PAUSED",
            InteractionKind::Ended => "ENDED",
            InteractionKind::Like => "LIKE",
        }
    }

    /// Events that must bypass the flush throttle.
    pub fn forces_send(&self) -> bool {
        matches!(self, InteractionKind::Ended | InteractionKind::Like)
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded interaction. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireInteraction", into = "WireInteraction")]
pub struct InteractionEvent {
    /// Wall-clock seconds since the Unix epoch.
    pub timestamp: f64,

    /// What happened.
    pub kind: InteractionKind,

    /// Playhead position (seconds into the video) when it happened.
    pub current_time: f64,

    /// Playhead position at the most recent tick.
    pub last_tick_time: f64,
}

#[derive(Serialize, Deserialize)]
struct WireInteraction(f64, InteractionKind, f64, f64);

impl From<WireInteraction> for InteractionEvent {
    fn from(w: WireInteraction) -> Self {
        Self {
            timestamp: w.0,
            kind: w.1,
            current_time: w.2,
            last_tick_time: w.3,
        }
    }
}

impl From<InteractionEvent> for WireInteraction {
    fn from(e: InteractionEvent) -> Self {
        WireInteraction(e.timestamp, e.kind, e.current_time, e.last_tick_time)
    }
}

impl InteractionEvent {
    pub fn new(
        timestamp: f64,
        kind: InteractionKind,
        current_time: f64,
        last_tick_time: f64,
    ) -> Self {
        Self {
            timestamp,
            kind,
            current_time,
            last_tick_time,
        }
    }

    /// Create a tick; `current_time` doubles as the tick time.
    pub fn tick(timestamp: f64, current_time: f64) -> Self {
        Self::new(timestamp, InteractionKind::Tick, current_time, current_time)
    }

    pub fn is_tick(&self) -> bool {
        self.kind == InteractionKind::Tick
    }

    pub fn is_paused(&self) -> bool {
        self.kind == InteractionKind::Paused
    }

    /// Total order used when replaying a session: timestamp, then kind
    /// name, then playhead positions.
    pub fn replay_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.timestamp
            .total_cmp(&other.timestamp)
            .then_with(|| self.kind.as_str().cmp(other.kind.as_str()))
            .then_with(|| self.current_time.total_cmp(&other.current_time))
            .then_with(|| self.last_tick_time.total_cmp(&other.last_tick_time))
    }
}

/// Parse interactions from JSONL content (one JSON array per line).
///
/// Blank lines and `#` comment lines are skipped.
pub fn parse_interactions(jsonl: &str) -> Result<Vec<InteractionEvent>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Serialize interactions to JSONL format.
pub fn serialize_interactions(events: &[InteractionEvent]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for event in events {
        output.push_str(&serde_json::to_string(event)?);
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_four_tuple() {
        let event = InteractionEvent::new(1_700_000_000.5, InteractionKind::Paused, 12.25, 12.0);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"[1700000000.5,"PAUSED",12.25,12.0]"#);
    }

    #[test]
    fn test_parse_from_backend_tuple() {
        let event: InteractionEvent = serde_json::from_str(r#"[10, "LIKE", 3.5, 3.25]"#).unwrap();
        assert_eq!(event.kind, InteractionKind::Like);
        assert_eq!(event.timestamp, 10.0);
        assert_eq!(event.current_time, 3.5);
        assert_eq!(event.last_tick_time, 3.25);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let parsed = serde_json::from_str::<InteractionEvent>(r#"[10, "BUFFERING", 3.5, 3.25]"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_jsonl_skips_comments_and_blanks() {
        let jsonl = "# {\"video_id\":\"YouTube:abc\"}\n[0,\"PLAYING\",0,0]\n\n[0.25,\"TICK\",0.25,0.25]\n";
        let parsed = parse_interactions(jsonl).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed[1].is_tick());
    }

    #[test]
    fn test_jsonl_roundtrip() {
        let events = vec![
            InteractionEvent::new(1.0, InteractionKind::Playing, 0.0, 0.0),
            InteractionEvent::tick(1.25, 0.25),
            InteractionEvent::new(2.0, InteractionKind::Ended, 1.0, 0.75),
        ];
        let jsonl = serialize_interactions(&events).unwrap();
        assert_eq!(jsonl.lines().count(), 3);
        assert_eq!(parse_interactions(&jsonl).unwrap(), events);
    }

    #[test]
    fn test_forces_send() {
        assert!(InteractionKind::Like.forces_send());
        assert!(InteractionKind::Ended.forces_send());
        assert!(!InteractionKind::Tick.forces_send());
        assert!(!InteractionKind::Paused.forces_send());
    }

    #[test]
    fn test_replay_order_breaks_timestamp_ties_by_kind_name() {
        let paused = InteractionEvent::new(5.0, InteractionKind::Paused, 1.0, 1.0);
        let like = InteractionEvent::new(5.0, InteractionKind::Like, 1.0, 1.0);
        assert_eq!(like.replay_cmp(&paused), std::cmp::Ordering::Less);
    }
}
