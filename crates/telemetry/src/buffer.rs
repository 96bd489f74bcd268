//! Session interaction buffer and compaction.
//!
//! Playback emits a `TICK` about four times a second and some player
//! transitions repeat `PAUSED`, so the buffer is compacted before every
//! transmission:
//!
//! 1. **Tick collapsing:** each maximal run of consecutive `TICK`s is
//!    reduced to its last tick.
//! 2. **Pause collapsing:** a `PAUSED` whose neighbours (after pass 1)
//!    are both `PAUSED` is dropped. The first and last elements are
//!    never dropped by this pass.
//!
//! Only interior redundant samples go; run boundaries survive so the
//! backend can still rebuild play/pause/seek intervals.

use likelines_interaction_model::event::{InteractionEvent, InteractionKind};

/// Compact a sequence of interactions. Idempotent.
pub fn compact(events: &[InteractionEvent]) -> Vec<InteractionEvent> {
    let collapsed = collapse_ticks(events);
    collapse_pauses(&collapsed)
}

fn collapse_ticks(events: &[InteractionEvent]) -> Vec<InteractionEvent> {
    events
        .iter()
        .enumerate()
        .filter(|(i, event)| {
            !event.is_tick() || events.get(i + 1).map_or(true, |next| !next.is_tick())
        })
        .map(|(_, event)| *event)
        .collect()
}

fn collapse_pauses(events: &[InteractionEvent]) -> Vec<InteractionEvent> {
    let n = events.len();
    events
        .iter()
        .enumerate()
        .filter(|(i, event)| {
            let i = *i;
            if !event.is_paused() || i == 0 || i + 1 == n {
                return true;
            }
            !(events[i - 1].is_paused() && events[i + 1].is_paused())
        })
        .map(|(_, event)| *event)
        .collect()
}

/// Ordered interactions waiting to be sent for one session.
#[derive(Debug, Clone, Default)]
pub struct InteractionBuffer {
    events: Vec<InteractionEvent>,
}

impl InteractionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interaction.
    pub fn record(&mut self, event: InteractionEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[InteractionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Compact in place and return the number of events removed.
    pub fn compact_in_place(&mut self) -> usize {
        let before = self.events.len();
        self.events = compact(&self.events);
        before - self.events.len()
    }

    /// Drop the first `count` events after the backend acknowledged them.
    ///
    /// Events recorded after the acknowledged batch are kept.
    pub fn acknowledge(&mut self, count: usize) {
        let count = count.min(self.events.len());
        self.events.drain(..count);
    }

    /// Discard everything.
    pub fn clear(&mut self) -> usize {
        let dropped = self.events.len();
        self.events.clear();
        dropped
    }
}

impl Extend<InteractionEvent> for InteractionBuffer {
    fn extend<T: IntoIterator<Item = InteractionEvent>>(&mut self, iter: T) {
        self.events.extend(iter);
    }
}

/// Count of events per kind, for logging.
pub fn kind_counts(events: &[InteractionEvent]) -> [(InteractionKind, usize); 5] {
    let mut counts = [
        (InteractionKind::Tick, 0),
        (InteractionKind::Playing, 0),
        (InteractionKind::Paused, 0),
        (InteractionKind::Ended, 0),
        (InteractionKind::Like, 0),
    ];
    for event in events {
        if let Some(slot) = counts.iter_mut().find(|(k, _)| *k == event.kind) {
            slot.1 += 1;
        }
    }
    counts
}
