//! Interleaves the events of all tracks into one timeline.

use super::event::RawEvent;

/// Events of every input track in output order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedTrack {
    /// Sorted by `(absolute_time, sequence)`.
    pub events: Vec<RawEvent>,
    /// Length of the longest input track in ticks. The end-of-track marker
    /// is placed here even if no kept event reaches it.
    pub end_time: u64,
}

impl MergedTrack {
    /// Time of the last kept event, or 0 for an empty track.
    pub fn last_event_time(&self) -> u64 {
        self.events.last().map_or(0, |e| e.absolute_time)
    }
}

/// Orders events by absolute time, breaking ties by scan order.
///
/// Sequence numbers are unique, so the order is total and events from
/// earlier tracks come first at equal times.
pub fn merge(mut events: Vec<RawEvent>, max_time: u64) -> MergedTrack {
    events.sort_by_key(RawEvent::order_key);
    MergedTrack {
        events,
        end_time: max_time,
    }
}
