//! Track events as read from the input file.

/// Meta-event type for a sequence/track name.
pub const META_TRACK_NAME: u8 = 0x03;
/// Meta-event type for an instrument name.
pub const META_INSTRUMENT_NAME: u8 = 0x04;
/// Meta-event type marking the end of a track.
pub const META_END_OF_TRACK: u8 = 0x2F;

/// Status byte of a meta-event.
pub const STATUS_META: u8 = 0xFF;

/// Event category, derived from the status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Channel voice message (status 0x80-0xEF).
    Channel,
    /// System exclusive, escape, or any other system status (0xF0-0xFE).
    /// All carry a length-prefixed payload.
    SysEx,
    /// Meta-event with its type byte.
    Meta(u8),
}

/// A single event with its position in the merged timeline.
///
/// `params` holds the fixed leading bytes for the event's category:
/// one or two data bytes for channel messages, the type byte plus the
/// encoded length for meta-events, the encoded length for sysex. The
/// encoder can therefore write `status + params + payload` without
/// looking at the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Ticks since the start of the source track.
    pub absolute_time: u64,
    /// Global scan order, used only to break ties between equal times.
    pub sequence: u64,
    /// Resolved status byte, explicit even when the source used running status.
    pub status: u8,
    pub params: Vec<u8>,
    pub payload: Vec<u8>,
}

impl RawEvent {
    pub fn kind(&self) -> EventKind {
        match self.status {
            STATUS_META => EventKind::Meta(self.params.first().copied().unwrap_or_default()),
            status if is_system_status(status) => EventKind::SysEx,
            _ => EventKind::Channel,
        }
    }

    /// Whether the status byte may be left out when it repeats.
    ///
    /// Only channel messages take part in running status; meta and sysex
    /// events always carry their status byte.
    pub fn allows_running_status(&self) -> bool {
        self.status & 0xF0 != 0xF0
    }

    /// Sort key giving the merged order.
    pub fn order_key(&self) -> (u64, u64) {
        (self.absolute_time, self.sequence)
    }
}

/// Whether `status` is a system status other than meta (0xF0-0xFE).
///
/// These are read like system exclusive: a VLQ length, then the payload.
pub fn is_system_status(status: u8) -> bool {
    status != STATUS_META && status & 0xF0 == 0xF0
}

/// Number of data bytes a channel message with this status carries.
///
/// Program Change (0xC_) and Channel Pressure (0xD_) take one, every other
/// channel message takes two.
pub fn channel_data_len(status: u8) -> usize {
    match status >> 4 {
        0xC | 0xD => 1,
        _ => 2,
    }
}
