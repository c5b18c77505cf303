//! Standard MIDI File (SMF) parsing.
//!
//! Reads a format 1 file into one flat list of [`RawEvent`]s, tagging each
//! with its absolute tick time and a scan-order sequence number.
//!
//! # Filtering
//!
//! Structural meta-events are dropped while parsing:
//! - only the first track name in the whole file is kept
//! - every instrument name is dropped
//! - every end-of-track is dropped (the encoder writes a fresh one)
//!
//! Everything else, tempo and time signature included, passes through as-is.

use super::error::{MergeError, MergeResult};
use super::event::{
    channel_data_len, is_system_status, EventKind, RawEvent, META_END_OF_TRACK,
    META_INSTRUMENT_NAME, META_TRACK_NAME, STATUS_META,
};
use super::reader::ByteReader;
use super::vlq;

pub const HEADER_MARKER: &[u8; 4] = b"MThd";
pub const TRACK_MARKER: &[u8; 4] = b"MTrk";

/// Length of the `MThd` chunk body.
pub const HEADER_LEN: u32 = 6;

/// Format of a multi-track file with simultaneous tracks.
pub const FORMAT_PARALLEL: u16 = 1;

/// Fields of the `MThd` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub format: u16,
    pub track_count: u16,
    /// Ticks per quarter note or SMPTE timing, copied through untouched.
    pub division: u16,
}

/// Counters gathered while parsing, reported after a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub events_parsed: u64,
    pub events_kept: u64,
    pub track_names_dropped: u64,
    pub instrument_names_dropped: u64,
    pub end_of_tracks_dropped: u64,
}

/// Result of parsing a whole file.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub header: FileHeader,
    /// Kept events of all tracks, in scan order.
    pub events: Vec<RawEvent>,
    /// Latest absolute time seen in any track, dropped events included.
    pub max_time: u64,
    pub stats: ParseStats,
}

/// Reads the header chunk.
///
/// Anything before the `MThd` marker is skipped, so files wrapped in a
/// container (such as RIFF `RMID`) are accepted.
pub fn read_header(reader: &mut ByteReader<'_>) -> MergeResult<FileHeader> {
    reader.read_until_marker(HEADER_MARKER)?;

    let len = reader.read_u32_be()?;
    if len != HEADER_LEN {
        return Err(MergeError::UnsupportedFormat(format!(
            "header chunk length is {len}, expected {HEADER_LEN}"
        )));
    }

    let header = FileHeader {
        format: reader.read_u16_be()?,
        track_count: reader.read_u16_be()?,
        division: reader.read_u16_be()?,
    };

    if header.format != FORMAT_PARALLEL {
        return Err(MergeError::UnsupportedFormat(format!(
            "MIDI format {} (only format 1 can be merged)",
            header.format
        )));
    }

    Ok(header)
}

/// State shared by all tracks of one file.
#[derive(Debug, Default)]
struct ParseContext {
    next_sequence: u64,
    have_track_name: bool,
    max_time: u64,
    events: Vec<RawEvent>,
    stats: ParseStats,
}

impl ParseContext {
    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    fn observe_time(&mut self, time: u64) {
        self.max_time = self.max_time.max(time);
    }

    /// Applies the meta-event filter and stores the event if it survives.
    fn accept(&mut self, event: RawEvent) {
        self.stats.events_parsed += 1;

        if let EventKind::Meta(meta_type) = event.kind() {
            match meta_type {
                META_TRACK_NAME if self.have_track_name => {
                    self.stats.track_names_dropped += 1;
                    return;
                }
                META_TRACK_NAME => self.have_track_name = true,
                META_INSTRUMENT_NAME => {
                    self.stats.instrument_names_dropped += 1;
                    return;
                }
                META_END_OF_TRACK => {
                    self.stats.end_of_tracks_dropped += 1;
                    return;
                }
                _ => {}
            }
        }

        self.stats.events_kept += 1;
        self.events.push(event);
    }
}

/// Per-track decoding state.
#[derive(Debug)]
struct TrackParser {
    index: u16,
    declared: u32,
    consumed: u64,
    /// Last explicit status byte. Data bytes at the start of a track
    /// resolve to Note Off on channel 1.
    running_status: u8,
    absolute_time: u64,
}

impl TrackParser {
    fn new(index: u16, declared: u32) -> Self {
        Self {
            index,
            declared,
            consumed: 0,
            running_status: 0x80,
            absolute_time: 0,
        }
    }

    fn is_complete(&self) -> bool {
        self.consumed == u64::from(self.declared)
    }

    /// Counts `len` more bytes against the chunk length.
    ///
    /// With `more_follow`, the event is not finished yet, so landing exactly
    /// on the chunk end is already an overrun.
    fn charge(&mut self, len: usize, more_follow: bool) -> MergeResult<()> {
        self.consumed += len as u64;
        let declared = u64::from(self.declared);
        if self.consumed > declared || (more_follow && self.consumed == declared) {
            return Err(MergeError::TruncatedTrack {
                track: self.index,
                declared: self.declared,
                consumed: self.consumed,
            });
        }
        Ok(())
    }

    fn read_payload<'a>(&mut self, reader: &mut ByteReader<'a>, len: u32) -> MergeResult<&'a [u8]> {
        self.charge(len as usize, false)?;
        reader.read_exact(len as usize)
    }

    /// Decodes one delta-time and event.
    fn parse_event(
        &mut self,
        reader: &mut ByteReader<'_>,
        ctx: &mut ParseContext,
    ) -> MergeResult<()> {
        let (delta, delta_len) = vlq::decode(reader, &[])?;
        self.charge(delta_len, true)?;
        self.absolute_time += u64::from(delta);
        ctx.observe_time(self.absolute_time);

        // An explicit status byte is always followed by at least one data byte
        let first = reader.read_u8()?;
        let explicit = first & 0x80 != 0;
        self.charge(1, explicit)?;
        let (status, first_param) = if explicit {
            self.running_status = first;
            let param = reader.read_u8()?;
            self.charge(1, false)?;
            (first, param)
        } else {
            (self.running_status, first)
        };

        let (params, payload): (Vec<u8>, &[u8]) = match status {
            STATUS_META => {
                let (len, len_bytes) = vlq::decode(reader, &[])?;
                self.charge(len_bytes, false)?;
                let payload = self.read_payload(reader, len)?;
                let mut params = vec![first_param];
                vlq::write(len, &mut params)?;
                (params, payload)
            }
            status if is_system_status(status) => {
                // The first length byte was taken as a parameter above
                let (len, len_bytes) = vlq::decode(reader, &[first_param])?;
                self.charge(len_bytes - 1, false)?;
                let payload = self.read_payload(reader, len)?;
                (vlq::encode(len)?, payload)
            }
            _ => {
                let mut params = vec![first_param];
                if channel_data_len(status) == 2 {
                    params.push(reader.read_u8()?);
                    self.charge(1, false)?;
                }
                (params, &[])
            }
        };

        let event = RawEvent {
            absolute_time: self.absolute_time,
            sequence: ctx.next_sequence(),
            status,
            params,
            payload: payload.to_vec(),
        };
        ctx.accept(event);
        Ok(())
    }
}

/// Parses one `MTrk` chunk, appending its kept events to `ctx`.
fn parse_track(
    reader: &mut ByteReader<'_>,
    index: u16,
    ctx: &mut ParseContext,
) -> MergeResult<()> {
    let marker = reader.read_exact(TRACK_MARKER.len())?;
    if marker != TRACK_MARKER {
        return Err(MergeError::UnsupportedFormat(format!(
            "track {index} does not start with an MTrk marker"
        )));
    }
    let declared = reader.read_u32_be()?;

    let mut track = TrackParser::new(index, declared);
    let kept_before = ctx.events.len();
    while !track.is_complete() {
        track.parse_event(reader, ctx)?;
    }

    tracing::debug!(
        "Parsed track {}: {} bytes, {} events kept, ends at tick {}",
        index,
        declared,
        ctx.events.len() - kept_before,
        track.absolute_time
    );
    Ok(())
}

/// Parses a complete format 1 file.
///
/// Tracks are scanned strictly in file order, so sequence numbers of track 0
/// all precede those of track 1, and so on.
pub fn parse_file(data: &[u8]) -> MergeResult<ParsedFile> {
    let mut reader = ByteReader::new(data);
    let header = read_header(&mut reader)?;

    let mut ctx = ParseContext::default();
    for index in 0..header.track_count {
        parse_track(&mut reader, index, &mut ctx)?;
    }

    Ok(ParsedFile {
        header,
        events: ctx.events,
        max_time: ctx.max_time,
        stats: ctx.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(format: u16, tracks: u16) -> Vec<u8> {
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&format.to_be_bytes());
        bytes.extend_from_slice(&tracks.to_be_bytes());
        bytes.extend_from_slice(&480u16.to_be_bytes());
        bytes
    }

    fn track(body: &[u8]) -> Vec<u8> {
        let mut bytes = b"MTrk".to_vec();
        bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    fn file(tracks: &[&[u8]]) -> Vec<u8> {
        let mut bytes = header(1, tracks.len() as u16);
        for body in tracks {
            bytes.extend(track(body));
        }
        bytes
    }

    #[test]
    fn test_header_formats() {
        for format in [0u16, 2] {
            let bytes = header(format, 0);
            let result = read_header(&mut ByteReader::new(&bytes));
            assert!(matches!(result, Err(MergeError::UnsupportedFormat(_))));
        }

        let bytes = header(1, 3);
        let parsed = read_header(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(
            parsed,
            FileHeader {
                format: 1,
                track_count: 3,
                division: 480
            }
        );
    }

    #[test]
    fn test_header_length_must_be_six() {
        let mut bytes = header(1, 0);
        bytes[7] = 8;
        let result = read_header(&mut ByteReader::new(&bytes));
        assert!(matches!(result, Err(MergeError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_header_after_leading_junk() {
        let mut bytes = b"RIFF\x00\x00MT".to_vec();
        bytes.extend(header(1, 0));
        let parsed = parse_file(&bytes).unwrap();
        assert_eq!(parsed.header.division, 480);
        assert!(parsed.events.is_empty());
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            parse_file(b"not a midi file"),
            Err(MergeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_bad_track_marker() {
        let mut bytes = header(1, 1);
        bytes.extend_from_slice(b"MTrx\x00\x00\x00\x04\x00\xFF\x2F\x00");
        assert!(matches!(
            parse_file(&bytes),
            Err(MergeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_running_status_resolution() {
        // Note On, then a second Note On with the status elided, then a
        // Program Change with a single data byte
        let bytes = file(&[&[
            0x00, 0x90, 60, 100, //
            0x10, 64, 100, //
            0x00, 0xC0, 5, //
            0x00, 0xFF, 0x2F, 0x00,
        ]]);
        let parsed = parse_file(&bytes).unwrap();

        let summary: Vec<_> = parsed
            .events
            .iter()
            .map(|e| (e.absolute_time, e.status, e.params.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, 0x90, vec![60, 100]),
                (16, 0x90, vec![64, 100]),
                (16, 0xC0, vec![5]),
            ]
        );
    }

    #[test]
    fn test_running_status_defaults_to_note_off() {
        let bytes = file(&[&[0x00, 60, 0]]);
        let parsed = parse_file(&bytes).unwrap();
        assert_eq!(parsed.events[0].status, 0x80);
        assert_eq!(parsed.events[0].params, vec![60, 0]);
    }

    #[test]
    fn test_meta_and_sysex_layout() {
        let bytes = file(&[&[
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo
            0x00, 0xF0, 0x03, 0x7E, 0x7F, 0xF7, // sysex
            0x00, 0xFF, 0x2F, 0x00,
        ]]);
        let parsed = parse_file(&bytes).unwrap();
        assert_eq!(parsed.events.len(), 2);

        let tempo = &parsed.events[0];
        assert_eq!(tempo.status, 0xFF);
        assert_eq!(tempo.params, vec![0x51, 0x03]);
        assert_eq!(tempo.payload, vec![0x07, 0xA1, 0x20]);

        let sysex = &parsed.events[1];
        assert_eq!(sysex.status, 0xF0);
        assert_eq!(sysex.params, vec![0x03]);
        assert_eq!(sysex.payload, vec![0x7E, 0x7F, 0xF7]);
    }

    #[test]
    fn test_other_system_status_is_length_prefixed() {
        let bytes = file(&[&[
            0x00, 0xF2, 0x02, 0xAA, 0xBB, //
            0x00, 0xFF, 0x2F, 0x00,
        ]]);
        let parsed = parse_file(&bytes).unwrap();

        assert_eq!(parsed.events.len(), 1);
        let event = &parsed.events[0];
        assert_eq!(event.status, 0xF2);
        assert_eq!(event.params, vec![0x02]);
        assert_eq!(event.payload, vec![0xAA, 0xBB]);
        assert_eq!(parsed.max_time, 0);
    }

    #[test]
    fn test_non_minimal_lengths_are_normalised() {
        let bytes = file(&[&[
            0x00, 0xFF, 0x01, 0x80, 0x02, b'h', b'i', //
            0x00, 0xF7, 0x80, 0x01, 0x42,
        ]]);
        let parsed = parse_file(&bytes).unwrap();
        assert_eq!(parsed.events[0].params, vec![0x01, 0x02]);
        assert_eq!(parsed.events[1].params, vec![0x01]);
        assert_eq!(parsed.events[1].payload, vec![0x42]);
    }

    #[test]
    fn test_track_name_kept_once_across_tracks() {
        let bytes = file(&[
            &[0x00, 0xFF, 0x03, 0x01, b'A', 0x00, 0xFF, 0x2F, 0x00],
            &[0x00, 0xFF, 0x03, 0x01, b'B', 0x00, 0xFF, 0x2F, 0x00],
        ]);
        let parsed = parse_file(&bytes).unwrap();
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].payload, b"A".to_vec());
        assert_eq!(parsed.stats.track_names_dropped, 1);
        assert_eq!(parsed.stats.end_of_tracks_dropped, 2);
    }

    #[test]
    fn test_instrument_name_dropped() {
        let bytes = file(&[&[0x00, 0xFF, 0x04, 0x01, b'P', 0x00, 0xFF, 0x2F, 0x00]]);
        let parsed = parse_file(&bytes).unwrap();
        assert!(parsed.events.is_empty());
        assert_eq!(parsed.stats.instrument_names_dropped, 1);
    }

    #[test]
    fn test_sequence_numbers_follow_scan_order() {
        let bytes = file(&[
            &[0x00, 0x90, 60, 100, 0x00, 0xFF, 0x2F, 0x00],
            &[0x00, 0x91, 62, 100, 0x00, 0xFF, 0x2F, 0x00],
        ]);
        let parsed = parse_file(&bytes).unwrap();
        let sequences: Vec<_> = parsed.events.iter().map(|e| e.sequence).collect();
        // Dropped end-of-track events still consume a number
        assert_eq!(sequences, vec![0, 2]);
        assert_eq!(parsed.stats.events_parsed, 4);
        assert_eq!(parsed.stats.events_kept, 2);
    }

    #[test]
    fn test_max_time_includes_dropped_events() {
        let bytes = file(&[
            &[0x00, 0x90, 60, 100, 0x83, 0x60, 0xFF, 0x2F, 0x00],
            &[0x10, 0x91, 62, 100, 0x00, 0xFF, 0x2F, 0x00],
        ]);
        let parsed = parse_file(&bytes).unwrap();
        assert_eq!(parsed.max_time, 480);
    }

    #[test]
    fn test_event_overrunning_chunk_is_truncated() {
        // Declared length stops in the middle of a Note On
        let mut bytes = header(1, 1);
        bytes.extend_from_slice(b"MTrk\x00\x00\x00\x03\x00\x90\x3C\x64");
        assert!(matches!(
            parse_file(&bytes),
            Err(MergeError::TruncatedTrack {
                track: 0,
                declared: 3,
                consumed: 4
            })
        ));
    }

    #[test]
    fn test_chunk_ending_after_delta_is_truncated() {
        let mut bytes = header(1, 1);
        bytes.extend_from_slice(b"MTrk\x00\x00\x00\x01\x00\x90\x3C\x64");
        assert!(matches!(
            parse_file(&bytes),
            Err(MergeError::TruncatedTrack { .. })
        ));
    }

    #[test]
    fn test_payload_past_end_of_file() {
        let mut bytes = header(1, 1);
        bytes.extend_from_slice(b"MTrk\x00\x00\x00\x10\x00\xFF\x01\x0A\x41");
        assert!(matches!(
            parse_file(&bytes),
            Err(MergeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_missing_track() {
        let bytes = header(1, 2);
        assert!(matches!(
            parse_file(&bytes),
            Err(MergeError::UnexpectedEof { .. })
        ));
    }
}
