//! Merging of multi-track Standard MIDI Files.
//!
//! The pipeline reads a format 1 file, flattens the events of every track
//! onto one timeline, and writes the result as a format 0 file:
//!
//! 1. [`midi_import`] parses the header and each `MTrk` chunk, resolving
//!    running status and dropping duplicate structural meta-events.
//! 2. [`merge`] orders all kept events by absolute time and scan order.
//! 3. [`midi_export`] re-encodes the timeline with running status and a
//!    single end-of-track marker.

pub mod error;
pub mod event;
pub mod merge;
pub mod midi_export;
pub mod midi_import;
pub mod reader;
pub mod vlq;

pub use error::{MergeError, MergeResult};
pub use event::{EventKind, RawEvent};
pub use merge::{merge, MergedTrack};
pub use midi_export::write_smf;
pub use midi_import::{parse_file, FileHeader, ParseStats, ParsedFile};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// What a merge did, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    /// Number of tracks in the input.
    pub tracks: u16,
    /// Division copied to the output.
    pub division: u16,
    /// Events written, not counting the final end-of-track.
    pub events_written: u64,
    /// Tick of the final end-of-track.
    pub end_time: u64,
    pub stats: ParseStats,
}

/// A parsed and merged file, ready to be written.
struct PreparedMerge {
    division: u16,
    track: MergedTrack,
    summary: MergeSummary,
}

impl PreparedMerge {
    fn new(input: &[u8]) -> MergeResult<Self> {
        let parsed = parse_file(input)?;
        let summary = MergeSummary {
            tracks: parsed.header.track_count,
            division: parsed.header.division,
            events_written: parsed.stats.events_kept,
            end_time: parsed.max_time,
            stats: parsed.stats,
        };
        Ok(Self {
            division: parsed.header.division,
            track: merge(parsed.events, parsed.max_time),
            summary,
        })
    }

    fn write_to<W: Write>(self, writer: &mut W) -> MergeResult<MergeSummary> {
        write_smf(writer, self.division, &self.track)?;

        let summary = self.summary;
        tracing::info!(
            "Merged {} tracks into {} events ending at tick {} ({} track names, {} instrument names, {} end-of-track markers dropped)",
            summary.tracks,
            summary.events_written,
            summary.end_time,
            summary.stats.track_names_dropped,
            summary.stats.instrument_names_dropped,
            summary.stats.end_of_tracks_dropped
        );
        Ok(summary)
    }
}

/// Merges an in-memory format 1 file, returning the format 0 bytes.
pub fn merge_bytes(input: &[u8]) -> MergeResult<(Vec<u8>, MergeSummary)> {
    let prepared = PreparedMerge::new(input)?;
    let mut output = Vec::new();
    let summary = prepared.write_to(&mut output)?;
    Ok((output, summary))
}

/// Merges the file at `input` and writes the result to `output`.
///
/// The input is parsed completely before the output is created. A failure
/// while writing can leave a partial output file behind.
pub fn merge_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
) -> MergeResult<MergeSummary> {
    let input = input.as_ref();
    let data = fs::read(input).map_err(|source| MergeError::Io {
        path: input.to_path_buf(),
        source,
    })?;

    let prepared = PreparedMerge::new(&data)?;
    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    prepared.write_to(&mut writer)
}
