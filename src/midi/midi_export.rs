//! Standard MIDI File (SMF) export of a merged track.
//!
//! # Format Details
//!
//! Always writes SMF Format 0 with a single `MTrk` chunk:
//! - Division is copied from the input header
//! - Repeated channel status bytes are left out (running status)
//! - One end-of-track meta-event closes the track
//!
//! The track body is built in memory first so its length is known before
//! anything is written, and the output is produced in one forward pass.

use super::error::{MergeError, MergeResult};
use super::event::{META_END_OF_TRACK, STATUS_META};
use super::merge::MergedTrack;
use super::midi_import::{HEADER_LEN, HEADER_MARKER, TRACK_MARKER};
use super::vlq;
use std::io::Write;

/// Format of a single-track file.
pub const FORMAT_SINGLE_TRACK: u16 = 0;

/// Writes a delta time, rejecting gaps too long for a VLQ.
fn write_delta(delta: u64, buffer: &mut Vec<u8>) -> MergeResult<()> {
    let delta = u32::try_from(delta).map_err(|_| MergeError::InvalidVarLen { position: 0 })?;
    vlq::write(delta, buffer)
}

/// Builds the track chunk body from merged events.
///
/// Delta times are taken from consecutive absolute times. A channel
/// message whose status matches the last status written omits it; meta
/// and sysex events always write theirs.
pub fn build_track_data(track: &MergedTrack) -> MergeResult<Vec<u8>> {
    let mut buffer = Vec::new();

    // 0x00 never matches a real status byte
    let mut last_status = 0x00u8;
    let mut last_time = 0u64;

    for event in &track.events {
        write_delta(event.absolute_time - last_time, &mut buffer)?;
        last_time = event.absolute_time;

        if !(event.allows_running_status() && event.status == last_status) {
            buffer.push(event.status);
            last_status = event.status;
        }
        buffer.extend_from_slice(&event.params);
        buffer.extend_from_slice(&event.payload);
    }

    // End of track: FF 2F 00
    write_delta(track.end_time.saturating_sub(track.last_event_time()), &mut buffer)?;
    buffer.extend_from_slice(&[STATUS_META, META_END_OF_TRACK, 0x00]);

    Ok(buffer)
}

/// Writes the header chunk of a single-track file.
fn write_header<W: Write>(writer: &mut W, division: u16) -> std::io::Result<()> {
    writer.write_all(HEADER_MARKER)?;
    writer.write_all(&HEADER_LEN.to_be_bytes())?;
    writer.write_all(&FORMAT_SINGLE_TRACK.to_be_bytes())?;
    writer.write_all(&1u16.to_be_bytes())?; // One track
    writer.write_all(&division.to_be_bytes())?;
    Ok(())
}

/// Writes a track chunk to the output.
fn write_track_chunk<W: Write>(writer: &mut W, track_data: &[u8]) -> MergeResult<()> {
    let length = u32::try_from(track_data.len())
        .map_err(|_| MergeError::UnsupportedFormat("merged track exceeds 4 GiB".to_string()))?;
    writer.write_all(TRACK_MARKER)?;
    writer.write_all(&length.to_be_bytes())?;
    writer.write_all(track_data)?;
    Ok(())
}

/// Writes a complete format 0 file for `track`.
///
/// # Errors
///
/// Returns [`MergeError::WriteFailure`] if the writer fails or accepts
/// fewer bytes than requested.
pub fn write_smf<W: Write>(writer: &mut W, division: u16, track: &MergedTrack) -> MergeResult<()> {
    let track_data = build_track_data(track)?;
    write_header(writer, division)?;
    write_track_chunk(writer, &track_data)?;
    writer.flush()?;
    Ok(())
}
