//! Errors produced while merging a Standard MIDI File.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, merging, or writing a MIDI file.
///
/// No error is recovered from locally: the first failure aborts the merge
/// and is handed back to the caller unchanged.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A mandatory read ran past the end of the input, including a marker
    /// search that exhausted the stream.
    #[error("unexpected end of file at byte {position}")]
    UnexpectedEof {
        /// Offset where the short read started.
        position: usize,
    },

    /// The header is not a format 1 file, or a chunk marker did not match.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A track's byte accounting overshot its declared chunk length.
    #[error("track {track} is truncated: declared {declared} bytes, events need {consumed}")]
    TruncatedTrack {
        /// Zero-based index of the offending track.
        track: u16,
        /// Length stored in the `MTrk` chunk header.
        declared: u32,
        /// Bytes the parsed events claim.
        consumed: u64,
    },

    /// A variable-length quantity is longer than four bytes or too large
    /// to encode.
    #[error("invalid variable-length quantity at byte {position}")]
    InvalidVarLen {
        /// Offset of the first byte of the quantity (0 when encoding).
        position: usize,
    },

    /// The input file could not be read.
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the output failed or transferred fewer bytes than requested.
    #[error("failed to write output")]
    WriteFailure(#[from] std::io::Error),
}

/// Result type used throughout the merge pipeline.
pub type MergeResult<T> = Result<T, MergeError>;
