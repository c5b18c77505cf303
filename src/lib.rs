//! midimerge - Flattens a multi-track MIDI file into a single track.
//!
//! This library provides the parser, merge engine, and encoder used by the
//! `midimerge` command-line tool.

pub mod midi;

// Re-export commonly used types
pub use midi::{merge_bytes, merge_file, MergeError, MergeResult, MergeSummary};
