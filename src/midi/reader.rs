//! Sequential byte access over an in-memory MIDI file.

use super::error::{MergeError, MergeResult};

/// Cursor over a byte slice.
///
/// Every read either returns the full amount requested or fails with
/// [`MergeError::UnexpectedEof`], leaving the cursor where it was.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current offset from the start of the input.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Reads exactly `len` bytes.
    pub fn read_exact(&mut self, len: usize) -> MergeResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(MergeError::UnexpectedEof {
                position: self.position,
            });
        }
        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> MergeResult<u8> {
        Ok(self.read_exact(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> MergeResult<u16> {
        let bytes = self.read_exact(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32_be(&mut self) -> MergeResult<u32> {
        let bytes = self.read_exact(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Scans forward until `marker` has been consumed.
    ///
    /// The cursor ends immediately after the first occurrence of `marker`.
    /// Matching keeps track of how many marker bytes have matched so far and
    /// falls back through the marker's own prefixes on a mismatch, so every
    /// input byte is looked at once and nothing is re-read.
    ///
    /// Fails with [`MergeError::UnexpectedEof`] if the input ends first.
    pub fn read_until_marker(&mut self, marker: &[u8]) -> MergeResult<()> {
        if marker.is_empty() {
            return Ok(());
        }

        let fallback = prefix_table(marker);
        let start = self.position;
        let mut matched = 0;

        while matched < marker.len() {
            let Some(&byte) = self.data.get(self.position) else {
                self.position = start;
                return Err(MergeError::UnexpectedEof { position: start });
            };
            self.position += 1;

            while matched > 0 && marker[matched] != byte {
                matched = fallback[matched - 1];
            }
            if marker[matched] == byte {
                matched += 1;
            }
        }

        Ok(())
    }
}

/// For each prefix length `i + 1` of `marker`, the length of the longest
/// proper prefix that is also a suffix.
fn prefix_table(marker: &[u8]) -> Vec<usize> {
    let mut table = vec![0; marker.len()];
    let mut len = 0;
    for i in 1..marker.len() {
        while len > 0 && marker[i] != marker[len] {
            len = table[len - 1];
        }
        if marker[i] == marker[len] {
            len += 1;
        }
        table[i] = len;
    }
    table
}
