//! Variable-length quantities (VLQ) as used for delta times and lengths.
//!
//! A VLQ stores 7 bits per byte, most significant group first. The high bit
//! of each byte is set when more bytes follow. Standard MIDI Files cap a
//! quantity at four bytes, i.e. 28 bits.

use super::error::{MergeError, MergeResult};
use super::reader::ByteReader;

/// Largest value a four-byte VLQ can hold.
pub const MAX_VALUE: u32 = 0x0FFF_FFFF;

const MAX_BYTES: usize = 4;

/// Decodes a VLQ, consuming `prefix` before reading from `reader`.
///
/// `prefix` holds bytes the caller already pulled off the stream. The
/// returned count includes them, so callers can charge the full encoding
/// against a chunk length.
pub fn decode(reader: &mut ByteReader<'_>, prefix: &[u8]) -> MergeResult<(u32, usize)> {
    let start = reader.position().saturating_sub(prefix.len());
    let mut prefix = prefix.iter().copied();
    let mut value: u32 = 0;
    let mut count = 0;

    loop {
        let byte = match prefix.next() {
            Some(byte) => byte,
            None => reader.read_u8()?,
        };
        count += 1;
        if count > MAX_BYTES {
            return Err(MergeError::InvalidVarLen { position: start });
        }

        value = (value << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok((value, count));
        }
    }
}

/// Appends the minimal encoding of `value` to `buffer`.
///
/// Fails with [`MergeError::InvalidVarLen`] if `value` exceeds
/// [`MAX_VALUE`].
pub fn write(value: u32, buffer: &mut Vec<u8>) -> MergeResult<()> {
    if value > MAX_VALUE {
        return Err(MergeError::InvalidVarLen { position: 0 });
    }

    let mut groups = [0u8; MAX_BYTES];
    let mut len = 0;
    let mut temp = value;
    loop {
        groups[len] = (temp & 0x7F) as u8;
        len += 1;
        temp >>= 7;
        if temp == 0 {
            break;
        }
    }

    // Groups were collected least significant first
    for i in (0..len).rev() {
        if i > 0 {
            buffer.push(groups[i] | 0x80);
        } else {
            buffer.push(groups[i]);
        }
    }
    Ok(())
}

/// Returns the minimal encoding of `value`.
pub fn encode(value: u32) -> MergeResult<Vec<u8>> {
    let mut buffer = Vec::with_capacity(MAX_BYTES);
    write(value, &mut buffer)?;
    Ok(buffer)
}
