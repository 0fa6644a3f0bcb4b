//! PLAIN_DICTIONARY / RLE_DICTIONARY: the page body is a
//! 1-byte bit width followed by a hybrid RLE/bit-packed stream of indices
//! into the column chunk's dictionary page. The dictionary page itself is
//! always PLAIN-encoded.

use crate::error::{fail, Result};
use crate::levels;

/// Decode `count` dictionary indices from a dictionary-encoded data page
/// body (the leading bit-width byte plus the hybrid stream).
pub fn decode_indices(data: &[u8], count: usize) -> Result<Vec<u32>> {
    if data.is_empty() {
        return Err(fail!(Truncated, "dictionary-encoded page missing bit-width byte"));
    }
    let bit_width = data[0] as u32;
    if bit_width > 32 {
        return Err(fail!(Malformed, "dictionary index bit width {bit_width} exceeds 32"));
    }
    // Unlike a def/rep-level stream, a dictionary-encoded data page's index
    // stream has no separate declared byte length to check against -- it
    // simply runs to the end of the (already value-stream-sized) page body
    // -- so the consumed count is informational only here.
    let (indices, _consumed) = levels::decode_hybrid(&data[1..], bit_width, count)?;
    Ok(indices)
}
