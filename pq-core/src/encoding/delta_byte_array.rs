//! DELTA_BYTE_ARRAY: like DELTA_LENGTH_BYTE_ARRAY but each
//! value additionally shares a prefix with its predecessor — two
//! DELTA_BINARY_PACKED streams (prefix lengths, then suffix lengths)
//! followed by the concatenated suffix bytes. Typical of sorted or
//! near-sorted string columns.

use bytes::{Bytes, BytesMut};

use crate::encoding::delta_binary_packed;
use crate::error::{fail, Result};
use crate::value::TypedArray;

pub fn decode(data: &[u8], count: usize) -> Result<TypedArray> {
    let (prefix_lengths, after_prefix) = delta_binary_packed::decode_i64(data, Some(count))?;
    let (suffix_lengths, after_suffix) = delta_binary_packed::decode_i64(&data[after_prefix..], Some(count))?;
    if prefix_lengths.len() != suffix_lengths.len() {
        return Err(fail!(Malformed, "DELTA_BYTE_ARRAY prefix/suffix length count mismatch"));
    }

    let mut pos = after_prefix + after_suffix;
    let mut out: Vec<Bytes> = Vec::with_capacity(count);
    let mut prev: Bytes = Bytes::new();
    for (&prefix_len, &suffix_len) in prefix_lengths.iter().zip(suffix_lengths.iter()) {
        let prefix_len = usize::try_from(prefix_len).map_err(|_| fail!(Malformed, "negative prefix length"))?;
        let suffix_len = usize::try_from(suffix_len).map_err(|_| fail!(Malformed, "negative suffix length"))?;
        if prefix_len > prev.len() {
            return Err(fail!(Malformed, "DELTA_BYTE_ARRAY prefix length {prefix_len} exceeds previous value length {}", prev.len()));
        }
        if pos + suffix_len > data.len() {
            return Err(fail!(Truncated, "DELTA_BYTE_ARRAY suffix bytes truncated"));
        }
        let mut buf = BytesMut::with_capacity(prefix_len + suffix_len);
        buf.extend_from_slice(&prev[..prefix_len]);
        buf.extend_from_slice(&data[pos..pos + suffix_len]);
        pos += suffix_len;
        let value = buf.freeze();
        out.push(value.clone());
        prev = value;
    }
    Ok(TypedArray::ByteArray(out))
}
