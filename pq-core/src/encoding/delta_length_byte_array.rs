//! DELTA_LENGTH_BYTE_ARRAY: a DELTA_BINARY_PACKED stream of
//! lengths, immediately followed by the concatenated value bytes with no
//! further per-value framing.

use bytes::Bytes;

use crate::encoding::delta_binary_packed;
use crate::error::{fail, Result};
use crate::value::TypedArray;

pub fn decode(data: &[u8], count: usize) -> Result<TypedArray> {
    let (lengths, consumed) = delta_binary_packed::decode_i64(data, Some(count))?;
    let mut out = Vec::with_capacity(count);
    let mut pos = consumed;
    for len in lengths {
        let len = usize::try_from(len).map_err(|_| fail!(Malformed, "negative byte array length: {len}"))?;
        if pos + len > data.len() {
            return Err(fail!(Truncated, "DELTA_LENGTH_BYTE_ARRAY value truncated"));
        }
        out.push(Bytes::copy_from_slice(&data[pos..pos + len]));
        pos += len;
    }
    Ok(TypedArray::ByteArray(out))
}
