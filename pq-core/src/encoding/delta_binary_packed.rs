//! DELTA_BINARY_PACKED: a header giving the first value and
//! block layout, then a sequence of blocks each holding a zigzag min-delta
//! and `num_miniblocks` flat bit-packed miniblocks of per-value deltas
//! relative to that min-delta. INT32 and INT64 share this format; INT32
//! just narrows the final i64 accumulator.

use crate::basic::PhysicalType;
use crate::error::{fail, Result};
use crate::levels;
use crate::value::TypedArray;

/// Returns the decoded values and the number of bytes consumed, since
/// DELTA_LENGTH_BYTE_ARRAY/DELTA_BYTE_ARRAY read more data immediately
/// after this stream and need exact framing.
pub fn decode_i64(data: &[u8], max_count: Option<usize>) -> Result<(Vec<i64>, usize)> {
    let mut pos = 0usize;
    let block_size = read_uleb(data, &mut pos)? as usize;
    let num_miniblocks = read_uleb(data, &mut pos)? as usize;
    let total_value_count = read_uleb(data, &mut pos)? as usize;
    let first_value = read_zigzag(data, &mut pos)?;

    if num_miniblocks == 0 || block_size % num_miniblocks != 0 {
        return Err(fail!(Malformed, "delta-binary-packed block_size {block_size} not a multiple of num_miniblocks {num_miniblocks}"));
    }
    let miniblock_size = block_size / num_miniblocks;
    if miniblock_size % 8 != 0 {
        return Err(fail!(Malformed, "delta-binary-packed miniblock size {miniblock_size} not a multiple of 8"));
    }

    let want = max_count.unwrap_or(total_value_count).min(total_value_count);
    let mut out = Vec::with_capacity(want);
    if total_value_count > 0 {
        out.push(first_value);
    }
    let mut remaining = total_value_count.saturating_sub(1);
    let mut prev = first_value;

    while remaining > 0 {
        let min_delta = read_zigzag(data, &mut pos)?;
        if pos + num_miniblocks > data.len() {
            return Err(fail!(Truncated, "delta-binary-packed miniblock bit-width array truncated"));
        }
        let widths = data[pos..pos + num_miniblocks].to_vec();
        pos += num_miniblocks;

        for &w in &widths {
            let bit_width = w as u32;
            let unpacked = levels::unpack_bit_packed(&data[pos..], bit_width, miniblock_size)?;
            pos += levels::bytes_consumed_by_bit_packed(bit_width, miniblock_size);
            let take = remaining.min(miniblock_size);
            for &delta in &unpacked[..take] {
                prev = prev
                    .checked_add(delta as i64)
                    .and_then(|v| v.checked_add(min_delta))
                    .ok_or_else(|| fail!(Malformed, "delta-binary-packed value overflowed i64"))?;
                out.push(prev);
            }
            remaining -= take;
        }
    }
    Ok((out, pos))
}

pub fn decode(data: &[u8], physical_type: PhysicalType, count: usize) -> Result<TypedArray> {
    let (values, _) = decode_i64(data, Some(count))?;
    match physical_type {
        PhysicalType::Int32 => {
            let mut out = Vec::with_capacity(values.len());
            for v in values {
                out.push(i32::try_from(v).map_err(|_| fail!(Malformed, "delta value out of i32 range: {v}"))?);
            }
            Ok(TypedArray::Int32(out))
        }
        PhysicalType::Int64 => Ok(TypedArray::Int64(values)),
        other => Err(fail!(TypeMismatch, "DELTA_BINARY_PACKED used on non-integer column ({other:?})")),
    }
}

fn read_uleb(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0;
    loop {
        if *pos >= data.len() {
            return Err(fail!(Truncated, "varint truncated in delta-binary-packed header"));
        }
        let b = data[*pos];
        *pos += 1;
        result |= ((b & 0x7f) as u64) << shift;
        if b & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(fail!(Malformed, "varint too long in delta-binary-packed header"));
        }
    }
}

fn read_zigzag(data: &[u8], pos: &mut usize) -> Result<i64> {
    let u = read_uleb(data, pos)?;
    Ok(((u >> 1) as i64) ^ -((u & 1) as i64))
}
