//! PLAIN encoding: values packed back-to-back in their
//! natural little-endian byte layout, with no framing beyond `BYTE_ARRAY`'s
//! own 4-byte length prefix per value.

use bytes::Bytes;

use crate::basic::PhysicalType;
use crate::error::{fail, Result};
use crate::value::TypedArray;

pub fn decode(data: &[u8], physical_type: PhysicalType, type_length: Option<i32>, count: usize) -> Result<TypedArray> {
    match physical_type {
        PhysicalType::Boolean => Ok(TypedArray::Boolean(decode_booleans(data, count)?)),
        PhysicalType::Int32 => Ok(TypedArray::Int32(decode_fixed(data, count, i32::from_le_bytes)?)),
        PhysicalType::Int64 => Ok(TypedArray::Int64(decode_fixed(data, count, i64::from_le_bytes)?)),
        PhysicalType::Float => Ok(TypedArray::Float(decode_fixed(data, count, f32::from_le_bytes)?)),
        PhysicalType::Double => Ok(TypedArray::Double(decode_fixed(data, count, f64::from_le_bytes)?)),
        PhysicalType::Int96 => Ok(TypedArray::Int96(decode_fixed(data, count, |b: [u8; 12]| b)?)),
        PhysicalType::ByteArray => Ok(TypedArray::ByteArray(decode_byte_arrays(data, count)?)),
        PhysicalType::FixedLenByteArray => {
            let len = type_length
                .ok_or_else(|| fail!(InvalidFormat, "FIXED_LEN_BYTE_ARRAY column missing type_length"))?
                as usize;
            Ok(TypedArray::FixedLenByteArray(decode_fixed_len_byte_arrays(data, count, len)?))
        }
    }
}

fn decode_fixed<T, const N: usize>(data: &[u8], count: usize, from_le: impl Fn([u8; N]) -> T) -> Result<Vec<T>> {
    let needed = N * count;
    if data.len() < needed {
        return Err(fail!(Truncated, "PLAIN fixed-width stream needs {needed} bytes, has {}", data.len()));
    }
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let chunk: [u8; N] = data[i * N..i * N + N].try_into().unwrap();
        out.push(from_le(chunk));
    }
    Ok(out)
}

fn decode_booleans(data: &[u8], count: usize) -> Result<Vec<bool>> {
    let needed_bytes = (count + 7) / 8;
    if data.len() < needed_bytes {
        return Err(fail!(Truncated, "PLAIN boolean stream needs {needed_bytes} bytes, has {}", data.len()));
    }
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let byte = data[i / 8];
        out.push((byte >> (i % 8)) & 1 != 0);
    }
    Ok(out)
}

fn decode_byte_arrays(data: &[u8], count: usize) -> Result<Vec<Bytes>> {
    let mut out = Vec::with_capacity(count);
    let mut pos = 0usize;
    for _ in 0..count {
        if pos + 4 > data.len() {
            return Err(fail!(Truncated, "PLAIN byte array length prefix truncated"));
        }
        let len = u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        if pos + len > data.len() {
            return Err(fail!(Truncated, "PLAIN byte array value truncated"));
        }
        out.push(Bytes::copy_from_slice(&data[pos..pos + len]));
        pos += len;
    }
    Ok(out)
}

fn decode_fixed_len_byte_arrays(data: &[u8], count: usize, len: usize) -> Result<Vec<Bytes>> {
    let needed = len * count;
    if data.len() < needed {
        return Err(fail!(Truncated, "PLAIN fixed-len byte array stream needs {needed} bytes, has {}", data.len()));
    }
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        out.push(Bytes::copy_from_slice(&data[i * len..i * len + len]));
    }
    Ok(out)
}
