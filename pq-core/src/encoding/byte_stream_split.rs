//! BYTE_STREAM_SPLIT: values are transposed byte-plane-wise —
//! all values' byte 0, then all values' byte 1, and so on — rather than
//! stored value-by-value. Reconstructing a value means gathering its Nth
//! byte from each of the N planes.

use bytes::Bytes;

use crate::basic::PhysicalType;
use crate::error::{fail, Result};
use crate::value::TypedArray;

pub fn decode(data: &[u8], physical_type: PhysicalType, type_length: Option<i32>, count: usize) -> Result<TypedArray> {
    match physical_type {
        PhysicalType::Int32 => Ok(TypedArray::Int32(decode_fixed(data, count, 4, |b: &[u8]| {
            i32::from_le_bytes(b.try_into().unwrap())
        })?)),
        PhysicalType::Int64 => Ok(TypedArray::Int64(decode_fixed(data, count, 8, |b: &[u8]| {
            i64::from_le_bytes(b.try_into().unwrap())
        })?)),
        PhysicalType::Float => Ok(TypedArray::Float(decode_fixed(data, count, 4, |b: &[u8]| {
            f32::from_le_bytes(b.try_into().unwrap())
        })?)),
        PhysicalType::Double => Ok(TypedArray::Double(decode_fixed(data, count, 8, |b: &[u8]| {
            f64::from_le_bytes(b.try_into().unwrap())
        })?)),
        PhysicalType::FixedLenByteArray => {
            let width = type_length
                .ok_or_else(|| fail!(InvalidFormat, "FIXED_LEN_BYTE_ARRAY column missing type_length"))?
                as usize;
            Ok(TypedArray::FixedLenByteArray(decode_bytes(data, count, width)?))
        }
        other => Err(fail!(TypeMismatch, "BYTE_STREAM_SPLIT is not valid for {other:?}")),
    }
}

fn transpose(data: &[u8], count: usize, width: usize) -> Result<Vec<u8>> {
    let needed = count * width;
    if data.len() < needed {
        return Err(fail!(Truncated, "BYTE_STREAM_SPLIT stream needs {needed} bytes, has {}", data.len()));
    }
    let mut out = vec![0u8; needed];
    for value_idx in 0..count {
        for plane in 0..width {
            out[value_idx * width + plane] = data[plane * count + value_idx];
        }
    }
    Ok(out)
}

fn decode_fixed<T>(data: &[u8], count: usize, width: usize, from_le: impl Fn(&[u8]) -> T) -> Result<Vec<T>> {
    let transposed = transpose(data, count, width)?;
    Ok((0..count).map(|i| from_le(&transposed[i * width..i * width + width])).collect())
}

fn decode_bytes(data: &[u8], count: usize, width: usize) -> Result<Vec<Bytes>> {
    let transposed = transpose(data, count, width)?;
    Ok((0..count).map(|i| Bytes::copy_from_slice(&transposed[i * width..i * width + width])).collect())
}
