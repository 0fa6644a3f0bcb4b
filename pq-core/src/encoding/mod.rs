//! C4: value decoders, one module per wire encoding, dispatched by
//! `decode_values`. Every decoder takes the page's value bytes
//! (post-decompression, with the definition/repetition level streams
//! already stripped off by `page`) and produces a dense `TypedArray` of
//! exactly `count` values — nullability is handled separately via
//! definition levels, so these decoders never see gaps.

mod byte_stream_split;
mod delta_binary_packed;
mod delta_byte_array;
mod delta_length_byte_array;
mod dictionary;
mod plain;

use crate::basic::{Encoding, PhysicalType};
use crate::error::{fail, Result};
use crate::value::TypedArray;

pub fn decode_values(
    encoding: Encoding,
    data: &[u8],
    physical_type: PhysicalType,
    type_length: Option<i32>,
    count: usize,
    dictionary: Option<&TypedArray>,
) -> Result<TypedArray> {
    match encoding {
        Encoding::Plain => plain::decode(data, physical_type, type_length, count),
        Encoding::PlainDictionary | Encoding::RleDictionary => {
            let dict = dictionary
                .ok_or_else(|| fail!(InvalidFormat, "dictionary-encoded page with no preceding dictionary page"))?;
            let indices = dictionary::decode_indices(data, count)?;
            gather(dict, &indices)
        }
        Encoding::DeltaBinaryPacked => delta_binary_packed::decode(data, physical_type, count),
        Encoding::DeltaLengthByteArray => delta_length_byte_array::decode(data, count),
        Encoding::DeltaByteArray => delta_byte_array::decode(data, count),
        Encoding::ByteStreamSplit => byte_stream_split::decode(data, physical_type, type_length, count),
        Encoding::Rle => Err(fail!(UnsupportedCodec, "bare RLE encoding is not valid for a value stream")),
        Encoding::Unknown(v) => Err(fail!(UnsupportedCodec, "encoding {v}")),
    }
}

/// Decode a dictionary page: always PLAIN-encoded.
pub fn decode_dictionary_page(
    data: &[u8],
    physical_type: PhysicalType,
    type_length: Option<i32>,
    count: usize,
) -> Result<TypedArray> {
    plain::decode(data, physical_type, type_length, count)
}

fn gather(dict: &TypedArray, indices: &[u32]) -> Result<TypedArray> {
    macro_rules! gather_arm {
        ($variant:ident, $values:ident) => {{
            let mut out = Vec::with_capacity(indices.len());
            for &i in indices {
                let v = $values
                    .get(i as usize)
                    .ok_or_else(|| fail!(Malformed, "dictionary index {i} out of range ({} entries)", $values.len()))?;
                out.push(v.clone());
            }
            Ok(TypedArray::$variant(out))
        }};
    }
    match dict {
        TypedArray::Boolean(v) => gather_arm!(Boolean, v),
        TypedArray::Int32(v) => gather_arm!(Int32, v),
        TypedArray::Int64(v) => gather_arm!(Int64, v),
        TypedArray::Int96(v) => gather_arm!(Int96, v),
        TypedArray::Float(v) => gather_arm!(Float, v),
        TypedArray::Double(v) => gather_arm!(Double, v),
        TypedArray::ByteArray(v) => gather_arm!(ByteArray, v),
        TypedArray::FixedLenByteArray(v) => gather_arm!(FixedLenByteArray, v),
    }
}
