use bytes::Bytes;

use crate::basic::{Compression, PhysicalType};
use crate::codec::{CodecProvider, DefaultCodecs};
use crate::encoding::{decode_dictionary_page, decode_values};
use crate::levels::decode_hybrid;
use crate::value::TypedArray;

use super::fixtures;

#[test]
fn test_plain_int32_round_trip() {
    let data: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
    let decoded = decode_values(crate::basic::Encoding::Plain, &data, PhysicalType::Int32, None, 3, None).unwrap();
    match decoded {
        TypedArray::Int32(v) => assert_eq!(v, vec![1, 2, 3]),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_rle_run_of_definition_levels() {
    // header=(5<<1)|0=10, run length 5, value 1, bit_width 1: five
    // consecutive non-null slots for an OPTIONAL column.
    let data = [10u8, 1];
    let (levels, consumed) = decode_hybrid(&data, 1, 5).unwrap();
    assert_eq!(levels, vec![1, 1, 1, 1, 1]);
    assert_eq!(consumed, data.len());
}

#[test]
fn test_bit_packed_run_of_definition_levels() {
    let levels = fixtures::pack_bitpacked_hybrid(&[1, 0, 1, 1, 0, 1, 1, 1], 1);
    let (decoded, consumed) = decode_hybrid(&levels, 1, 8).unwrap();
    assert_eq!(decoded, vec![1, 0, 1, 1, 0, 1, 1, 1]);
    assert_eq!(consumed, levels.len());
}

#[test]
fn test_delta_binary_packed_monotone_int32() {
    let data = fixtures::encode_delta_binary_packed(&[7, 9, 12, 16]);
    let decoded = crate::encoding::decode_values(crate::basic::Encoding::DeltaBinaryPacked, &data, PhysicalType::Int32, None, 4, None).unwrap();
    match decoded {
        TypedArray::Int32(v) => assert_eq!(v, vec![7, 9, 12, 16]),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_delta_byte_array_shares_prefixes() {
    let prefix_lengths = fixtures::encode_delta_binary_packed(&[0, 1, 2]);
    let suffix_lengths = fixtures::encode_delta_binary_packed(&[2, 1, 1]);
    let mut data = prefix_lengths;
    data.extend(suffix_lengths);
    data.extend_from_slice(b"aabc"); // "aa" + "b" + "c"

    let decoded = crate::encoding::decode_values(crate::basic::Encoding::DeltaByteArray, &data, PhysicalType::ByteArray, None, 3, None).unwrap();
    match decoded {
        TypedArray::ByteArray(v) => {
            let strs: Vec<&[u8]> = v.iter().map(|b| b.as_ref()).collect();
            assert_eq!(strs, vec![b"aa".as_slice(), b"ab".as_slice(), b"abc".as_slice()]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_delta_length_byte_array() {
    let lengths = fixtures::encode_delta_binary_packed(&[3, 3]);
    let mut data = lengths;
    data.extend_from_slice(b"foobar");
    let decoded = crate::encoding::decode_values(crate::basic::Encoding::DeltaLengthByteArray, &data, PhysicalType::ByteArray, None, 2, None).unwrap();
    match decoded {
        TypedArray::ByteArray(v) => {
            assert_eq!(v[0].as_ref(), b"foo");
            assert_eq!(v[1].as_ref(), b"bar");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_byte_stream_split_int32() {
    // Two values, 1 and 2, each stored little-endian then transposed
    // byte-plane-wise: plane0=[01,02], plane1..3=[00,00].
    let data = [0x01u8, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    let decoded = decode_values(crate::basic::Encoding::ByteStreamSplit, &data, PhysicalType::Int32, None, 2, None).unwrap();
    match decoded {
        TypedArray::Int32(v) => assert_eq!(v, vec![1, 2]),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_dictionary_indices_gather_through_hybrid_stream() {
    let dict_page = {
        let mut d = Vec::new();
        for v in [100i32, 200, 300] {
            d.extend_from_slice(&v.to_le_bytes());
        }
        d
    };
    let dict = decode_dictionary_page(&dict_page, PhysicalType::Int32, None, 3).unwrap();

    let mut data = vec![2u8]; // bit_width byte
    data.extend(fixtures::pack_bitpacked_hybrid(&[0, 1, 2, 0], 2));

    let decoded = decode_values(crate::basic::Encoding::PlainDictionary, &data, PhysicalType::Int32, None, 4, Some(&dict)).unwrap();
    match decoded {
        TypedArray::Int32(v) => assert_eq!(v, vec![100, 200, 300, 100]),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_dictionary_encoding_without_preceding_dictionary_page_is_error() {
    let data = vec![1u8, 0];
    let result = decode_values(crate::basic::Encoding::PlainDictionary, &data, PhysicalType::Int32, None, 1, None);
    assert!(result.is_err());
}

#[test]
fn test_concatenated_gzip_members_decompress_fully() {
    // Two back-to-back gzip members ("hello " and "world!"), the layout
    // some writers produce for a single page; MultiGzDecoder must read
    // through both rather than stopping after the first member's trailer.
    let combined: [u8; 52] = [
        0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0xff, 0xcb, 0x48, 0xcd, 0xc9, 0xc9, 0x57, 0x00, 0x00,
        0xf6, 0xf9, 0x81, 0xed, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0xff,
        0x2b, 0xcf, 0x2f, 0xca, 0x49, 0x51, 0x04, 0x00, 0xe8, 0x98, 0x84, 0x71, 0x06, 0x00, 0x00, 0x00,
    ];
    let out = DefaultCodecs.decompress(Compression::Gzip, &combined, 12).unwrap();
    assert_eq!(out, Bytes::from_static(b"hello world!"));
}
