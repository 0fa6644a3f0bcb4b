//! C10: compression codecs, kept behind a small trait so the
//! dispatch table is the only place that needs to change if a caller wants
//! to plug in, say, a hardware-accelerated decoder. The default table
//! covers every codec the format defines except LZO, for which no
//! maintained pure-Rust decompressor exists in the ecosystem.

use bytes::Bytes;
use std::io::Read;

use crate::basic::Compression;
use crate::error::{fail, Result};

pub trait CodecProvider: Send + Sync {
    fn decompress(&self, codec: Compression, input: &[u8], expected_output_len: usize) -> Result<Bytes>;
}

pub struct DefaultCodecs;

impl CodecProvider for DefaultCodecs {
    fn decompress(&self, codec: Compression, input: &[u8], expected_output_len: usize) -> Result<Bytes> {
        match codec {
            Compression::Uncompressed => {
                if input.len() != expected_output_len {
                    return Err(fail!(
                        Malformed,
                        "uncompressed page size {} does not match declared {expected_output_len}",
                        input.len()
                    ));
                }
                Ok(Bytes::copy_from_slice(input))
            }
            Compression::Snappy => decompress_snappy(input, expected_output_len),
            Compression::Gzip => decompress_gzip(input, expected_output_len),
            Compression::Brotli => decompress_brotli(input, expected_output_len),
            Compression::Zstd => decompress_zstd(input, expected_output_len),
            Compression::Lz4 => decompress_lz4(input, expected_output_len),
            Compression::Lz4Raw => decompress_lz4_raw(input, expected_output_len),
            Compression::Lzo => Err(fail!(UnsupportedCodec, "LZO")),
        }
    }
}

fn decompress_snappy(input: &[u8], expected_output_len: usize) -> Result<Bytes> {
    let mut out = vec![0u8; expected_output_len];
    let mut decoder = snap::raw::Decoder::new();
    let n = decoder
        .decompress(input, &mut out)
        .map_err(|e| fail!(Malformed, "snappy decompression failed: {e}"))?;
    out.truncate(n);
    Ok(Bytes::from(out))
}

/// A gzip member's trailer does not always cover the whole compressed
/// buffer: some writers emit multiple concatenated gzip members per page.
/// `MultiGzDecoder` reads through however many members are present.
fn decompress_gzip(input: &[u8], expected_output_len: usize) -> Result<Bytes> {
    let mut out = Vec::with_capacity(expected_output_len);
    let mut decoder = flate2::read::MultiGzDecoder::new(input);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| fail!(Malformed, "gzip decompression failed: {e}"))?;
    Ok(Bytes::from(out))
}

fn decompress_brotli(input: &[u8], expected_output_len: usize) -> Result<Bytes> {
    let mut out = Vec::with_capacity(expected_output_len);
    let mut decoder = brotli::Decompressor::new(input, 4096);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| fail!(Malformed, "brotli decompression failed: {e}"))?;
    Ok(Bytes::from(out))
}

fn decompress_zstd(input: &[u8], expected_output_len: usize) -> Result<Bytes> {
    let out = zstd::bulk::decompress(input, expected_output_len.max(1))
        .map_err(|e| fail!(Malformed, "zstd decompression failed: {e}"))?;
    Ok(Bytes::from(out))
}

/// Parquet's LZ4 codec is ambiguous in the wild: some writers (old Hadoop
/// stacks) frame it with block-length headers, others write raw LZ4 frames.
/// Try the raw frame first since it's what modern writers produce, and fall
/// back to the Hadoop-framed layout on failure.
fn decompress_lz4(input: &[u8], expected_output_len: usize) -> Result<Bytes> {
    if let Ok(bytes) = decompress_lz4_raw(input, expected_output_len) {
        return Ok(bytes);
    }
    decompress_lz4_hadoop(input, expected_output_len)
}

fn decompress_lz4_raw(input: &[u8], expected_output_len: usize) -> Result<Bytes> {
    let out = lz4_flex::block::decompress(input, expected_output_len)
        .map_err(|e| fail!(Malformed, "lz4 raw decompression failed: {e}"))?;
    Ok(Bytes::from(out))
}

/// Hadoop's LZ4 framing: a 4-byte big-endian total-uncompressed-length,
/// then repeated (4-byte BE compressed-block-length, 4-byte BE
/// uncompressed-block-length, block bytes) groups.
fn decompress_lz4_hadoop(input: &[u8], expected_output_len: usize) -> Result<Bytes> {
    let mut out = Vec::with_capacity(expected_output_len);
    let mut pos = 0usize;
    if input.len() < 4 {
        return Err(fail!(Truncated, "lz4-hadoop stream missing total length header"));
    }
    pos += 4; // total uncompressed length, redundant with expected_output_len
    while out.len() < expected_output_len {
        if pos + 8 > input.len() {
            return Err(fail!(Truncated, "lz4-hadoop block header truncated"));
        }
        let compressed_len = u32::from_be_bytes(input[pos..pos + 4].try_into().unwrap()) as usize;
        let uncompressed_len = u32::from_be_bytes(input[pos + 4..pos + 8].try_into().unwrap()) as usize;
        pos += 8;
        if pos + compressed_len > input.len() {
            return Err(fail!(Truncated, "lz4-hadoop block body truncated"));
        }
        let block = lz4_flex::block::decompress(&input[pos..pos + compressed_len], uncompressed_len)
            .map_err(|e| fail!(Malformed, "lz4-hadoop block decompression failed: {e}"))?;
        out.extend_from_slice(&block);
        pos += compressed_len;
    }
    Ok(Bytes::from(out))
}
