//! Hand-built compact-protocol byte fixtures: constructs on-disk layouts
//! byte by byte in test code rather than mocking out a writer this crate
//! doesn't otherwise have any use for.

pub(crate) fn encode_uleb(mut v: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let b = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(b);
            break;
        }
        out.push(b | 0x80);
    }
    out
}

pub(crate) fn encode_zigzag(v: i64) -> Vec<u8> {
    encode_uleb(((v << 1) ^ (v >> 63)) as u64)
}

/// Pack exactly 8 `bit_width`-bit values LSB-first, the inverse of
/// `levels::unpack_group_of_8`. `values.len()` must be a multiple of 8.
pub(crate) fn pack_bitpacked_groups(values: &[u32], bit_width: u32) -> Vec<u8> {
    assert_eq!(values.len() % 8, 0);
    if bit_width == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for group in values.chunks(8) {
        let mut bit_buffer: u64 = 0;
        let mut bits_in_buffer = 0u32;
        let mut bytes = Vec::new();
        for &v in group {
            bit_buffer |= (v as u64) << bits_in_buffer;
            bits_in_buffer += bit_width;
            while bits_in_buffer >= 8 {
                bytes.push((bit_buffer & 0xff) as u8);
                bit_buffer >>= 8;
                bits_in_buffer -= 8;
            }
        }
        if bits_in_buffer > 0 {
            bytes.push((bit_buffer & 0xff) as u8);
        }
        while bytes.len() < bit_width as usize {
            bytes.push(0);
        }
        out.extend(bytes);
    }
    out
}

/// A full hybrid RLE/bit-packed stream (always as one bit-packed run,
/// never RLE) encoding `values` at `bit_width`, for use as a V1
/// definition/repetition level stream or a dictionary-index stream.
pub(crate) fn pack_bitpacked_hybrid(values: &[u32], bit_width: u32) -> Vec<u8> {
    let mut padded = values.to_vec();
    while padded.len() % 8 != 0 {
        padded.push(0);
    }
    let num_groups = padded.len() / 8;
    let mut out = encode_uleb(((num_groups as u64) << 1) | 1);
    out.extend(pack_bitpacked_groups(&padded, bit_width));
    out
}

fn bits_needed(v: u32) -> u32 {
    if v == 0 {
        0
    } else {
        32 - v.leading_zeros()
    }
}

/// Encode up to 9 `i64`s as a single-block, single-miniblock
/// DELTA_BINARY_PACKED stream. Good enough for the small fixtures these
/// tests need; a real writer would split across many blocks.
pub(crate) fn encode_delta_binary_packed(values: &[i64]) -> Vec<u8> {
    assert!(!values.is_empty() && values.len() <= 9);
    let mut out = Vec::new();
    out.extend(encode_uleb(8)); // block_size
    out.extend(encode_uleb(1)); // num_miniblocks
    out.extend(encode_uleb(values.len() as u64)); // total_value_count
    out.extend(encode_zigzag(values[0]));
    if values.len() > 1 {
        let deltas: Vec<i64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let min_delta = *deltas.iter().min().unwrap();
        let adjusted: Vec<u32> = deltas.iter().map(|&d| (d - min_delta) as u32).collect();
        let bit_width = bits_needed(*adjusted.iter().max().unwrap());
        out.extend(encode_zigzag(min_delta));
        out.push(bit_width as u8);
        let mut padded = adjusted;
        while padded.len() % 8 != 0 {
            padded.push(0);
        }
        out.extend(pack_bitpacked_groups(&padded, bit_width));
    }
    out
}

/// Minimal compact-protocol struct writer. Every field is written with an
/// absolute (delta = 0) field id, which the format always permits, so the
/// writer never needs to track the previous field id the way the reader's
/// `FieldNesting` does.
pub(crate) struct CompactWriter {
    buf: Vec<u8>,
}

impl CompactWriter {
    pub fn new() -> Self {
        CompactWriter { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn field_header(&mut self, id: i16, type_tag: u8) {
        self.buf.push(type_tag);
        self.buf.extend(encode_zigzag(id as i64));
    }

    pub fn i32_field(&mut self, id: i16, value: i32) {
        self.field_header(id, 0x05);
        self.buf.extend(encode_zigzag(value as i64));
    }

    pub fn i64_field(&mut self, id: i16, value: i64) {
        self.field_header(id, 0x06);
        self.buf.extend(encode_zigzag(value));
    }

    pub fn string_field(&mut self, id: i16, value: &str) {
        self.field_header(id, 0x08);
        self.buf.extend(encode_uleb(value.len() as u64));
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn struct_field(&mut self, id: i16) {
        self.field_header(id, 0x0C);
    }

    pub fn list_field(&mut self, id: i16, elem_type_tag: u8, size: usize) {
        self.field_header(id, 0x09);
        self.list_header(elem_type_tag, size);
    }

    pub fn list_header(&mut self, elem_type_tag: u8, size: usize) {
        if size < 15 {
            self.buf.push(((size as u8) << 4) | elem_type_tag);
        } else {
            self.buf.push(0xF0 | elem_type_tag);
            self.buf.extend(encode_uleb(size as u64));
        }
    }

    pub fn binary_list_elem(&mut self, value: &str) {
        self.buf.extend(encode_uleb(value.len() as u64));
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn i32_list_elem(&mut self, value: i32) {
        self.buf.extend(encode_zigzag(value as i64));
    }

    pub fn stop(&mut self) {
        self.buf.push(0);
    }
}

/// Build a complete one-column-one-row-group Parquet file: PLAIN-encoded
/// INT32 values in a single V1 data page, uncompressed. `def_levels` is
/// `None` for a REQUIRED column (no level stream at all) or `Some` for an
/// OPTIONAL one (a bit-packed def-level stream precedes the values, and
/// `values` holds only the non-null entries).
fn build_int32_file(def_levels: Option<&[u32]>, values: &[i32]) -> Vec<u8> {
    let num_rows = def_levels.map(|d| d.len()).unwrap_or(values.len()) as i64;

    let mut body = Vec::new();
    if let Some(def_levels) = def_levels {
        let def_stream = pack_bitpacked_hybrid(def_levels, 1);
        body.extend_from_slice(&(def_stream.len() as u32).to_le_bytes());
        body.extend_from_slice(&def_stream);
    }
    for &v in values {
        body.extend_from_slice(&v.to_le_bytes());
    }

    let mut ph = CompactWriter::new();
    ph.i32_field(1, 0); // PageType::DataPage
    ph.i32_field(2, body.len() as i32); // uncompressed_page_size
    ph.i32_field(3, body.len() as i32); // compressed_page_size
    ph.struct_field(5); // DataPageHeaderV1
    ph.i32_field(1, num_rows as i32); // num_values
    ph.i32_field(2, 0); // Encoding::Plain
    ph.stop();
    ph.stop();
    let page_header_bytes = ph.into_bytes();

    const MAGIC_LEN: i64 = 4;
    let data_page_offset = MAGIC_LEN;
    let total_compressed_size = (page_header_bytes.len() + body.len()) as i64;

    let mut fm = CompactWriter::new();
    fm.i32_field(1, 1); // version
    fm.list_field(2, 0x0C, 2); // schema: 2 SchemaElements
    fm.string_field(4, "schema"); // root
    fm.i32_field(5, 1); // num_children
    fm.stop();
    fm.i32_field(1, 1); // PhysicalType::Int32
    fm.i32_field(3, if def_levels.is_some() { 1 } else { 0 }); // repetition
    fm.string_field(4, "value");
    fm.stop();
    fm.i64_field(3, num_rows); // num_rows
    fm.list_field(4, 0x0C, 1); // row_groups
    fm.list_field(1, 0x0C, 1); // columns
    fm.struct_field(3); // meta_data
    fm.i32_field(1, 1); // physical_type
    fm.list_field(2, 0x05, 1);
    fm.i32_list_elem(0); // encodings = [PLAIN]
    fm.list_field(3, 0x08, 1);
    fm.binary_list_elem("value"); // path_in_schema
    fm.i32_field(4, 0); // codec = UNCOMPRESSED
    fm.i64_field(5, num_rows); // num_values
    fm.i64_field(6, total_compressed_size); // total_uncompressed_size
    fm.i64_field(7, total_compressed_size); // total_compressed_size
    fm.i64_field(9, data_page_offset); // data_page_offset
    fm.stop(); // ColumnMetaData
    fm.stop(); // ColumnChunk
    fm.stop(); // RowGroup
    fm.stop(); // FileMetaData
    let footer_bytes = fm.into_bytes();

    let mut file = Vec::new();
    file.extend_from_slice(b"PAR1");
    file.extend_from_slice(&page_header_bytes);
    file.extend_from_slice(&body);
    file.extend_from_slice(&footer_bytes);
    file.extend_from_slice(&(footer_bytes.len() as i32).to_le_bytes());
    file.extend_from_slice(b"PAR1");
    file
}

pub(crate) fn build_required_int32_file(values: &[i32]) -> Vec<u8> {
    build_int32_file(None, values)
}

pub(crate) fn build_optional_int32_file(def_levels: &[u32], values: &[i32]) -> Vec<u8> {
    build_int32_file(Some(def_levels), values)
}

/// Like `build_required_int32_file`, but the column chunk's metadata also
/// carries a `Statistics` struct, to exercise field id 12's passthrough.
pub(crate) fn build_required_int32_file_with_statistics(values: &[i32], null_count: i64, distinct_count: i64) -> Vec<u8> {
    let num_rows = values.len() as i64;

    let mut body = Vec::new();
    for &v in values {
        body.extend_from_slice(&v.to_le_bytes());
    }

    let mut ph = CompactWriter::new();
    ph.i32_field(1, 0);
    ph.i32_field(2, body.len() as i32);
    ph.i32_field(3, body.len() as i32);
    ph.struct_field(5);
    ph.i32_field(1, num_rows as i32);
    ph.i32_field(2, 0);
    ph.stop();
    ph.stop();
    let page_header_bytes = ph.into_bytes();

    const MAGIC_LEN: i64 = 4;
    let data_page_offset = MAGIC_LEN;
    let total_compressed_size = (page_header_bytes.len() + body.len()) as i64;

    let mut fm = CompactWriter::new();
    fm.i32_field(1, 1);
    fm.list_field(2, 0x0C, 2);
    fm.string_field(4, "schema");
    fm.i32_field(5, 1);
    fm.stop();
    fm.i32_field(1, 1);
    fm.i32_field(3, 0);
    fm.string_field(4, "value");
    fm.stop();
    fm.i64_field(3, num_rows);
    fm.list_field(4, 0x0C, 1);
    fm.list_field(1, 0x0C, 1);
    fm.struct_field(3); // meta_data
    fm.i32_field(1, 1);
    fm.list_field(2, 0x05, 1);
    fm.i32_list_elem(0);
    fm.list_field(3, 0x08, 1);
    fm.binary_list_elem("value");
    fm.i32_field(4, 0);
    fm.i64_field(5, num_rows);
    fm.i64_field(6, total_compressed_size);
    fm.i64_field(7, total_compressed_size);
    fm.i64_field(9, data_page_offset);
    fm.struct_field(12); // statistics
    fm.i64_field(3, null_count);
    fm.i64_field(4, distinct_count);
    fm.stop(); // Statistics
    fm.stop(); // ColumnMetaData
    fm.stop(); // ColumnChunk
    fm.stop(); // RowGroup
    fm.stop(); // FileMetaData
    let footer_bytes = fm.into_bytes();

    let mut file = Vec::new();
    file.extend_from_slice(b"PAR1");
    file.extend_from_slice(&page_header_bytes);
    file.extend_from_slice(&body);
    file.extend_from_slice(&footer_bytes);
    file.extend_from_slice(&(footer_bytes.len() as i32).to_le_bytes());
    file.extend_from_slice(b"PAR1");
    file
}
