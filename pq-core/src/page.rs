//! C6: page header framing and the page-scanning walk over a column
//! chunk's byte range.

use bytes::Bytes;

use crate::basic::{Encoding, PageType};
use crate::codec::CodecProvider;
use crate::compact::{CompactReader, CompactType, FieldNesting};
use crate::error::{fail, Result};
use crate::ioutil::ByteRegion;
use crate::metadata::ColumnMetaData;

#[derive(Debug, Clone)]
pub struct DataPageHeaderV1 {
    pub num_values: i32,
    pub encoding: Encoding,
}

#[derive(Debug, Clone)]
pub struct DictionaryPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
}

#[derive(Debug, Clone)]
pub struct DataPageHeaderV2 {
    pub num_values: i32,
    pub num_nulls: i32,
    pub num_rows: i32,
    pub encoding: Encoding,
    pub def_levels_byte_length: i32,
    pub rep_levels_byte_length: i32,
    pub is_compressed: bool,
}

#[derive(Debug, Clone)]
pub enum PageHeaderData {
    Data(DataPageHeaderV1),
    Dictionary(DictionaryPageHeader),
    DataV2(DataPageHeaderV2),
    Index,
}

#[derive(Debug, Clone)]
pub struct PageHeader {
    pub page_type: PageType,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub data: PageHeaderData,
}

/// A page located within a column chunk, with its header already decoded
/// but its body left unread (decompression/decoding happens lazily in
/// `column`/`record` once a page is actually needed).
#[derive(Debug, Clone)]
pub struct PageInfo {
    pub header: PageHeader,
    /// Absolute file offset where the (possibly compressed) page body
    /// begins, immediately after the header.
    pub body_offset: u64,
}

pub fn parse_page_header(buf: &[u8]) -> Result<(PageHeader, usize)> {
    let mut rd = CompactReader::new(buf);
    let mut nesting = FieldNesting::new();

    let mut page_type = None;
    let mut uncompressed_page_size = None;
    let mut compressed_page_size = None;
    let mut data = None;

    while let Some(field) = rd.read_field_header(&mut nesting)? {
        match field.id {
            1 => page_type = Some(PageType::from_i32(require_i32(&mut rd)?)?),
            2 => uncompressed_page_size = Some(require_i32(&mut rd)?),
            3 => compressed_page_size = Some(require_i32(&mut rd)?),
            5 => data = Some(PageHeaderData::Data(parse_data_page_header_v1(&mut rd, &mut nesting)?)),
            6 => {
                skip_struct(&mut rd, &mut nesting)?;
                data = Some(PageHeaderData::Index);
            }
            7 => data = Some(PageHeaderData::Dictionary(parse_dictionary_page_header(&mut rd, &mut nesting)?)),
            8 => data = Some(PageHeaderData::DataV2(parse_data_page_header_v2(&mut rd, &mut nesting)?)),
            _ => rd.skip_value(field.ty)?,
        }
    }

    let header = PageHeader {
        page_type: page_type.ok_or_else(|| fail!(InvalidFormat, "PageHeader missing type"))?,
        uncompressed_page_size: uncompressed_page_size
            .ok_or_else(|| fail!(InvalidFormat, "PageHeader missing uncompressed_page_size"))?,
        compressed_page_size: compressed_page_size
            .ok_or_else(|| fail!(InvalidFormat, "PageHeader missing compressed_page_size"))?,
        data: data.ok_or_else(|| fail!(InvalidFormat, "PageHeader missing type-specific header"))?,
    };
    Ok((header, rd.pos()))
}

fn parse_data_page_header_v1(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<DataPageHeaderV1> {
    nesting.enter();
    let mut num_values = None;
    let mut encoding = None;
    while let Some(field) = rd.read_field_header(nesting)? {
        match field.id {
            1 => num_values = Some(require_i32(rd)?),
            2 => encoding = Some(Encoding::from_i32_strict(require_i32(rd)?)?),
            _ => rd.skip_value(field.ty)?,
        }
    }
    nesting.leave();
    Ok(DataPageHeaderV1 {
        num_values: num_values.ok_or_else(|| fail!(InvalidFormat, "DataPageHeader missing num_values"))?,
        encoding: encoding.ok_or_else(|| fail!(InvalidFormat, "DataPageHeader missing encoding"))?,
    })
}

fn parse_dictionary_page_header(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<DictionaryPageHeader> {
    nesting.enter();
    let mut num_values = None;
    let mut encoding = None;
    while let Some(field) = rd.read_field_header(nesting)? {
        match field.id {
            1 => num_values = Some(require_i32(rd)?),
            2 => encoding = Some(Encoding::from_i32_strict(require_i32(rd)?)?),
            _ => rd.skip_value(field.ty)?,
        }
    }
    nesting.leave();
    Ok(DictionaryPageHeader {
        num_values: num_values.ok_or_else(|| fail!(InvalidFormat, "DictionaryPageHeader missing num_values"))?,
        encoding: encoding.ok_or_else(|| fail!(InvalidFormat, "DictionaryPageHeader missing encoding"))?,
    })
}

fn parse_data_page_header_v2(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<DataPageHeaderV2> {
    nesting.enter();
    let mut num_values = None;
    let mut num_nulls = None;
    let mut num_rows = None;
    let mut encoding = None;
    let mut def_levels_byte_length = None;
    let mut rep_levels_byte_length = None;
    let mut is_compressed = true; // default per parquet.thrift
    while let Some(field) = rd.read_field_header(nesting)? {
        match field.id {
            1 => num_values = Some(require_i32(rd)?),
            2 => num_nulls = Some(require_i32(rd)?),
            3 => num_rows = Some(require_i32(rd)?),
            4 => encoding = Some(Encoding::from_i32_strict(require_i32(rd)?)?),
            5 => def_levels_byte_length = Some(require_i32(rd)?),
            6 => rep_levels_byte_length = Some(require_i32(rd)?),
            7 => is_compressed = field.inline_bool.ok_or_else(|| fail!(Malformed, "is_compressed not inline bool"))?,
            _ => rd.skip_value(field.ty)?,
        }
    }
    nesting.leave();
    Ok(DataPageHeaderV2 {
        num_values: num_values.ok_or_else(|| fail!(InvalidFormat, "DataPageHeaderV2 missing num_values"))?,
        num_nulls: num_nulls.ok_or_else(|| fail!(InvalidFormat, "DataPageHeaderV2 missing num_nulls"))?,
        num_rows: num_rows.ok_or_else(|| fail!(InvalidFormat, "DataPageHeaderV2 missing num_rows"))?,
        encoding: encoding.ok_or_else(|| fail!(InvalidFormat, "DataPageHeaderV2 missing encoding"))?,
        def_levels_byte_length: def_levels_byte_length
            .ok_or_else(|| fail!(InvalidFormat, "DataPageHeaderV2 missing definition_levels_byte_length"))?,
        rep_levels_byte_length: rep_levels_byte_length
            .ok_or_else(|| fail!(InvalidFormat, "DataPageHeaderV2 missing repetition_levels_byte_length"))?,
        is_compressed,
    })
}

fn skip_struct(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<()> {
    nesting.enter();
    while let Some(field) = rd.read_field_header(nesting)? {
        rd.skip_value(field.ty)?;
    }
    nesting.leave();
    Ok(())
}

fn require_i32(rd: &mut CompactReader) -> Result<i32> {
    rd.read_zigzag_i32()
}

/// Walk a column chunk's byte range, decoding just the page headers, until
/// enough data-page `num_values` have been accounted for to cover
/// `chunk.num_values`. At most one dictionary page is permitted.
pub fn scan_pages(region: &dyn ByteRegion, chunk: &ColumnMetaData) -> Result<Vec<PageInfo>> {
    let chunk_start = chunk.dictionary_page_offset.unwrap_or(chunk.data_page_offset) as u64;
    let chunk_end = chunk_start + chunk.total_compressed_size as u64;

    let mut pages = Vec::new();
    let mut cursor = chunk_start;
    let mut seen_values: i64 = 0;
    let mut seen_dictionary = false;

    const LOOKAHEAD: u64 = 1 << 14;
    while cursor < chunk_end && seen_values < chunk.num_values {
        let probe_end = (cursor + LOOKAHEAD).min(chunk_end);
        let probe = region.read_range(cursor..probe_end)?;
        let (header, header_len) = match parse_page_header(&probe) {
            Ok(v) => v,
            Err(_) if probe.len() < (chunk_end - cursor) as usize => {
                // Header didn't fit in the lookahead window; retry with the
                // whole remainder of the chunk.
                let probe = region.read_range(cursor..chunk_end)?;
                parse_page_header(&probe)?
            }
            Err(e) => return Err(e),
        };

        if matches!(header.data, PageHeaderData::Dictionary(_)) {
            if seen_dictionary {
                return Err(fail!(Malformed, "column chunk has more than one dictionary page"));
            }
            seen_dictionary = true;
        }
        if let PageHeaderData::Data(ref d) = header.data {
            seen_values += d.num_values as i64;
        }
        if let PageHeaderData::DataV2(ref d) = header.data {
            seen_values += d.num_values as i64;
        }

        let body_offset = cursor + header_len as u64;
        let body_end = body_offset + header.compressed_page_size as u64;
        if body_end > chunk_end {
            return Err(fail!(Truncated, "page body extends past column chunk end"));
        }
        pages.push(PageInfo { header, body_offset });
        cursor = body_end;
    }

    if seen_values < chunk.num_values {
        return Err(fail!(
            Truncated,
            "column chunk pages covered {seen_values} of {} declared values",
            chunk.num_values
        ));
    }
    Ok(pages)
}

/// The result of decoding one page's body: the raw (uncompressed)
/// definition/repetition level streams, and the raw value stream ready to
/// hand to `encoding::decode_values`.
pub struct DecodedPageBody {
    pub rep_levels: Bytes,
    pub def_levels: Bytes,
    pub values: Bytes,
}

pub fn read_page_body(
    region: &dyn ByteRegion,
    codecs: &dyn CodecProvider,
    codec: crate::basic::Compression,
    page: &PageInfo,
    max_rep_level: u16,
    max_def_level: u16,
) -> Result<DecodedPageBody> {
    let body = region.read_range(page.body_offset..page.body_offset + page.header.compressed_page_size as u64)?;
    match &page.header.data {
        PageHeaderData::Data(_) => {
            let uncompressed = codecs.decompress(codec, &body, page.header.uncompressed_page_size as usize)?;
            let mut pos = 0usize;
            let rep_levels = if max_rep_level > 0 {
                read_v1_level_stream(&uncompressed, &mut pos)?
            } else {
                Bytes::new()
            };
            let def_levels = if max_def_level > 0 {
                read_v1_level_stream(&uncompressed, &mut pos)?
            } else {
                Bytes::new()
            };
            let values = uncompressed.slice(pos..);
            Ok(DecodedPageBody { rep_levels, def_levels, values })
        }
        PageHeaderData::DataV2(v2) => {
            let rep_len = v2.rep_levels_byte_length as usize;
            let def_len = v2.def_levels_byte_length as usize;
            if rep_len + def_len > body.len() {
                return Err(fail!(Truncated, "DataPageV2 level streams exceed page body size"));
            }
            let rep_levels = body.slice(0..rep_len);
            let def_levels = body.slice(rep_len..rep_len + def_len);
            let values_region = body.slice(rep_len + def_len..);
            let expected_values_len = page.header.uncompressed_page_size as usize - rep_len - def_len;
            let values = if v2.is_compressed {
                codecs.decompress(codec, &values_region, expected_values_len)?
            } else {
                values_region
            };
            Ok(DecodedPageBody { rep_levels, def_levels, values })
        }
        PageHeaderData::Dictionary(_) => {
            let uncompressed = codecs.decompress(codec, &body, page.header.uncompressed_page_size as usize)?;
            Ok(DecodedPageBody { rep_levels: Bytes::new(), def_levels: Bytes::new(), values: uncompressed })
        }
        PageHeaderData::Index => Err(fail!(UnsupportedCodec, "index pages are not read by this reader")),
    }
}

fn read_v1_level_stream(data: &Bytes, pos: &mut usize) -> Result<Bytes> {
    if *pos + 4 > data.len() {
        return Err(fail!(Truncated, "v1 level stream length prefix truncated"));
    }
    let len = u32::from_le_bytes(data[*pos..*pos + 4].try_into().unwrap()) as usize;
    *pos += 4;
    if *pos + len > data.len() {
        return Err(fail!(Truncated, "v1 level stream body truncated"));
    }
    let out = data.slice(*pos..*pos + len);
    *pos += len;
    Ok(out)
}
