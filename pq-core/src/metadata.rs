//! C2: decode the file footer into the schema tree's raw preorder listing,
//! the row-group list, and column-chunk descriptors.

use crate::basic::{Compression, ConvertedType, Encoding, LogicalType, PhysicalType, Repetition, TimeUnit};
use crate::compact::{require_i32, CompactReader, CompactType, FieldNesting};
use crate::error::{fail, Result};
use crate::ioutil::ByteRegion;

pub const MAGIC: &[u8; 4] = b"PAR1";

#[derive(Debug, Clone)]
pub struct SchemaElementRaw {
    pub physical_type: Option<PhysicalType>,
    pub type_length: Option<i32>,
    pub repetition: Option<Repetition>,
    pub name: String,
    pub num_children: Option<i32>,
    pub converted_type: Option<ConvertedType>,
    pub scale: Option<i32>,
    pub precision: Option<i32>,
    pub field_id: Option<i32>,
    pub logical_type: Option<LogicalType>,
}

/// Passed through uninterpreted: pruning decisions that would consume these
/// are left to the caller, but decoding and exposing the raw stats costs
/// nothing and every real reader does it. `min`/`max` are the legacy
/// unsigned-byte-ordered fields;
/// `min_value`/`max_value` are their signed-aware replacements.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub max: Option<Vec<u8>>,
    pub min: Option<Vec<u8>>,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub max_value: Option<Vec<u8>>,
    pub min_value: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct ColumnMetaData {
    pub physical_type: PhysicalType,
    pub encodings: Vec<Encoding>,
    pub path_in_schema: Vec<String>,
    pub codec: Compression,
    pub num_values: i64,
    pub total_uncompressed_size: i64,
    pub total_compressed_size: i64,
    pub data_page_offset: i64,
    pub dictionary_page_offset: Option<i64>,
    pub statistics: Option<Statistics>,
}

#[derive(Debug, Clone)]
pub struct ColumnChunkRaw {
    pub meta_data: ColumnMetaData,
}

#[derive(Debug, Clone)]
pub struct RowGroupRaw {
    pub columns: Vec<ColumnChunkRaw>,
    pub total_byte_size: i64,
    pub num_rows: i64,
}

#[derive(Debug, Clone, Default)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FileMetaData {
    pub version: i32,
    pub schema: Vec<SchemaElementRaw>,
    pub num_rows: i64,
    pub row_groups: Vec<RowGroupRaw>,
    pub key_value_metadata: Vec<KeyValue>,
    pub created_by: Option<String>,
}

/// Locate, read, and parse the footer: magic at both ends, a little-endian
/// length immediately before the closing magic, and `length` bytes of
/// compact-protocol `FileMetaData` ending right before that length field.
pub fn read_footer(region: &dyn ByteRegion) -> Result<FileMetaData> {
    let file_len = region.len();
    if file_len < 8 {
        return Err(fail!(InvalidFormat, "file too small to contain a footer: {file_len} bytes"));
    }
    let head = region.read_range(0..4)?;
    if &head[..] != MAGIC {
        return Err(fail!(InvalidFormat, "missing opening PAR1 magic"));
    }
    let tail = region.read_range(file_len - 8..file_len)?;
    if &tail[4..8] != MAGIC {
        return Err(fail!(InvalidFormat, "missing closing PAR1 magic"));
    }
    let footer_length = i32::from_le_bytes(tail[0..4].try_into().unwrap());
    if footer_length < 0 {
        return Err(fail!(InvalidFormat, "negative footer length: {footer_length}"));
    }
    let footer_length = footer_length as u64;
    // The footer must fit strictly between the opening magic and the
    // trailing (length, magic) pair.
    if footer_length > file_len - 8 - 4 {
        return Err(fail!(
            InvalidFormat,
            "footer length {footer_length} too large for file of {file_len} bytes"
        ));
    }
    let footer_start = file_len - 8 - footer_length;
    let footer_bytes = region.read_range(footer_start..file_len - 8)?;
    tracing::debug!(target: "pq_core", footer_length, footer_start, "parsed footer location");
    parse_file_metadata(&footer_bytes)
}

pub fn parse_file_metadata(buf: &[u8]) -> Result<FileMetaData> {
    let mut rd = CompactReader::new(buf);
    let mut nesting = FieldNesting::new();

    let mut version = None;
    let mut schema = None;
    let mut num_rows = None;
    let mut row_groups = None;
    let mut key_value_metadata = Vec::new();
    let mut created_by = None;

    while let Some(field) = rd.read_field_header(&mut nesting)? {
        match field.id {
            1 => version = Some(expect_i32(&mut rd, field.ty, "FileMetaData.version")?),
            2 => schema = Some(parse_schema_list(&mut rd, &mut nesting)?),
            3 => num_rows = Some(expect_i64(&mut rd, field.ty, "FileMetaData.num_rows")?),
            4 => row_groups = Some(parse_row_group_list(&mut rd, &mut nesting)?),
            5 => key_value_metadata = parse_key_value_list(&mut rd, &mut nesting)?,
            6 => created_by = Some(expect_string(&mut rd, field.ty, "FileMetaData.created_by")?),
            _ => rd.skip_value(field.ty)?,
        }
    }

    Ok(FileMetaData {
        version: version.ok_or_else(|| fail!(InvalidFormat, "FileMetaData missing version"))?,
        schema: schema.ok_or_else(|| fail!(InvalidFormat, "FileMetaData missing schema"))?,
        num_rows: num_rows.ok_or_else(|| fail!(InvalidFormat, "FileMetaData missing num_rows"))?,
        row_groups: row_groups.ok_or_else(|| fail!(InvalidFormat, "FileMetaData missing row_groups"))?,
        key_value_metadata,
        created_by,
    })
}

fn parse_schema_list(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<Vec<SchemaElementRaw>> {
    let (size, elem_ty) = rd.read_list_header()?;
    if elem_ty != CompactType::Struct {
        return Err(fail!(Malformed, "schema list element type is not struct"));
    }
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        out.push(parse_schema_element(rd, nesting)?);
    }
    Ok(out)
}

fn parse_schema_element(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<SchemaElementRaw> {
    nesting.enter();
    let mut physical_type = None;
    let mut type_length = None;
    let mut repetition = None;
    let mut name = None;
    let mut num_children = None;
    let mut converted_type = None;
    let mut scale = None;
    let mut precision = None;
    let mut field_id = None;
    let mut logical_type = None;

    while let Some(field) = rd.read_field_header(nesting)? {
        match field.id {
            1 => physical_type = Some(PhysicalType::from_i32(expect_i32(rd, field.ty, "SchemaElement.type")?)?),
            2 => type_length = Some(expect_i32(rd, field.ty, "SchemaElement.type_length")?),
            3 => repetition = Some(Repetition::from_i32(expect_i32(rd, field.ty, "SchemaElement.repetition_type")?)?),
            4 => name = Some(expect_string(rd, field.ty, "SchemaElement.name")?),
            5 => num_children = Some(expect_i32(rd, field.ty, "SchemaElement.num_children")?),
            6 => converted_type = Some(ConvertedType::from_i32(expect_i32(rd, field.ty, "SchemaElement.converted_type")?)?),
            7 => scale = Some(expect_i32(rd, field.ty, "SchemaElement.scale")?),
            8 => precision = Some(expect_i32(rd, field.ty, "SchemaElement.precision")?),
            9 => field_id = Some(expect_i32(rd, field.ty, "SchemaElement.field_id")?),
            10 => logical_type = Some(parse_logical_type(rd, nesting)?),
            _ => rd.skip_value(field.ty)?,
        }
    }
    nesting.leave();

    let lt = logical_type;
    if let Some(lt) = &lt {
        lt.validate()?;
    }

    Ok(SchemaElementRaw {
        physical_type,
        type_length,
        repetition,
        name: name.ok_or_else(|| fail!(InvalidFormat, "SchemaElement missing name"))?,
        num_children,
        converted_type,
        scale,
        precision,
        field_id,
        logical_type: lt,
    })
}

/// `LogicalType` is itself a thrift union: exactly one field of the
/// enclosing struct is set, each naming a (possibly-empty) sub-struct. We
/// decode whichever field id is present and ignore the rest (there should
/// only ever be one).
fn parse_logical_type(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<LogicalType> {
    nesting.enter();
    let mut result = None;
    while let Some(field) = rd.read_field_header(nesting)? {
        let parsed = match field.id {
            1 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(LogicalType::String)
            }
            2 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(LogicalType::Map)
            }
            3 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(LogicalType::List)
            }
            4 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(LogicalType::Enum)
            }
            5 => Some(parse_decimal_type(rd, nesting)?),
            6 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(LogicalType::Date)
            }
            7 => Some(parse_time_type(rd, nesting, false)?),
            8 => Some(parse_time_type(rd, nesting, true)?),
            9 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(LogicalType::Interval)
            }
            10 => Some(parse_int_type(rd, nesting)?),
            11 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(LogicalType::Json)
            }
            12 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(LogicalType::Bson)
            }
            13 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(LogicalType::Uuid)
            }
            _ => {
                rd.skip_value(field.ty)?;
                None
            }
        };
        if parsed.is_some() {
            result = parsed;
        }
    }
    nesting.leave();
    result.ok_or_else(|| fail!(Malformed, "LogicalType union with no recognized member set"))
}

fn skip_empty_struct(rd: &mut CompactReader, nesting: &mut FieldNesting, ty: CompactType) -> Result<()> {
    if ty != CompactType::Struct {
        return Err(fail!(Malformed, "expected struct for logical type member"));
    }
    nesting.enter();
    while let Some(field) = rd.read_field_header(nesting)? {
        rd.skip_value(field.ty)?;
    }
    nesting.leave();
    Ok(())
}

fn parse_decimal_type(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<LogicalType> {
    nesting.enter();
    let mut scale = 0;
    let mut precision = 0;
    while let Some(field) = rd.read_field_header(nesting)? {
        match field.id {
            1 => scale = expect_i32(rd, field.ty, "DecimalType.scale")?,
            2 => precision = expect_i32(rd, field.ty, "DecimalType.precision")?,
            _ => rd.skip_value(field.ty)?,
        }
    }
    nesting.leave();
    Ok(LogicalType::Decimal { scale, precision })
}

fn parse_time_unit(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<TimeUnit> {
    nesting.enter();
    let mut unit = None;
    while let Some(field) = rd.read_field_header(nesting)? {
        let u = match field.id {
            1 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(TimeUnit::Millis)
            }
            2 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(TimeUnit::Micros)
            }
            3 => {
                skip_empty_struct(rd, nesting, field.ty)?;
                Some(TimeUnit::Nanos)
            }
            _ => {
                rd.skip_value(field.ty)?;
                None
            }
        };
        if u.is_some() {
            unit = u;
        }
    }
    nesting.leave();
    unit.ok_or_else(|| fail!(Malformed, "TimeUnit union with no recognized member set"))
}

fn parse_time_type(rd: &mut CompactReader, nesting: &mut FieldNesting, is_timestamp: bool) -> Result<LogicalType> {
    nesting.enter();
    let mut is_utc_adjusted = false;
    let mut unit = None;
    while let Some(field) = rd.read_field_header(nesting)? {
        match field.id {
            1 => is_utc_adjusted = expect_bool(field)?,
            2 => unit = Some(parse_time_unit(rd, nesting)?),
            _ => rd.skip_value(field.ty)?,
        }
    }
    nesting.leave();
    let unit = unit.ok_or_else(|| fail!(InvalidFormat, "Time/TimestampType missing unit"))?;
    Ok(if is_timestamp {
        LogicalType::Timestamp { unit, is_utc_adjusted }
    } else {
        LogicalType::Time { unit, is_utc_adjusted }
    })
}

fn parse_int_type(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<LogicalType> {
    nesting.enter();
    let mut bit_width = None;
    let mut is_signed = false;
    while let Some(field) = rd.read_field_header(nesting)? {
        match field.id {
            1 => bit_width = Some(expect_i32(rd, field.ty, "IntType.bitWidth")? as u8),
            2 => is_signed = expect_bool(field)?,
            _ => rd.skip_value(field.ty)?,
        }
    }
    nesting.leave();
    Ok(LogicalType::Integer {
        bit_width: bit_width.ok_or_else(|| fail!(InvalidFormat, "IntType missing bitWidth"))?,
        is_signed,
    })
}

fn parse_row_group_list(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<Vec<RowGroupRaw>> {
    let (size, elem_ty) = rd.read_list_header()?;
    if elem_ty != CompactType::Struct {
        return Err(fail!(Malformed, "row_groups list element type is not struct"));
    }
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        out.push(parse_row_group(rd, nesting)?);
    }
    Ok(out)
}

fn parse_row_group(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<RowGroupRaw> {
    nesting.enter();
    let mut columns = None;
    let mut total_byte_size = None;
    let mut num_rows = None;
    while let Some(field) = rd.read_field_header(nesting)? {
        match field.id {
            1 => columns = Some(parse_column_chunk_list(rd, nesting)?),
            2 => total_byte_size = Some(expect_i64(rd, field.ty, "RowGroup.total_byte_size")?),
            3 => num_rows = Some(expect_i64(rd, field.ty, "RowGroup.num_rows")?),
            _ => rd.skip_value(field.ty)?,
        }
    }
    nesting.leave();
    Ok(RowGroupRaw {
        columns: columns.ok_or_else(|| fail!(InvalidFormat, "RowGroup missing columns"))?,
        total_byte_size: total_byte_size.unwrap_or(0),
        num_rows: num_rows.ok_or_else(|| fail!(InvalidFormat, "RowGroup missing num_rows"))?,
    })
}

fn parse_column_chunk_list(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<Vec<ColumnChunkRaw>> {
    let (size, elem_ty) = rd.read_list_header()?;
    if elem_ty != CompactType::Struct {
        return Err(fail!(Malformed, "columns list element type is not struct"));
    }
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        out.push(parse_column_chunk(rd, nesting)?);
    }
    Ok(out)
}

fn parse_column_chunk(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<ColumnChunkRaw> {
    nesting.enter();
    let mut meta_data = None;
    while let Some(field) = rd.read_field_header(nesting)? {
        match field.id {
            3 => meta_data = Some(parse_column_metadata(rd, nesting)?),
            _ => rd.skip_value(field.ty)?,
        }
    }
    nesting.leave();
    Ok(ColumnChunkRaw {
        meta_data: meta_data.ok_or_else(|| fail!(InvalidFormat, "ColumnChunk missing meta_data"))?,
    })
}

fn parse_column_metadata(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<ColumnMetaData> {
    nesting.enter();
    let mut physical_type = None;
    let mut encodings = Vec::new();
    let mut path_in_schema = None;
    let mut codec = None;
    let mut num_values = None;
    let mut total_uncompressed_size = None;
    let mut total_compressed_size = None;
    let mut data_page_offset = None;
    let mut dictionary_page_offset = None;
    let mut statistics = None;

    while let Some(field) = rd.read_field_header(nesting)? {
        match field.id {
            1 => physical_type = Some(PhysicalType::from_i32(expect_i32(rd, field.ty, "ColumnMetaData.type")?)?),
            2 => encodings = parse_encodings_list(rd)?,
            3 => path_in_schema = Some(parse_string_list(rd)?),
            4 => codec = Some(Compression::from_i32(expect_i32(rd, field.ty, "ColumnMetaData.codec")?)?),
            5 => num_values = Some(expect_i64(rd, field.ty, "ColumnMetaData.num_values")?),
            6 => total_uncompressed_size = Some(expect_i64(rd, field.ty, "ColumnMetaData.total_uncompressed_size")?),
            7 => total_compressed_size = Some(expect_i64(rd, field.ty, "ColumnMetaData.total_compressed_size")?),
            9 => data_page_offset = Some(expect_i64(rd, field.ty, "ColumnMetaData.data_page_offset")?),
            11 => dictionary_page_offset = Some(expect_i64(rd, field.ty, "ColumnMetaData.dictionary_page_offset")?),
            12 => statistics = Some(parse_statistics(rd, nesting)?),
            _ => rd.skip_value(field.ty)?,
        }
    }
    nesting.leave();

    Ok(ColumnMetaData {
        physical_type: physical_type.ok_or_else(|| fail!(InvalidFormat, "ColumnMetaData missing type"))?,
        encodings,
        path_in_schema: path_in_schema.ok_or_else(|| fail!(InvalidFormat, "ColumnMetaData missing path_in_schema"))?,
        codec: codec.ok_or_else(|| fail!(InvalidFormat, "ColumnMetaData missing codec"))?,
        num_values: num_values.ok_or_else(|| fail!(InvalidFormat, "ColumnMetaData missing num_values"))?,
        total_uncompressed_size: total_uncompressed_size.ok_or_else(|| fail!(InvalidFormat, "ColumnMetaData missing total_uncompressed_size"))?,
        total_compressed_size: total_compressed_size.ok_or_else(|| fail!(InvalidFormat, "ColumnMetaData missing total_compressed_size"))?,
        data_page_offset: data_page_offset.ok_or_else(|| fail!(InvalidFormat, "ColumnMetaData missing data_page_offset"))?,
        dictionary_page_offset,
        statistics,
    })
}

fn parse_statistics(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<Statistics> {
    nesting.enter();
    let mut stats = Statistics::default();
    while let Some(field) = rd.read_field_header(nesting)? {
        match field.id {
            1 => stats.max = Some(rd.read_binary()?.to_vec()),
            2 => stats.min = Some(rd.read_binary()?.to_vec()),
            3 => stats.null_count = Some(expect_i64(rd, field.ty, "Statistics.null_count")?),
            4 => stats.distinct_count = Some(expect_i64(rd, field.ty, "Statistics.distinct_count")?),
            5 => stats.max_value = Some(rd.read_binary()?.to_vec()),
            6 => stats.min_value = Some(rd.read_binary()?.to_vec()),
            _ => rd.skip_value(field.ty)?,
        }
    }
    nesting.leave();
    Ok(stats)
}

fn parse_encodings_list(rd: &mut CompactReader) -> Result<Vec<Encoding>> {
    let (size, elem_ty) = rd.read_list_header()?;
    if elem_ty != CompactType::I32 {
        return Err(fail!(Malformed, "encodings list element type is not i32"));
    }
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        let raw = require_i32(rd.read_zigzag_i64()?, "encodings[]")?;
        out.push(Encoding::from_i32_tolerant(raw));
    }
    Ok(out)
}

fn parse_string_list(rd: &mut CompactReader) -> Result<Vec<String>> {
    let (size, elem_ty) = rd.read_list_header()?;
    if elem_ty != CompactType::Binary {
        return Err(fail!(Malformed, "string list element type is not binary"));
    }
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        out.push(rd.read_string()?);
    }
    Ok(out)
}

fn parse_key_value_list(rd: &mut CompactReader, nesting: &mut FieldNesting) -> Result<Vec<KeyValue>> {
    let (size, elem_ty) = rd.read_list_header()?;
    if elem_ty != CompactType::Struct {
        return Err(fail!(Malformed, "key_value_metadata list element type is not struct"));
    }
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        nesting.enter();
        let mut key = None;
        let mut value = None;
        while let Some(field) = rd.read_field_header(nesting)? {
            match field.id {
                1 => key = Some(expect_string(rd, field.ty, "KeyValue.key")?),
                2 => value = Some(expect_string(rd, field.ty, "KeyValue.value")?),
                _ => rd.skip_value(field.ty)?,
            }
        }
        nesting.leave();
        out.push(KeyValue {
            key: key.ok_or_else(|| fail!(InvalidFormat, "KeyValue missing key"))?,
            value,
        });
    }
    Ok(out)
}

fn expect_i32(rd: &mut CompactReader, ty: CompactType, what: &str) -> Result<i32> {
    match ty {
        CompactType::I16 | CompactType::I32 | CompactType::I64 => require_i32(rd.read_zigzag_i64()?, what),
        CompactType::Byte => Ok(rd.read_byte()? as i8 as i32),
        _ => Err(fail!(Malformed, "{what}: expected integer, found {ty:?}")),
    }
}

fn expect_i64(rd: &mut CompactReader, ty: CompactType, what: &str) -> Result<i64> {
    match ty {
        CompactType::I16 | CompactType::I32 | CompactType::I64 => rd.read_zigzag_i64(),
        _ => Err(fail!(Malformed, "{what}: expected integer, found {ty:?}")),
    }
}

fn expect_string(rd: &mut CompactReader, ty: CompactType, what: &str) -> Result<String> {
    if ty != CompactType::Binary {
        return Err(fail!(Malformed, "{what}: expected binary/string, found {ty:?}"));
    }
    rd.read_string()
}

fn expect_bool(field: crate::compact::FieldHeader) -> Result<bool> {
    field.inline_bool.ok_or_else(|| fail!(Malformed, "expected inline bool field"))
}
