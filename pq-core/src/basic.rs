//! The small fixed enums the footer and page headers are built from. Values
//! are the literal integers Parquet's thrift schema assigns them.

use crate::error::{fail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray,
}

impl PhysicalType {
    pub fn from_i32(v: i32) -> Result<Self> {
        Ok(match v {
            0 => PhysicalType::Boolean,
            1 => PhysicalType::Int32,
            2 => PhysicalType::Int64,
            3 => PhysicalType::Int96,
            4 => PhysicalType::Float,
            5 => PhysicalType::Double,
            6 => PhysicalType::ByteArray,
            7 => PhysicalType::FixedLenByteArray,
            other => return Err(fail!(UnknownEnum, "physical type {other}")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    Required,
    Optional,
    Repeated,
}

impl Repetition {
    pub fn from_i32(v: i32) -> Result<Self> {
        Ok(match v {
            0 => Repetition::Required,
            1 => Repetition::Optional,
            2 => Repetition::Repeated,
            other => return Err(fail!(UnknownEnum, "repetition type {other}")),
        })
    }
}

/// The legacy `converted_type` enum (SchemaElement field 6). Superseded by
/// `LogicalType` but still how List/Map grouping and several scalar
/// refinements are signaled in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertedType {
    Utf8,
    Map,
    MapKeyValue,
    List,
    Enum,
    Decimal,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Json,
    Bson,
    Interval,
}

impl ConvertedType {
    pub fn from_i32(v: i32) -> Result<Self> {
        Ok(match v {
            0 => ConvertedType::Utf8,
            1 => ConvertedType::Map,
            2 => ConvertedType::MapKeyValue,
            3 => ConvertedType::List,
            4 => ConvertedType::Enum,
            5 => ConvertedType::Decimal,
            6 => ConvertedType::Date,
            7 => ConvertedType::TimeMillis,
            8 => ConvertedType::TimeMicros,
            9 => ConvertedType::TimestampMillis,
            10 => ConvertedType::TimestampMicros,
            11 => ConvertedType::Uint8,
            12 => ConvertedType::Uint16,
            13 => ConvertedType::Uint32,
            14 => ConvertedType::Uint64,
            15 => ConvertedType::Int8,
            16 => ConvertedType::Int16,
            17 => ConvertedType::Int32,
            18 => ConvertedType::Int64,
            19 => ConvertedType::Json,
            20 => ConvertedType::Bson,
            21 => ConvertedType::Interval,
            other => return Err(fail!(UnknownEnum, "converted type {other}")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Millis,
    Micros,
    Nanos,
}

/// The modern logical-type union (SchemaElement field 10). Constructed by
/// `schema::build` from either this thrift union or, when absent, inferred
/// from the legacy `ConvertedType`.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalType {
    String,
    Enum,
    Uuid,
    Date,
    Time {
        unit: TimeUnit,
        is_utc_adjusted: bool,
    },
    Timestamp {
        unit: TimeUnit,
        is_utc_adjusted: bool,
    },
    Decimal {
        scale: i32,
        precision: i32,
    },
    Integer {
        bit_width: u8,
        is_signed: bool,
    },
    Json,
    Bson,
    List,
    Map,
    Interval,
}

impl LogicalType {
    pub fn validate(&self) -> Result<()> {
        match self {
            LogicalType::Decimal { scale, precision } => {
                if *precision <= 0 {
                    return Err(fail!(Malformed, "decimal precision must be > 0: {precision}"));
                }
                if *scale < 0 {
                    return Err(fail!(Malformed, "decimal scale must be >= 0: {scale}"));
                }
            }
            LogicalType::Integer { bit_width, .. } => {
                if !matches!(bit_width, 8 | 16 | 32 | 64) {
                    return Err(fail!(Malformed, "int logical type bit_width must be 8/16/32/64: {bit_width}"));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Plain,
    PlainDictionary,
    Rle,
    DeltaBinaryPacked,
    DeltaLengthByteArray,
    DeltaByteArray,
    RleDictionary,
    ByteStreamSplit,
    /// Only produced when decoding the informational `encodings` list in
    /// `ColumnMetaData`, which tolerates unrecognized values —
    /// the page header's own encoding field is authoritative and is always
    /// decoded strictly via `from_i32_strict`.
    Unknown(i32),
}

impl Encoding {
    pub fn from_i32_strict(v: i32) -> Result<Self> {
        Self::try_from_i32(v).ok_or_else(|| fail!(UnknownEnum, "encoding {v}"))
    }

    pub fn from_i32_tolerant(v: i32) -> Self {
        Self::try_from_i32(v).unwrap_or(Encoding::Unknown(v))
    }

    fn try_from_i32(v: i32) -> Option<Self> {
        Some(match v {
            0 => Encoding::Plain,
            2 => Encoding::PlainDictionary,
            3 => Encoding::Rle,
            5 => Encoding::DeltaBinaryPacked,
            6 => Encoding::DeltaLengthByteArray,
            7 => Encoding::DeltaByteArray,
            8 => Encoding::RleDictionary,
            9 => Encoding::ByteStreamSplit,
            // 1 (GROUP_VAR_INT) and 4 (BIT_PACKED) are deprecated and were
            // never written by any encoder this reader needs to support.
            _ => return None,
        })
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, Encoding::PlainDictionary | Encoding::RleDictionary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Uncompressed,
    Snappy,
    Gzip,
    Lzo,
    Brotli,
    Lz4,
    Zstd,
    Lz4Raw,
}

impl Compression {
    pub fn from_i32(v: i32) -> Result<Self> {
        Ok(match v {
            0 => Compression::Uncompressed,
            1 => Compression::Snappy,
            2 => Compression::Gzip,
            3 => Compression::Lzo,
            4 => Compression::Brotli,
            5 => Compression::Lz4,
            6 => Compression::Zstd,
            7 => Compression::Lz4Raw,
            other => return Err(fail!(UnknownEnum, "compression codec {other}")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    DataPage,
    IndexPage,
    DictionaryPage,
    DataPageV2,
}

impl PageType {
    pub fn from_i32(v: i32) -> Result<Self> {
        Ok(match v {
            0 => PageType::DataPage,
            1 => PageType::IndexPage,
            2 => PageType::DictionaryPage,
            3 => PageType::DataPageV2,
            other => return Err(fail!(UnknownEnum, "page type {other}")),
        })
    }
}
