//! A high-throughput reader for the Apache Parquet file format.
//!
//! Read path: [`metadata::read_footer`] locates and parses the file
//! footer, [`schema::Schema::build`] turns its flattened schema listing
//! into a tree, and [`row::RowReader`] drives everything else — page
//! scanning, decompression, value decoding, level decoding, and nested
//! record assembly — to hand the caller one assembled row at a time.

mod basic;
mod codec;
mod column;
mod compact;
mod config;
mod encoding;
mod error;
mod ioutil;
mod levels;
mod metadata;
mod page;
mod record;
mod row;
mod schema;
mod value;

#[cfg(test)]
mod test;

pub use basic::{Compression, ConvertedType, Encoding, LogicalType, PhysicalType, Repetition, TimeUnit};
pub use codec::{CodecProvider, DefaultCodecs};
pub use config::ReaderOptions;
pub use error::{ParquetError, Result};
pub use ioutil::{ByteRegion, FileRegion, MemRegion};
pub use metadata::{read_footer, ColumnChunkRaw, ColumnMetaData, FileMetaData, KeyValue, RowGroupRaw, SchemaElementRaw, Statistics};
pub use record::Value;
pub use row::{Pools, Row, RowReader};
pub use schema::{ColumnDescriptor, Node, NodeId, NodeKind, Projection, Schema};
