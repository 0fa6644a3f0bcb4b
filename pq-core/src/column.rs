//! C7: column chunk decoding and the prefetch pipeline that overlaps I/O
//! and decode across columns. A row group's columns are
//! independent byte ranges, so the natural unit of concurrency is "decode
//! one column chunk" — `RowReader` (C9) fans these out across a rayon pool
//! and collects them through bounded `crossbeam_channel`s, so the columns
//! needed to assemble the row group's later rows are already decoding
//! while earlier rows are being handed to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};

use crate::basic::PhysicalType;
use crate::codec::CodecProvider;
use crate::config::ReaderOptions;
use crate::error::{fail, ParquetError, Result};
use crate::ioutil::ByteRegion;
use crate::metadata::ColumnMetaData;
use crate::page::{self, PageHeaderData};
use crate::schema::ColumnDescriptor;
use crate::value::{ColumnBatch, TypedArray};

/// `clamp(batch_memory_target / bytes_per_row, 2^14, 2^19)`:
/// batches are sized to a roughly constant memory footprint, but never so
/// small that per-batch overhead dominates, nor so large that a single
/// batch defeats the point of batching.
pub fn batch_size_for_row_width(bytes_per_row: usize, batch_memory_target: usize) -> usize {
    let raw = if bytes_per_row == 0 {
        1 << 19
    } else {
        batch_memory_target / bytes_per_row
    };
    raw.clamp(1 << 14, 1 << 19)
}

/// Per-row byte estimate for one column, used by the batch-sizing formula:
/// fixed widths for numeric/boolean physical types, a flat estimate for
/// `BYTE_ARRAY` (its true length is only known once decoded), and
/// `type_length` for `FIXED_LEN_BYTE_ARRAY`.
pub fn column_byte_width(physical_type: PhysicalType, type_length: Option<i32>) -> usize {
    match physical_type {
        PhysicalType::Boolean => 1,
        PhysicalType::Int32 | PhysicalType::Float => 4,
        PhysicalType::Int64 | PhysicalType::Double => 8,
        PhysicalType::Int96 => 12,
        PhysicalType::ByteArray => 16,
        PhysicalType::FixedLenByteArray => type_length.unwrap_or(16).max(0) as usize,
    }
}

/// Decode an entire column chunk (its optional dictionary page, then every
/// data page in order) into one contiguous batch.
pub fn decode_column_chunk(
    region: &dyn ByteRegion,
    codecs: &dyn CodecProvider,
    meta: &ColumnMetaData,
    desc: &ColumnDescriptor,
    options: &ReaderOptions,
    closed: &AtomicBool,
) -> Result<ColumnBatch> {
    let pages = page::scan_pages(region, meta)?;

    let mut dictionary: Option<TypedArray> = None;
    let mut def_levels = Vec::with_capacity(meta.num_values as usize);
    let mut rep_levels = Vec::with_capacity(meta.num_values as usize);
    let mut values_acc: Option<TypedArray> = None;

    for p in &pages {
        // Cancellation is cooperative and checked between pages: a closed
        // reader abandons whatever partial batch is in flight rather than
        // surfacing an error, since the caller who closed it is about to
        // stop asking for rows anyway.
        if closed.load(Ordering::Relaxed) {
            break;
        }
        match &p.header.data {
            PageHeaderData::Dictionary(dict_header) => {
                let body = page::read_page_body(region, codecs, meta.codec, p, 0, 0)?;
                let values = crate::encoding::decode_dictionary_page(
                    &body.values,
                    desc.physical_type,
                    desc.type_length,
                    dict_header.num_values as usize,
                )?;
                dictionary = Some(values);
            }
            PageHeaderData::Data(data_header) => {
                let body = page::read_page_body(region, codecs, meta.codec, p, desc.max_rep_level, desc.max_def_level)?;
                let n = data_header.num_values as usize;
                let page_rep = decode_level_stream(&body.rep_levels, desc.max_rep_level, n, "repetition")?;
                let page_def = decode_level_stream(&body.def_levels, desc.max_def_level, n, "definition")?;
                let non_null = crate::levels::count_at_least(&page_def, desc.max_def_level, options.enable_simd);
                let page_values = crate::encoding::decode_values(
                    data_header.encoding,
                    &body.values,
                    desc.physical_type,
                    desc.type_length,
                    non_null,
                    dictionary.as_ref(),
                )?;
                append_typed_array(&mut values_acc, page_values)?;
                rep_levels.extend(page_rep);
                def_levels.extend(page_def);
            }
            PageHeaderData::DataV2(data_header) => {
                let body = page::read_page_body(region, codecs, meta.codec, p, desc.max_rep_level, desc.max_def_level)?;
                let n = data_header.num_values as usize;
                let page_rep = decode_level_stream(&body.rep_levels, desc.max_rep_level, n, "repetition")?;
                let page_def = decode_level_stream(&body.def_levels, desc.max_def_level, n, "definition")?;
                let non_null = n - data_header.num_nulls as usize;
                let page_values = crate::encoding::decode_values(
                    data_header.encoding,
                    &body.values,
                    desc.physical_type,
                    desc.type_length,
                    non_null,
                    dictionary.as_ref(),
                )?;
                append_typed_array(&mut values_acc, page_values)?;
                rep_levels.extend(page_rep);
                def_levels.extend(page_def);
            }
            PageHeaderData::Index => {}
        }
    }

    Ok(ColumnBatch {
        def_levels,
        rep_levels,
        values: values_acc.ok_or_else(|| fail!(InvalidFormat, "column chunk {:?} has no data pages", desc.path))?,
    })
}

/// Decode one page's rep/def level stream and verify it consumed exactly
/// the bytes `page::read_page_body` framed for it (spec: "mandatory that
/// the decoder consume exactly the declared byte length of its input").
/// `max_level == 0` means the column has no level stream of its own (every
/// slot is implicitly zero/fully-defined), so `stream` is empty and nothing
/// is decoded.
fn decode_level_stream(stream: &bytes::Bytes, max_level: u16, count: usize, which: &str) -> Result<Vec<u32>> {
    if max_level == 0 {
        return Ok(vec![max_level as u32; count]);
    }
    let (levels, consumed) = crate::levels::decode_hybrid(stream, crate::levels::bit_width_for_max_level(max_level), count)?;
    if consumed != stream.len() {
        return Err(fail!(
            Malformed,
            "{which}-level stream consumed {consumed} of {} declared bytes",
            stream.len()
        ));
    }
    Ok(levels)
}

fn append_typed_array(acc: &mut Option<TypedArray>, next: TypedArray) -> Result<()> {
    match acc {
        None => {
            *acc = Some(next);
            Ok(())
        }
        Some(existing) => {
            macro_rules! extend_arm {
                ($variant:ident, $v:ident) => {{
                    if let TypedArray::$variant(more) = next {
                        $v.extend(more);
                        Ok(())
                    } else {
                        Err(fail!(TypeMismatch, "mismatched page encodings within one column chunk"))
                    }
                }};
            }
            match existing {
                TypedArray::Boolean(v) => extend_arm!(Boolean, v),
                TypedArray::Int32(v) => extend_arm!(Int32, v),
                TypedArray::Int64(v) => extend_arm!(Int64, v),
                TypedArray::Int96(v) => extend_arm!(Int96, v),
                TypedArray::Float(v) => extend_arm!(Float, v),
                TypedArray::Double(v) => extend_arm!(Double, v),
                TypedArray::ByteArray(v) => extend_arm!(ByteArray, v),
                TypedArray::FixedLenByteArray(v) => extend_arm!(FixedLenByteArray, v),
            }
        }
    }
}

/// A column chunk decoding in the background on a rayon pool, delivered
/// through a rendezvous channel once ready.
pub struct PrefetchedColumn {
    receiver: Receiver<Result<ColumnBatch>>,
}

impl PrefetchedColumn {
    pub fn spawn(
        pool: &rayon::ThreadPool,
        region: Arc<dyn ByteRegion>,
        codecs: Arc<dyn CodecProvider>,
        meta: ColumnMetaData,
        desc: ColumnDescriptor,
        options: Arc<ReaderOptions>,
        closed: Arc<AtomicBool>,
    ) -> Self {
        let (tx, rx) = bounded(1);
        pool.spawn(move || {
            // Observed at task entry as well as between pages, so a reader
            // closed before this task even got a pool slot never touches the
            // file at all.
            if closed.load(Ordering::Relaxed) {
                return;
            }
            let result = decode_column_chunk(region.as_ref(), codecs.as_ref(), &meta, &desc, &options, closed.as_ref());
            // The receiver may have been dropped (reader closed early); a
            // failed send just means the work was wasted, not an error.
            let _ = tx.send(result);
        });
        PrefetchedColumn { receiver: rx }
    }

    pub fn recv(self) -> Result<ColumnBatch> {
        self.receiver
            .recv()
            .map_err(|_| ParquetError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "column decode task vanished")))?
    }
}
