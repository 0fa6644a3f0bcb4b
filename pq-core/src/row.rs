//! C9: the reader façade — `RowReader` walks one or more files' row groups
//! in order, decoding each row group's columns concurrently and handing
//! rows to the caller one at a time, with typed per-field accessors.
//!
//! Concurrency keeps two disjoint worker pools rather than one shared pool:
//! `Pools::io` decodes column chunks, `Pools::coordination` runs the
//! lightweight work of merging already-decoded columns into rows and
//! prefetching the next file's footer. Keeping them disjoint means a burst
//! of column-decode tasks saturating `io` can never starve the (cheap,
//! latency-sensitive) coordination work a caller is blocked on.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::codec::{CodecProvider, DefaultCodecs};
use crate::column::{self, PrefetchedColumn};
use crate::config::ReaderOptions;
use crate::error::{fail, ParquetError, Result};
use crate::ioutil::{ByteRegion, FileRegion};
use crate::metadata::{self, FileMetaData};
use crate::record::{self, Value};
use crate::schema::Schema;

/// `Io` wraps a real `std::io::Error`, so the places here that hit a
/// channel-disconnect or pool-startup failure rather than an actual syscall
/// error build one by hand instead of going through the `fail!` macro (which
/// only ever constructs string-payload variants).
fn io_error(msg: impl Into<String>) -> ParquetError {
    let msg = msg.into();
    tracing::error!(target: "pq_core", kind = "Io", "{msg}");
    ParquetError::Io(std::io::Error::other(msg))
}

pub struct Pools {
    pub io: rayon::ThreadPool,
    pub coordination: rayon::ThreadPool,
}

impl Pools {
    pub fn new(options: &ReaderOptions) -> Result<Self> {
        let io = rayon::ThreadPoolBuilder::new()
            .num_threads(options.thread_count.max(1))
            .thread_name(|i| format!("pq-io-{i}"))
            .build()
            .map_err(|e| io_error(format!("failed to start io/decode pool: {e}")))?;
        let coordination = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .thread_name(|i| format!("pq-coord-{i}"))
            .build()
            .map_err(|e| io_error(format!("failed to start coordination pool: {e}")))?;
        Ok(Pools { io, coordination })
    }
}

struct OpenFile {
    region: Arc<dyn ByteRegion>,
    metadata: FileMetaData,
    schema: Schema,
    /// Original leaf-column indices selected by the reader's projection,
    /// in the caller's requested order.
    projected_columns: Vec<usize>,
}

fn open_file(path: &Path, options: &ReaderOptions) -> Result<OpenFile> {
    let region: Arc<dyn ByteRegion> = Arc::new(FileRegion::open(path)?);
    let metadata = metadata::read_footer(region.as_ref())?;
    let schema = Schema::build(&metadata.schema)?;
    let projected_columns = schema.resolve_projection(&options.projection)?;
    Ok(OpenFile {
        region,
        metadata,
        schema,
        projected_columns,
    })
}

/// A row group decoded into per-leaf column batches, ready to assemble
/// into records as the caller consumes them.
struct DecodedRowGroup {
    rows: VecDeque<Value>,
}

fn decode_row_group(
    file: &OpenFile,
    row_group_idx: usize,
    pools: &Pools,
    codecs: &Arc<dyn CodecProvider>,
    options: &Arc<ReaderOptions>,
    closed: &Arc<AtomicBool>,
) -> Result<DecodedRowGroup> {
    let row_group = &file.metadata.row_groups[row_group_idx];
    if row_group.columns.len() != file.schema.columns.len() {
        return Err(fail!(
            Malformed,
            "row group has {} columns but schema has {}",
            row_group.columns.len(),
            file.schema.columns.len()
        ));
    }

    let bytes_per_row: usize = file
        .projected_columns
        .iter()
        .map(|&i| {
            let desc = &file.schema.columns[i];
            column::column_byte_width(desc.physical_type, desc.type_length)
        })
        .sum();
    let batch_size = column::batch_size_for_row_width(bytes_per_row, options.batch_memory_target);
    tracing::debug!(target: "pq_core", row_group_idx, bytes_per_row, batch_size, "decoding row group");

    // Fan only the projected column chunks out to the io/decode pool;
    // decoding overlaps across columns instead of running strictly
    // serially, and we only block (in the coordination pool) once we
    // actually need a given column's values. Columns outside the
    // projection are never read off disk at all.
    let mut prefetched = Vec::with_capacity(file.projected_columns.len());
    for &col_idx in &file.projected_columns {
        let chunk = &row_group.columns[col_idx];
        let desc = file.schema.columns[col_idx].clone();
        let meta = chunk.meta_data.clone();
        let region = file.region.clone();
        prefetched.push(PrefetchedColumn::spawn(
            &pools.io,
            region,
            codecs.clone(),
            meta,
            desc,
            options.clone(),
            closed.clone(),
        ));
    }

    let mut leaves = Vec::with_capacity(prefetched.len());
    for (&col_idx, handle) in file.projected_columns.iter().zip(prefetched) {
        let batch = match handle.recv() {
            Ok(batch) => batch,
            // A task that observed the closed flag before sending anything
            // disconnects its channel rather than erroring; that is not a
            // real failure, so a reader closed mid-row-group just yields an
            // empty row group instead of surfacing it to the caller.
            Err(_) if closed.load(Ordering::Relaxed) => return Ok(DecodedRowGroup { rows: VecDeque::new() }),
            Err(e) => return Err(e),
        };
        leaves.push((file.schema.columns[col_idx].node, batch));
    }
    if closed.load(Ordering::Relaxed) {
        return Ok(DecodedRowGroup { rows: VecDeque::new() });
    }

    let rows = record::assemble_row_group(&file.schema, &leaves)?;
    Ok(DecodedRowGroup { rows: rows.into() })
}

/// Walks one or more Parquet files' rows in sequence, as if they were one
/// logical stream. Schemas are not reconciled across files — the first
/// file's schema is used for all accessor bookkeeping, and callers mixing
/// genuinely different schemas will see `TypeMismatch` from the row
/// accessors; cross-file schema evolution isn't attempted.
pub struct RowReader {
    sources: VecDeque<PathBuf>,
    pools: Arc<Pools>,
    codecs: Arc<dyn CodecProvider>,
    options: Arc<ReaderOptions>,
    current: Option<OpenFile>,
    current_row_group: usize,
    buffered: VecDeque<Value>,
    /// The next file's footer, fetched on the coordination pool while the
    /// current file is still being iterated.
    prefetched_next: Option<Receiver<Result<OpenFile>>>,
    rows_emitted: u64,
    /// Cooperative cancellation flag, set by [`RowReader::close`] and
    /// observed by background column-decode tasks at entry and between
    /// pages. No error is ever surfaced for cancellation -- the reader just
    /// starts reporting "no more rows".
    closed: Arc<AtomicBool>,
}

impl RowReader {
    pub fn open(paths: impl IntoIterator<Item = impl Into<PathBuf>>, options: ReaderOptions) -> Result<Self> {
        let pools = Arc::new(Pools::new(&options)?);
        let options = Arc::new(options);
        let mut sources: VecDeque<PathBuf> = paths.into_iter().map(Into::into).collect();
        if sources.is_empty() {
            return Err(fail!(InvalidFormat, "RowReader needs at least one file"));
        }
        let first_path = sources.pop_front().unwrap();
        let current = Some(open_file(&first_path, &options)?);
        let mut reader = RowReader {
            sources,
            pools,
            codecs: Arc::new(DefaultCodecs),
            options,
            current,
            current_row_group: 0,
            buffered: VecDeque::new(),
            prefetched_next: None,
            rows_emitted: 0,
            closed: Arc::new(AtomicBool::new(false)),
        };
        reader.kick_off_next_file_prefetch();
        Ok(reader)
    }

    fn kick_off_next_file_prefetch(&mut self) {
        if self.prefetched_next.is_some() {
            return;
        }
        if let Some(path) = self.sources.front().cloned() {
            let (tx, rx) = crossbeam_channel::bounded(1);
            let options = self.options.clone();
            self.pools.coordination.spawn(move || {
                let _ = tx.send(open_file(&path, &options));
            });
            self.prefetched_next = Some(rx);
        }
    }

    /// Total row count across every file that will be visited, including
    /// ones not yet opened. Opens and parses each remaining footer to
    /// compute this, so it is not free for large multi-file sets.
    pub fn total_num_rows(&self) -> Result<i64> {
        let mut total = self.current.as_ref().map(|f| f.metadata.num_rows).unwrap_or(0);
        for path in &self.sources {
            total += open_file(path, &self.options)?.metadata.num_rows;
        }
        Ok(total)
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.current.as_ref().map(|f| &f.schema)
    }

    pub fn has_next(&mut self) -> Result<bool> {
        self.fill_buffer()?;
        Ok(!self.buffered.is_empty())
    }

    pub fn next(&mut self) -> Result<Option<Row>> {
        self.fill_buffer()?;
        Ok(self.buffered.pop_front().map(|value| {
            self.rows_emitted += 1;
            Row { value }
        }))
    }

    /// Cooperatively cancel iteration. Any batches already
    /// buffered are dropped and no further row groups are decoded; a reader
    /// closed from another thread while the caller is blocked in `next`
    /// simply has that call (and every call after it) return "no more rows"
    /// rather than an error.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.buffered.clear();
    }

    fn fill_buffer(&mut self) -> Result<()> {
        while self.buffered.is_empty() {
            if self.closed.load(Ordering::Relaxed) {
                return Ok(());
            }
            let row_group_count = match self.current.as_ref() {
                Some(file) => file.metadata.row_groups.len(),
                None => return Ok(()),
            };
            if self.current_row_group >= row_group_count {
                if !self.advance_file()? {
                    return Ok(());
                }
                continue;
            }
            let decoded = {
                let file = self.current.as_ref().unwrap();
                decode_row_group(file, self.current_row_group, &self.pools, &self.codecs, &self.options, &self.closed)?
            };
            self.buffered = decoded.rows;
            self.current_row_group += 1;
        }
        Ok(())
    }

    fn advance_file(&mut self) -> Result<bool> {
        self.kick_off_next_file_prefetch();
        let Some(rx) = self.prefetched_next.take() else {
            self.current = None;
            return Ok(false);
        };
        let next_file = rx.recv().map_err(|_| io_error("next-file prefetch task vanished"))??;
        self.sources.pop_front();
        self.current = Some(next_file);
        self.current_row_group = 0;
        self.kick_off_next_file_prefetch();
        Ok(true)
    }
}

/// One assembled record, with typed accessors that fail with
/// `TypeMismatch` rather than panicking when a caller's expected type
/// doesn't match the stored value.
pub struct Row {
    value: Value,
}

impl Row {
    fn fields(&self) -> Result<&[(String, Value)]> {
        match &self.value {
            Value::Struct(fields) => Ok(fields),
            _ => Err(fail!(Malformed, "row is not a struct")),
        }
    }

    pub fn field_count(&self) -> Result<usize> {
        Ok(self.fields()?.len())
    }

    pub fn field_name(&self, index: usize) -> Result<&str> {
        let fields = self.fields()?;
        fields
            .get(index)
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| fail!(UnknownColumn, "field index {index} out of range"))
    }

    fn get(&self, name: &str) -> Result<&Value> {
        self.fields()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| fail!(UnknownColumn, "no such field: {name}"))
    }

    /// The same lookup as [`Row::get_value`], but by the field's position in
    /// projection order rather than by name.
    fn get_at(&self, index: usize) -> Result<&Value> {
        self.fields()?
            .get(index)
            .map(|(_, v)| v)
            .ok_or_else(|| fail!(UnknownColumn, "field index {index} out of range"))
    }

    pub fn is_null(&self, name: &str) -> Result<bool> {
        Ok(matches!(self.get(name)?, Value::Null))
    }

    pub fn is_null_at(&self, index: usize) -> Result<bool> {
        Ok(matches!(self.get_at(index)?, Value::Null))
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name)? {
            Value::Null => Ok(None),
            Value::Boolean(v) => Ok(Some(*v)),
            other => Err(type_mismatch(name, "bool", other)),
        }
    }

    pub fn get_i32(&self, name: &str) -> Result<Option<i32>> {
        match self.get(name)? {
            Value::Null => Ok(None),
            Value::Int32(v) => Ok(Some(*v)),
            other => Err(type_mismatch(name, "i32", other)),
        }
    }

    pub fn get_i64(&self, name: &str) -> Result<Option<i64>> {
        match self.get(name)? {
            Value::Null => Ok(None),
            Value::Int64(v) => Ok(Some(*v)),
            other => Err(type_mismatch(name, "i64", other)),
        }
    }

    pub fn get_f32(&self, name: &str) -> Result<Option<f32>> {
        match self.get(name)? {
            Value::Null => Ok(None),
            Value::Float(v) => Ok(Some(*v)),
            other => Err(type_mismatch(name, "f32", other)),
        }
    }

    pub fn get_f64(&self, name: &str) -> Result<Option<f64>> {
        match self.get(name)? {
            Value::Null => Ok(None),
            Value::Double(v) => Ok(Some(*v)),
            other => Err(type_mismatch(name, "f64", other)),
        }
    }

    pub fn get_bytes(&self, name: &str) -> Result<Option<bytes::Bytes>> {
        match self.get(name)? {
            Value::Null => Ok(None),
            Value::Bytes(v) => Ok(Some(v.clone())),
            other => Err(type_mismatch(name, "bytes", other)),
        }
    }

    /// Escape hatch for nested fields: returns the raw assembled value
    /// (`Struct`/`List`/`Map`/scalar) for callers that want to walk nested
    /// data themselves instead of using the flat scalar accessors.
    pub fn get_value(&self, name: &str) -> Result<&Value> {
        self.get(name)
    }

    /// Same as [`Row::get_value`], addressed by projected index instead of
    /// name.
    pub fn get_value_at(&self, index: usize) -> Result<&Value> {
        self.get_at(index)
    }

    pub fn get_i32_at(&self, index: usize) -> Result<Option<i32>> {
        match self.get_at(index)? {
            Value::Null => Ok(None),
            Value::Int32(v) => Ok(Some(*v)),
            other => Err(type_mismatch_at(index, "i32", other)),
        }
    }

    pub fn get_i64_at(&self, index: usize) -> Result<Option<i64>> {
        match self.get_at(index)? {
            Value::Null => Ok(None),
            Value::Int64(v) => Ok(Some(*v)),
            other => Err(type_mismatch_at(index, "i64", other)),
        }
    }

    pub fn get_bool_at(&self, index: usize) -> Result<Option<bool>> {
        match self.get_at(index)? {
            Value::Null => Ok(None),
            Value::Boolean(v) => Ok(Some(*v)),
            other => Err(type_mismatch_at(index, "bool", other)),
        }
    }

    pub fn get_f32_at(&self, index: usize) -> Result<Option<f32>> {
        match self.get_at(index)? {
            Value::Null => Ok(None),
            Value::Float(v) => Ok(Some(*v)),
            other => Err(type_mismatch_at(index, "f32", other)),
        }
    }

    pub fn get_f64_at(&self, index: usize) -> Result<Option<f64>> {
        match self.get_at(index)? {
            Value::Null => Ok(None),
            Value::Double(v) => Ok(Some(*v)),
            other => Err(type_mismatch_at(index, "f64", other)),
        }
    }

    pub fn get_bytes_at(&self, index: usize) -> Result<Option<bytes::Bytes>> {
        match self.get_at(index)? {
            Value::Null => Ok(None),
            Value::Bytes(v) => Ok(Some(v.clone())),
            other => Err(type_mismatch_at(index, "bytes", other)),
        }
    }
}

fn type_mismatch(name: &str, wanted: &str, found: &Value) -> crate::error::ParquetError {
    fail!(TypeMismatch, "field {name}: expected {wanted}, found {found:?}")
}

fn type_mismatch_at(index: usize, wanted: &str, found: &Value) -> crate::error::ParquetError {
    fail!(TypeMismatch, "field index {index}: expected {wanted}, found {found:?}")
}
