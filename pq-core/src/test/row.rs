use std::fs;
use std::sync::atomic::AtomicBool;

use crate::codec::DefaultCodecs;
use crate::column::decode_column_chunk;
use crate::config::ReaderOptions;
use crate::ioutil::MemRegion;
use crate::metadata::read_footer;
use crate::row::RowReader;
use crate::schema::Schema;

use super::fixtures;

#[test]
fn test_component_pipeline_decodes_required_column_chunk() {
    let file = fixtures::build_required_int32_file(&[10, 20, 30]);
    let region = MemRegion::new(file);
    let meta = read_footer(&region).unwrap();
    let schema = Schema::build(&meta.schema).unwrap();
    let desc = &schema.columns[0];
    let chunk = &meta.row_groups[0].columns[0].meta_data;

    let not_closed = AtomicBool::new(false);
    let batch = decode_column_chunk(&region, &DefaultCodecs, chunk, desc, &ReaderOptions::default(), &not_closed).unwrap();
    assert_eq!(batch.def_levels, vec![0, 0, 0]);
    assert_eq!(batch.rep_levels, vec![0, 0, 0]);
    match batch.values {
        crate::value::TypedArray::Int32(v) => assert_eq!(v, vec![10, 20, 30]),
        other => panic!("unexpected {other:?}"),
    }
}

struct TempParquetFile {
    path: std::path::PathBuf,
}

impl TempParquetFile {
    fn new(name: &str, bytes: Vec<u8>) -> Self {
        let mut path = std::env::temp_dir();
        path.push(format!("pq-core-test-{name}-{}.parquet", std::process::id()));
        fs::write(&path, bytes).unwrap();
        TempParquetFile { path }
    }
}

impl Drop for TempParquetFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[test]
fn test_row_reader_single_file_iterates_all_rows() {
    let file = TempParquetFile::new("single", fixtures::build_required_int32_file(&[1, 2, 3]));
    let mut reader = RowReader::open([&file.path], ReaderOptions::default()).unwrap();

    assert_eq!(reader.total_num_rows().unwrap(), 3);

    let mut seen = Vec::new();
    while let Some(row) = reader.next().unwrap() {
        seen.push(row.get_i32("value").unwrap());
    }
    assert_eq!(seen, vec![Some(1), Some(2), Some(3)]);
    assert!(!reader.has_next().unwrap());
}

#[test]
fn test_row_reader_optional_column_reports_nulls() {
    let file = TempParquetFile::new("optional", fixtures::build_optional_int32_file(&[1, 0, 1], &[10, 20]));
    let mut reader = RowReader::open([&file.path], ReaderOptions::default()).unwrap();

    let mut rows = Vec::new();
    while let Some(row) = reader.next().unwrap() {
        rows.push(row);
    }
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get_i32("value").unwrap(), Some(10));
    assert!(rows[1].is_null("value").unwrap());
    assert_eq!(rows[1].get_i32("value").unwrap(), None);
    assert_eq!(rows[2].get_i32("value").unwrap(), Some(20));
}

#[test]
fn test_row_accessors_by_projected_index_match_by_name() {
    let file = TempParquetFile::new("by-index", fixtures::build_optional_int32_file(&[1, 0, 1], &[10, 20]));
    let mut reader = RowReader::open([&file.path], ReaderOptions::default()).unwrap();

    let mut rows = Vec::new();
    while let Some(row) = reader.next().unwrap() {
        rows.push(row);
    }
    assert_eq!(rows[0].field_count().unwrap(), 1);
    assert_eq!(rows[0].field_name(0).unwrap(), "value");
    assert_eq!(rows[0].get_i32_at(0).unwrap(), rows[0].get_i32("value").unwrap());
    assert!(rows[1].is_null_at(0).unwrap());
    assert_eq!(rows[1].get_i32_at(0).unwrap(), None);
    assert_eq!(rows[2].get_i32_at(0).unwrap(), Some(20));
    assert!(rows[0].get_bool_at(0).is_err());
}

#[test]
fn test_row_reader_spans_multiple_files_in_order() {
    let first = TempParquetFile::new("multi-a", fixtures::build_required_int32_file(&[1, 2]));
    let second = TempParquetFile::new("multi-b", fixtures::build_required_int32_file(&[3, 4]));
    let mut reader = RowReader::open([&first.path, &second.path], ReaderOptions::default()).unwrap();

    assert_eq!(reader.total_num_rows().unwrap(), 4);

    let mut seen = Vec::new();
    while let Some(row) = reader.next().unwrap() {
        seen.push(row.get_i32("value").unwrap().unwrap());
    }
    assert_eq!(seen, vec![1, 2, 3, 4]);
}

#[test]
fn test_row_reader_close_reports_no_more_rows_without_error() {
    let file = TempParquetFile::new("closed", fixtures::build_required_int32_file(&[1, 2, 3]));
    let mut reader = RowReader::open([&file.path], ReaderOptions::default()).unwrap();

    reader.close();
    assert!(!reader.has_next().unwrap());
    assert!(reader.next().unwrap().is_none());
}

#[test]
fn test_row_reader_rejects_empty_file_list() {
    let result = RowReader::open(Vec::<std::path::PathBuf>::new(), ReaderOptions::default());
    assert!(result.is_err());
}
