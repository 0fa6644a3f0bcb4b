use crate::basic::{Encoding, PageType};
use crate::page::{parse_page_header, PageHeaderData};

use super::fixtures::CompactWriter;

#[test]
fn test_parse_data_page_header_v1() {
    let mut w = CompactWriter::new();
    w.i32_field(1, 0); // PageType::DataPage
    w.i32_field(2, 123); // uncompressed_page_size
    w.i32_field(3, 100); // compressed_page_size
    w.struct_field(5);
    w.i32_field(1, 7); // num_values
    w.i32_field(2, 0); // Encoding::Plain
    w.stop();
    w.stop();
    let bytes = w.into_bytes();

    let (header, consumed) = parse_page_header(&bytes).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(header.page_type, PageType::DataPage);
    assert_eq!(header.uncompressed_page_size, 123);
    assert_eq!(header.compressed_page_size, 100);
    match header.data {
        PageHeaderData::Data(d) => {
            assert_eq!(d.num_values, 7);
            assert_eq!(d.encoding, Encoding::Plain);
        }
        other => panic!("expected Data header, got {other:?}"),
    }
}

#[test]
fn test_parse_dictionary_page_header() {
    let mut w = CompactWriter::new();
    w.i32_field(1, 2); // PageType::DictionaryPage
    w.i32_field(2, 40);
    w.i32_field(3, 40);
    w.struct_field(7);
    w.i32_field(1, 5);
    w.i32_field(2, 0);
    w.stop();
    w.stop();
    let bytes = w.into_bytes();

    let (header, _) = parse_page_header(&bytes).unwrap();
    match header.data {
        PageHeaderData::Dictionary(d) => assert_eq!(d.num_values, 5),
        other => panic!("expected Dictionary header, got {other:?}"),
    }
}

#[test]
fn test_page_header_missing_type_is_error() {
    let mut w = CompactWriter::new();
    w.i32_field(2, 1);
    w.i32_field(3, 1);
    w.stop();
    let bytes = w.into_bytes();
    assert!(parse_page_header(&bytes).is_err());
}

#[test]
fn test_scan_pages_matches_single_page_chunk() {
    use crate::ioutil::MemRegion;
    use crate::metadata::read_footer;
    use crate::page::scan_pages;

    let file = super::fixtures::build_required_int32_file(&[10, 20, 30]);
    let region = MemRegion::new(file);
    let meta = read_footer(&region).unwrap();
    let chunk = &meta.row_groups[0].columns[0].meta_data;
    let pages = scan_pages(&region, chunk).unwrap();
    assert_eq!(pages.len(), 1);
    match &pages[0].header.data {
        PageHeaderData::Data(d) => assert_eq!(d.num_values, 3),
        other => panic!("expected Data page, got {other:?}"),
    }
}
