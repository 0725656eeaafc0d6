use super::*;
use crate::testing::sample_document;
use crate::value::{CustomValue, Scalar};
use crate::ErrorKind;
use tempfile::tempdir;

#[test]
fn test_sample_document_is_valid() {
    let doc = sample_document();
    doc.basic.validate().unwrap();
    assert_eq!(doc.basic.num_rows(), Some(150));
    assert_eq!(doc.basic.chunk(1, 2).unwrap().column_path, "city");
    assert!(doc.basic.chunk(0, 3).is_none());
    assert_eq!(doc.basic.row_group_chunks(1).len(), 3);
}

#[test]
fn test_save_load_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");

    let mut doc = sample_document();
    doc.add_custom("total_rows", CustomValue::from(150i64)).unwrap();
    doc.save(&path).unwrap();

    let loaded = MetadataDocument::load(&path).unwrap();
    assert_eq!(loaded, doc);

    // Re-saving an unmodified document is byte-stable
    let first = std::fs::read(&path).unwrap();
    loaded.save(&path).unwrap();
    let second = std::fs::read(&path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_add_custom_overwrites() {
    let mut doc = sample_document();
    doc.add_custom("row_count", CustomValue::from(1000i64)).unwrap();
    doc.add_custom("row_count", CustomValue::from(2000i64)).unwrap();

    assert_eq!(doc.custom.len(), 1);
    assert_eq!(
        doc.custom("row_count").unwrap().value,
        CustomValue::Scalar(Scalar::Int(2000))
    );
}

#[test]
fn test_add_custom_rejects_empty_name() {
    let mut doc = sample_document();
    let err = doc.add_custom("  ", CustomValue::from(1i64)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert!(doc.custom.is_empty());
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    let err = MetadataDocument::load(dir.path().join("nope.json")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_load_malformed_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ \"basic\": 42 }").unwrap();
    let err = MetadataDocument::load(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MetadataError);
}

#[test]
fn test_validate_rejects_unordered_chunks() {
    let mut doc = sample_document();
    doc.basic.chunks.swap(0, 1);
    let err = doc.basic.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MetadataError);
}

#[test]
fn test_validate_rejects_size_mismatch() {
    let mut doc = sample_document();
    doc.basic.row_groups[0].byte_size += 1;
    assert!(doc.basic.validate().is_err());
}

#[test]
fn test_validate_rejects_coverage_gap() {
    let mut doc = sample_document();
    doc.basic.residual_segments.pop();
    assert!(doc.basic.validate().is_err());
}

#[test]
fn test_update_appends_custom_item() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    sample_document().save(&path).unwrap();

    MetadataDocument::update(&path, |doc| {
        doc.add_custom("owner", CustomValue::from("analytics"))?;
        Ok(())
    })
    .unwrap();

    let loaded = MetadataDocument::load(&path).unwrap();
    assert_eq!(
        loaded.custom("owner").unwrap().value.as_scalar(),
        Some(&Scalar::from("analytics"))
    );
}

#[test]
fn test_update_refuses_basic_changes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    let original = sample_document();
    original.save(&path).unwrap();

    let err = MetadataDocument::update(&path, |doc| {
        doc.basic.source.name = "other.parquet".into();
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert_eq!(MetadataDocument::load(&path).unwrap(), original);
}

#[test]
fn test_load_rejects_overflowing_ranges() {
    let mut doc = sample_document();
    doc.basic.chunks[0].compressed_offset = u64::MAX;
    let err = MetadataDocument::from_json(&doc.to_json().unwrap()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MetadataError);

    let mut doc = sample_document();
    doc.basic.residual_segments[0].original_offset = u64::MAX;
    let err = MetadataDocument::from_json(&doc.to_json().unwrap()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MetadataError);
}

#[test]
fn test_validate_rejects_chunk_beyond_source() {
    let mut doc = sample_document();
    let size = doc.basic.source.size;
    doc.basic.chunks[2].original_offset = size + 1;
    let err = doc.basic.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MetadataError);
    assert!(err.to_string().contains("exceeds source size"), "{}", err);
}

#[test]
fn test_non_finite_custom_value_survives_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    let mut doc = sample_document();
    doc.add_custom("mean_ratio", CustomValue::Scalar(Scalar::Float(f64::NAN)))
        .unwrap();
    assert_eq!(
        doc.custom("mean_ratio").unwrap().value,
        CustomValue::Scalar(Scalar::Null)
    );

    doc.save(&path).unwrap();
    assert_eq!(MetadataDocument::load(&path).unwrap(), doc);
}
