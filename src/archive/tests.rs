use std::fs;
use std::path::PathBuf;

use tempfile::{tempdir, TempDir};

use super::*;
use crate::error::{ErrorKind, UnitId};
use crate::pipeline::{NoProgress, Progress};
use crate::testing::sales_parquet;

fn options() -> CompressOptions {
    CompressOptions {
        level: 3,
        workers: 2,
        include_basic_metadata: true,
    }
}

/// Write the sales fixture into a fresh directory
fn source_file() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.parquet");
    fs::write(&path, sales_parquet(300, 100)).unwrap();
    (dir, path)
}

fn definitions() -> Vec<Definition> {
    vec![
        Definition {
            name: "total_rows".into(),
            query: "SELECT COUNT(*) FROM data".into(),
        },
        Definition {
            name: "bad".into(),
            query: "SELECT SUM(city) FROM data".into(),
        },
    ]
}

#[test]
fn test_paths() {
    let paths = ArchivePaths::for_source("/data/in/sales.parquet", "/out").unwrap();
    assert_eq!(paths.blob, PathBuf::from("/out/sales.parquet.infpq"));
    assert_eq!(paths.document, PathBuf::from("/out/sales.parquet.infpq.json"));
    assert_eq!(
        incomplete_path("/out/restored.parquet"),
        PathBuf::from("/out/restored.parquet.incomplete")
    );
    assert!(ArchivePaths::for_source("/", "/out").is_err());
}

#[test]
fn test_round_trip() {
    let (dir, input) = source_file();
    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let archive = Archive::default();

    let report = archive
        .compress_file(&input, &out, &options(), &definitions(), &NoProgress)
        .unwrap();
    assert!(report.paths.blob.exists());
    assert!(report.paths.document.exists());
    assert_eq!(report.chunks, 3 * 4);
    assert_eq!(report.custom.succeeded(), 1);
    assert_eq!(report.custom.failures().count(), 1);

    let document = MetadataDocument::load(&report.paths.document).unwrap();
    assert_eq!(document.basic.blob_file, "sales.parquet.infpq");
    assert_eq!(
        document.custom("total_rows").unwrap().value,
        CustomValue::from(300i64)
    );
    assert!(document.custom("bad").is_none());

    let restored = dir.path().join("restored.parquet");
    let result = archive
        .decompress_file(
            &report.paths.document,
            &restored,
            &DecompressOptions { workers: 3 },
            &NoProgress,
        )
        .unwrap();
    assert_eq!(result.bytes_written, fs::metadata(&input).unwrap().len());
    assert_eq!(fs::read(&restored).unwrap(), fs::read(&input).unwrap());
    assert!(!incomplete_path(&restored).exists());
}

#[test]
fn test_cancelled_compression_writes_nothing() {
    let (dir, input) = source_file();
    let archive = Archive::default();
    let cancel = |_: &Progress| false;

    let err = archive
        .compress_file(&input, dir.path(), &options(), &[], &cancel)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    let paths = ArchivePaths::for_source(&input, dir.path()).unwrap();
    assert!(!paths.document.exists());
    assert!(!paths.blob.exists());
    assert!(MetadataDocument::load(&paths.document).is_err());
}

#[test]
fn test_parameters_checked_before_reading() {
    let dir = tempdir().unwrap();
    let archive = Archive::default();
    let bad = CompressOptions {
        level: 0,
        ..options()
    };
    let missing = dir.path().join("missing.parquet");

    let err = archive
        .compress_file(&missing, dir.path(), &bad, &[], &NoProgress)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let err = archive
        .compress_file(&missing, dir.path(), &options(), &[], &NoProgress)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = archive
        .compress_file("", dir.path(), &options(), &[], &NoProgress)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn test_not_parquet_is_structural_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("notes.parquet");
    fs::write(&input, b"definitely not a parquet file").unwrap();
    let err = Archive::default()
        .compress_file(&input, dir.path(), &options(), &[], &NoProgress)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralReadError);
}

#[test]
fn test_corrupted_blob_leaves_marked_partial_output() {
    let (dir, input) = source_file();
    let archive = Archive::default();
    let report = archive
        .compress_file(&input, dir.path(), &options(), &[], &NoProgress)
        .unwrap();

    let document = MetadataDocument::load(&report.paths.document).unwrap();
    let target = document.basic.chunk(1, 1).unwrap().clone();
    let mut blob = fs::read(&report.paths.blob).unwrap();
    blob[target.compressed_offset as usize] ^= 0xFF;
    fs::write(&report.paths.blob, &blob).unwrap();

    let restored = dir.path().join("restored.parquet");
    fs::write(&restored, b"previous contents").unwrap();
    let err = archive
        .decompress_file(
            &report.paths.document,
            &restored,
            &DecompressOptions { workers: 1 },
            &NoProgress,
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DecompressionError);
    assert_eq!(
        err.unit(),
        Some(UnitId::Chunk {
            row_group_index: 1,
            column_index: 1
        })
    );
    let InfParquetError::Decompression {
        incomplete_output: Some(partial),
        ..
    } = &err
    else {
        panic!("expected an incomplete output path, got {:?}", err);
    };
    assert_eq!(partial, &incomplete_path(&restored));

    // The previous output is untouched and the partial file is a true prefix
    assert_eq!(fs::read(&restored).unwrap(), b"previous contents");
    let prefix = fs::read(partial).unwrap();
    let original = fs::read(&input).unwrap();
    assert!(prefix.len() as u64 <= target.original_offset);
    assert_eq!(&original[..prefix.len()], prefix.as_slice());

    let integrity = archive
        .verify(&report.paths.document, &DecompressOptions::default(), &NoProgress)
        .unwrap();
    assert!(!integrity.is_ok());
    assert_eq!(integrity.failures.len(), 1);
}

#[test]
fn test_missing_blob_is_not_found() {
    let (dir, input) = source_file();
    let archive = Archive::default();
    let report = archive
        .compress_file(&input, dir.path(), &options(), &[], &NoProgress)
        .unwrap();
    fs::remove_file(&report.paths.blob).unwrap();
    let err = archive
        .decompress_file(
            &report.paths.document,
            dir.path().join("x.parquet"),
            &DecompressOptions::default(),
            &NoProgress,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_custom_metadata_after_compression() {
    let (dir, input) = source_file();
    let archive = Archive::default();
    let report = archive
        .compress_file(&input, dir.path(), &options(), &[], &NoProgress)
        .unwrap();
    let document_path = &report.paths.document;

    // Rows come from the archive itself when no source is given
    let added = archive
        .add_custom(
            document_path,
            &[Definition {
                name: "max_id".into(),
                query: "SELECT MAX(id)".into(),
            }],
            None,
            &DecompressOptions::default(),
        )
        .unwrap();
    assert!(added.is_ok());

    set_custom(document_path, "owner", CustomValue::from("analytics")).unwrap();
    set_custom(document_path, "row_count", CustomValue::from(1000i64)).unwrap();
    set_custom(document_path, "row_count", CustomValue::from(2000i64)).unwrap();
    assert!(remove_custom(document_path, "owner").unwrap());
    assert!(!remove_custom(document_path, "owner").unwrap());

    let document = MetadataDocument::load(document_path).unwrap();
    assert_eq!(document.custom.len(), 2);
    assert_eq!(
        document.custom("max_id").unwrap().value,
        CustomValue::from(299i64)
    );
    assert_eq!(
        document.custom("row_count").unwrap().value,
        CustomValue::from(2000i64)
    );

    let hit = query_documents(&[document_path], "SELECT * WHERE row_count > 1500").unwrap();
    assert_eq!(hit.matching_files, vec!["sales.parquet".to_string()]);
    let miss = query_documents(&[document_path], "SELECT * WHERE row_count > 2500").unwrap();
    assert!(miss.success && miss.is_empty());

    let summary = list(document_path).unwrap().to_string();
    assert!(summary.contains("max_id = 299"));
    assert!(summary.contains("Row groups (3)"));
}

#[test]
fn test_query_requires_documents() {
    let none: [&str; 0] = [];
    let err = query_documents(&none, "SELECT *").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}
