//! Shared fixtures for the integration tests

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use infparquet::pipeline::CompressOptions;

const STATIONS: [&str; 4] = ["north", "south", "east", "west"];

/// Parquet file with `rows` rows of sensor readings split into row groups
/// of `row_group_size` rows.
///
/// Columns: `reading_id` (Int64), `temperature` (Float64, null every 7th
/// row), `station` (Utf8), `calibrated` (Boolean).
#[allow(dead_code)]
pub fn readings_parquet(rows: usize, row_group_size: usize) -> Vec<u8> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("reading_id", DataType::Int64, false),
        Field::new("temperature", DataType::Float64, true),
        Field::new("station", DataType::Utf8, false),
        Field::new("calibrated", DataType::Boolean, false),
    ]));

    let ids: Vec<i64> = (0..rows as i64).collect();
    let temperature: Float64Array = ids
        .iter()
        .map(|&i| (i % 7 != 6).then(|| -10.0 + (i % 50) as f64))
        .collect();
    let station: StringArray = ids
        .iter()
        .map(|&i| Some(STATIONS[(i % 4) as usize]))
        .collect();
    let calibrated: BooleanArray = ids.iter().map(|&i| Some(i % 3 == 0)).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(ids)),
        Arc::new(temperature),
        Arc::new(station),
        Arc::new(calibrated),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

    let props = WriterProperties::builder()
        .set_dictionary_enabled(false)
        .set_max_row_group_size(row_group_size)
        .build();
    let mut out = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut out, schema, Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    out
}

/// Write the fixture as `name` under `dir` and return its path
#[allow(dead_code)]
pub fn write_readings(dir: &Path, name: &str, rows: usize, row_group_size: usize) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, readings_parquet(rows, row_group_size)).unwrap();
    path
}

/// Small, fast settings for tests
#[allow(dead_code)]
pub fn test_options() -> CompressOptions {
    CompressOptions {
        level: 3,
        workers: 4,
        include_basic_metadata: true,
    }
}
