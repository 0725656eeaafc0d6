//! Document fixtures shared by unit tests.

use std::sync::Arc;

use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use uuid::Uuid;

use crate::layout::{ColumnStatistics, SchemaField};
use crate::metadata::{
    BasicMetadata, CodecParams, CompressedChunk, MetadataDocument, ResidualSegment, RowGroupInfo,
    SourceInfo, FORMAT_VERSION,
};
use crate::value::Scalar;

fn field(name: &str, physical_type: &str) -> SchemaField {
    SchemaField {
        name: name.to_string(),
        physical_type: physical_type.to_string(),
        logical_type: None,
    }
}

/// Two row groups of three columns (`id`, `price`, `city`).
///
/// Row group 0 holds ids 0..100 and prices 1.0..50.0, row group 1 holds ids
/// 100..150 and prices 60.0..90.0 with 5 null prices. Chunk lengths are
/// 100 bytes each with 40-byte compressed slices.
pub(crate) fn sample_document() -> MetadataDocument {
    let schema = vec![
        field("id", "INT64"),
        field("price", "DOUBLE"),
        field("city", "BYTE_ARRAY"),
    ];
    let stats = [
        [
            (Scalar::Int(0), Scalar::Int(99), 0),
            (Scalar::Float(1.0), Scalar::Float(50.0), 0),
            (Scalar::from("Austin"), Scalar::from("Denver"), 0),
        ],
        [
            (Scalar::Int(100), Scalar::Int(149), 0),
            (Scalar::Float(60.0), Scalar::Float(90.0), 5),
            (Scalar::from("Boston"), Scalar::from("Seattle"), 2),
        ],
    ];

    let mut chunks = Vec::new();
    let mut original_offset = 4u64;
    let mut compressed_offset = 0u64;
    for (rg, rg_stats) in stats.iter().enumerate() {
        for (col, (min, max, nulls)) in rg_stats.iter().enumerate() {
            chunks.push(CompressedChunk {
                row_group_index: rg,
                column_index: col,
                column_path: schema[col].name.clone(),
                original_offset,
                original_length: 100,
                compressed_offset,
                compressed_length: 40,
                level: 9,
                checksum: format!("{:08x}", rg * 10 + col),
                statistics: Some(ColumnStatistics {
                    min: Some(min.clone()),
                    max: Some(max.clone()),
                    null_count: Some(*nulls),
                }),
            });
            original_offset += 100;
            compressed_offset += 40;
        }
    }

    let residual_segments = vec![
        ResidualSegment {
            original_offset: 0,
            original_length: 4,
            compressed_offset,
            compressed_length: 13,
            checksum: "0000aaaa".to_string(),
        },
        ResidualSegment {
            original_offset,
            original_length: 96,
            compressed_offset: compressed_offset + 13,
            compressed_length: 50,
            checksum: "0000bbbb".to_string(),
        },
    ];
    let blob_size = compressed_offset + 63;

    let basic = BasicMetadata {
        format_version: FORMAT_VERSION.to_string(),
        run_id: Uuid::nil(),
        created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        source: SourceInfo {
            name: "sales.parquet".to_string(),
            size: original_offset + 96,
            checksum: "12345678".to_string(),
        },
        blob_file: "sales.parquet.infpq".to_string(),
        blob_size,
        schema,
        num_row_groups: 2,
        num_columns: 3,
        codec: CodecParams {
            codec: "zstd".to_string(),
            level: 9,
        },
        row_groups: vec![
            RowGroupInfo {
                index: 0,
                num_rows: Some(100),
                byte_size: 300,
            },
            RowGroupInfo {
                index: 1,
                num_rows: Some(50),
                byte_size: 300,
            },
        ],
        chunks,
        residual_segments,
    };
    MetadataDocument::new(basic)
}

const CITIES: [&str; 3] = ["Austin", "Boston", "Denver"];

/// In-memory parquet file with columns `id` (0..rows), `price`
/// (`id * 0.5`, null when `id % 10 == 9`), `city` (cycling Austin, Boston,
/// Denver) and `active` (`id` is even).
pub(crate) fn sales_parquet(rows: usize, row_group_size: usize) -> Bytes {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("price", DataType::Float64, true),
        Field::new("city", DataType::Utf8, false),
        Field::new("active", DataType::Boolean, false),
    ]));
    let ids: Vec<i64> = (0..rows as i64).collect();
    let price: Float64Array = ids
        .iter()
        .map(|&i| if i % 10 == 9 { None } else { Some(i as f64 * 0.5) })
        .collect();
    let city: StringArray = ids.iter().map(|&i| Some(CITIES[(i % 3) as usize])).collect();
    let active: BooleanArray = ids.iter().map(|&i| Some(i % 2 == 0)).collect();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(price),
            Arc::new(city),
            Arc::new(active),
        ],
    )
    .unwrap();

    let props = WriterProperties::builder()
        .set_max_row_group_size(row_group_size)
        .set_dictionary_enabled(false)
        .build();
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    Bytes::from(buffer)
}
