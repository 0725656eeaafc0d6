use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{InfParquetError, Result};
use crate::layout::{ColumnStatistics, SchemaField};
use crate::value::CustomValue;

/// Current sidecar document format version
pub const FORMAT_VERSION: &str = "1.0";

/// Codec parameters used for every unit of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecParams {
    /// Codec identifier
    pub codec: String,
    /// Compression level (1-9)
    pub level: i32,
}

/// Identity of the source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// File name of the source
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// CRC32 of the whole source file
    pub checksum: String,
}

/// Per-row-group summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowGroupInfo {
    /// Row group position (0-based)
    pub index: usize,
    /// Number of rows (omitted when basic statistics were not requested)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_rows: Option<i64>,
    /// Original byte size: the sum of its chunks' original lengths
    pub byte_size: u64,
}

/// Location and integrity data of one compressed column chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedChunk {
    /// Row group index (0-based)
    pub row_group_index: usize,
    /// Column index in schema order (0-based)
    pub column_index: usize,
    /// Dotted column path
    pub column_path: String,
    /// Offset of the chunk in the source file
    pub original_offset: u64,
    /// Length of the chunk in the source file
    pub original_length: u64,
    /// Offset of the compressed bytes in the blob
    pub compressed_offset: u64,
    /// Length of the compressed bytes
    pub compressed_length: u64,
    /// Codec level used
    pub level: i32,
    /// CRC32 of the compressed bytes
    pub checksum: String,
    /// Statistics copied from the source footer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ColumnStatistics>,
}

impl CompressedChunk {
    /// Original-to-compressed size ratio (1.0 for empty chunks)
    pub fn compression_ratio(&self) -> f64 {
        if self.compressed_length == 0 {
            1.0
        } else {
            self.original_length as f64 / self.compressed_length as f64
        }
    }
}

/// A compressed source range that is not part of any column chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidualSegment {
    /// Offset in the source file
    pub original_offset: u64,
    /// Length in the source file
    pub original_length: u64,
    /// Offset of the compressed bytes in the blob
    pub compressed_offset: u64,
    /// Length of the compressed bytes
    pub compressed_length: u64,
    /// CRC32 of the compressed bytes
    pub checksum: String,
}

/// Write-once description of one compression run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicMetadata {
    /// Sidecar format version
    pub format_version: String,
    /// Unique identifier of the compression run
    pub run_id: Uuid,
    /// When the run completed
    pub created_at: DateTime<Utc>,
    /// Source file identity
    pub source: SourceInfo,
    /// Blob file name, relative to the document
    pub blob_file: String,
    /// Total blob size in bytes
    pub blob_size: u64,
    /// Leaf columns in schema order
    pub schema: Vec<SchemaField>,
    /// Number of row groups
    pub num_row_groups: usize,
    /// Number of schema columns
    pub num_columns: usize,
    /// Codec parameters
    pub codec: CodecParams,
    /// Row group summaries
    pub row_groups: Vec<RowGroupInfo>,
    /// Chunks ordered by (row_group_index, column_index)
    pub chunks: Vec<CompressedChunk>,
    /// Non-chunk source ranges ordered by original offset
    #[serde(default)]
    pub residual_segments: Vec<ResidualSegment>,
}

impl BasicMetadata {
    /// Total rows, if row counts were recorded
    pub fn num_rows(&self) -> Option<i64> {
        self.row_groups.iter().map(|rg| rg.num_rows).sum()
    }

    /// Chunk at (row group, column)
    pub fn chunk(&self, row_group_index: usize, column_index: usize) -> Option<&CompressedChunk> {
        if column_index >= self.num_columns {
            return None;
        }
        self.chunks
            .get(row_group_index * self.num_columns + column_index)
            .filter(|c| c.row_group_index == row_group_index && c.column_index == column_index)
    }

    /// Chunks of one row group in column order
    pub fn row_group_chunks(&self, row_group_index: usize) -> &[CompressedChunk] {
        let start = (row_group_index * self.num_columns).min(self.chunks.len());
        let end = (start + self.num_columns).min(self.chunks.len());
        &self.chunks[start..end]
    }

    /// Original-to-blob size ratio
    pub fn compression_ratio(&self) -> f64 {
        if self.blob_size == 0 {
            1.0
        } else {
            self.source.size as f64 / self.blob_size as f64
        }
    }

    /// Check the ordering, size and coverage invariants.
    ///
    /// Chunks must be strictly ordered by (row group, column) with exactly
    /// one chunk per pair; each row group's chunk lengths must sum to its
    /// byte size; chunk and residual source ranges must tile the source file;
    /// compressed slices must lie inside the blob.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(InfParquetError::Metadata(msg));

        if self.format_version != FORMAT_VERSION {
            return invalid(format!(
                "unsupported format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            ));
        }
        if self.num_columns != self.schema.len() {
            return invalid(format!(
                "num_columns {} does not match schema of {} columns",
                self.num_columns,
                self.schema.len()
            ));
        }
        if self.num_row_groups != self.row_groups.len() {
            return invalid(format!(
                "num_row_groups {} does not match {} row group entries",
                self.num_row_groups,
                self.row_groups.len()
            ));
        }
        let expected_chunks = match self.num_row_groups.checked_mul(self.num_columns) {
            Some(n) => n,
            None => {
                return invalid(format!(
                    "{} row groups x {} columns overflows",
                    self.num_row_groups, self.num_columns
                ))
            }
        };
        if self.chunks.len() != expected_chunks {
            return invalid(format!(
                "expected {} chunks, found {}",
                expected_chunks,
                self.chunks.len()
            ));
        }

        for (i, chunk) in self.chunks.iter().enumerate() {
            let expected = (i / self.num_columns.max(1), i % self.num_columns.max(1));
            if (chunk.row_group_index, chunk.column_index) != expected {
                return invalid(format!(
                    "chunk {} is ({}, {}), expected ({}, {})",
                    i, chunk.row_group_index, chunk.column_index, expected.0, expected.1
                ));
            }
            if !within(chunk.compressed_offset, chunk.compressed_length, self.blob_size) {
                return invalid(format!(
                    "chunk ({}, {}) exceeds blob size {}",
                    chunk.row_group_index, chunk.column_index, self.blob_size
                ));
            }
            if !within(chunk.original_offset, chunk.original_length, self.source.size) {
                return invalid(format!(
                    "chunk ({}, {}) exceeds source size {}",
                    chunk.row_group_index, chunk.column_index, self.source.size
                ));
            }
        }

        for (i, rg) in self.row_groups.iter().enumerate() {
            if rg.index != i {
                return invalid(format!("row group entry {} has index {}", i, rg.index));
            }
            let total = self
                .row_group_chunks(i)
                .iter()
                .try_fold(0u64, |acc, c| acc.checked_add(c.original_length));
            if total != Some(rg.byte_size) {
                return invalid(format!(
                    "row group {} byte size {} does not match chunk total {}",
                    i,
                    rg.byte_size,
                    total.map_or_else(|| "(overflow)".to_string(), |t| t.to_string())
                ));
            }
        }

        for seg in &self.residual_segments {
            if !within(seg.compressed_offset, seg.compressed_length, self.blob_size) {
                return invalid(format!(
                    "residual segment at {} exceeds blob size {}",
                    seg.original_offset, self.blob_size
                ));
            }
        }

        let mut ranges: Vec<(u64, u64)> = self
            .chunks
            .iter()
            .filter(|c| c.original_length > 0)
            .map(|c| (c.original_offset, c.original_length))
            .chain(
                self.residual_segments
                    .iter()
                    .map(|s| (s.original_offset, s.original_length)),
            )
            .collect();
        ranges.sort_unstable();
        let mut cursor = 0u64;
        for (offset, length) in ranges {
            if offset != cursor {
                return invalid(format!(
                    "source ranges do not tile the file (gap or overlap at {})",
                    cursor
                ));
            }
            cursor = match offset.checked_add(length) {
                Some(end) => end,
                None => return invalid(format!("source range at {} overflows", offset)),
            };
        }
        if cursor != self.source.size {
            return invalid(format!(
                "source ranges cover {} of {} bytes",
                cursor, self.source.size
            ));
        }
        Ok(())
    }
}

/// Whether `[offset, offset + length)` lies inside `[0, size)`
fn within(offset: u64, length: u64, size: u64) -> bool {
    offset.checked_add(length).is_some_and(|end| end <= size)
}

/// A named value derived from the source data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMetadataItem {
    /// Unique name within the document
    pub name: String,
    /// Derivation query the value came from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Computed value
    pub value: CustomValue,
    /// When the value was computed
    pub computed_at: DateTime<Utc>,
}

/// Basic metadata plus named custom items: the persisted sidecar document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Layout and codec information for reconstruction
    pub basic: BasicMetadata,
    /// Custom items keyed by name
    #[serde(default)]
    pub custom: BTreeMap<String, CustomMetadataItem>,
}

impl MetadataDocument {
    /// Wrap basic metadata with an empty custom map
    pub fn new(basic: BasicMetadata) -> Self {
        Self {
            basic,
            custom: BTreeMap::new(),
        }
    }

    /// Set `name` to `value`, replacing any existing item of that name
    pub fn add_custom(&mut self, name: &str, value: CustomValue) -> Result<&CustomMetadataItem> {
        self.insert_custom(name, None, value)
    }

    /// Set `name` to a value derived from `query`
    pub fn insert_custom(
        &mut self,
        name: &str,
        query: Option<String>,
        value: CustomValue,
    ) -> Result<&CustomMetadataItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InfParquetError::InvalidParameter(
                "custom metadata name must not be empty".to_string(),
            ));
        }
        let item = CustomMetadataItem {
            name: name.to_string(),
            query,
            value: value.normalized(),
            computed_at: Utc::now(),
        };
        self.custom.insert(name.to_string(), item);
        Ok(&self.custom[name])
    }

    /// Remove a custom item, returning it if it existed
    pub fn remove_custom(&mut self, name: &str) -> Option<CustomMetadataItem> {
        self.custom.remove(name)
    }

    /// Look up a custom item by exact name
    pub fn custom(&self, name: &str) -> Option<&CustomMetadataItem> {
        self.custom.get(name)
    }
}
