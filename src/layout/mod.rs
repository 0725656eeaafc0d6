//! # Source Layout
//!
//! Read-only description of a source Parquet file: its schema and the byte
//! ranges of every column chunk, grouped by row group. A
//! [`StructuralReader`] produces the layout and gives access to row data for
//! custom metadata derivation.

mod parquet_reader;


use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{InfParquetError, Result};
use crate::value::Scalar;

pub use parquet_reader::ParquetStructuralReader;

/// One leaf column of the source schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Dotted column path
    pub name: String,
    /// Physical storage type (e.g. `INT64`, `BYTE_ARRAY`)
    pub physical_type: String,
    /// Logical annotation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_type: Option<String>,
}

/// Statistics the source file records for one column chunk
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnStatistics {
    /// Minimum value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Scalar>,
    /// Maximum value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Scalar>,
    /// Number of nulls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_count: Option<u64>,
}

/// Byte range of one column within one row group
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChunk {
    /// Column position within the schema
    pub column_index: usize,
    /// Dotted column path
    pub path: String,
    /// Physical storage type
    pub physical_type: String,
    /// Start offset in the source file
    pub offset: u64,
    /// Length in bytes
    pub length: u64,
    /// Source-recorded statistics
    pub statistics: Option<ColumnStatistics>,
}

/// A horizontal partition of the source file
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    /// Row group position (0-based)
    pub index: usize,
    /// Number of rows
    pub num_rows: i64,
    /// Sum of the column chunk lengths
    pub byte_size: u64,
    /// Chunks in schema column order
    pub columns: Vec<ColumnChunk>,
}

/// Schema plus row-group/column-chunk boundaries of a source file
#[derive(Debug, Clone, PartialEq)]
pub struct ParquetLayout {
    /// Total size of the source file
    pub source_size: u64,
    /// Leaf columns in schema order
    pub schema: Vec<SchemaField>,
    /// Row groups in file order
    pub row_groups: Vec<RowGroup>,
}

/// A byte range `[offset, offset + length)` of the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start offset
    pub offset: u64,
    /// Length in bytes
    pub length: u64,
}

impl ByteRange {
    /// Exclusive end offset
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

impl ParquetLayout {
    /// Number of schema columns
    pub fn num_columns(&self) -> usize {
        self.schema.len()
    }

    /// Total rows across row groups
    pub fn num_rows(&self) -> i64 {
        self.row_groups.iter().map(|rg| rg.num_rows).sum()
    }

    /// Total number of column chunks
    pub fn num_chunks(&self) -> usize {
        self.row_groups.iter().map(|rg| rg.columns.len()).sum()
    }

    /// Check the structural invariants the pipeline relies on: every row
    /// group lists one chunk per schema column in order, `byte_size` equals
    /// the chunk total, and chunk ranges lie inside the file without
    /// overlapping.
    pub fn validate(&self) -> Result<()> {
        let mut ranges = Vec::with_capacity(self.num_chunks());

        for (i, rg) in self.row_groups.iter().enumerate() {
            if rg.index != i {
                return Err(InfParquetError::StructuralRead(format!(
                    "row group at position {} has index {}",
                    i, rg.index
                )));
            }
            if rg.columns.len() != self.schema.len() {
                return Err(InfParquetError::StructuralRead(format!(
                    "row group {} has {} column chunks, schema has {} columns",
                    i,
                    rg.columns.len(),
                    self.schema.len()
                )));
            }
            let mut total = 0u64;
            for (j, chunk) in rg.columns.iter().enumerate() {
                if chunk.column_index != j {
                    return Err(InfParquetError::StructuralRead(format!(
                        "row group {} lists column {} at position {}",
                        i, chunk.column_index, j
                    )));
                }
                let end = chunk.offset.checked_add(chunk.length).ok_or_else(|| {
                    InfParquetError::StructuralRead(format!(
                        "chunk ({}, {}) range overflows",
                        i, j
                    ))
                })?;
                if end > self.source_size {
                    return Err(InfParquetError::StructuralRead(format!(
                        "chunk ({}, {}) ends at {} beyond file size {}",
                        i, j, end, self.source_size
                    )));
                }
                total += chunk.length;
                if chunk.length > 0 {
                    ranges.push(ByteRange {
                        offset: chunk.offset,
                        length: chunk.length,
                    });
                }
            }
            if total != rg.byte_size {
                return Err(InfParquetError::StructuralRead(format!(
                    "row group {} byte size {} does not match chunk total {}",
                    i, rg.byte_size, total
                )));
            }
        }

        ranges.sort_by_key(|r| r.offset);
        for pair in ranges.windows(2) {
            if pair[0].end() > pair[1].offset {
                return Err(InfParquetError::StructuralRead(format!(
                    "column chunks overlap at offset {}",
                    pair[1].offset
                )));
            }
        }
        Ok(())
    }

    /// Byte ranges of the source not covered by any column chunk (magic
    /// bytes, page padding, footer), in ascending order.
    pub fn residual_ranges(&self) -> Vec<ByteRange> {
        let mut covered: Vec<ByteRange> = self
            .row_groups
            .iter()
            .flat_map(|rg| rg.columns.iter())
            .filter(|c| c.length > 0)
            .map(|c| ByteRange {
                offset: c.offset,
                length: c.length,
            })
            .collect();
        covered.sort_by_key(|r| r.offset);

        let mut gaps = Vec::new();
        let mut cursor = 0u64;
        for range in covered {
            if range.offset > cursor {
                gaps.push(ByteRange {
                    offset: cursor,
                    length: range.offset - cursor,
                });
            }
            cursor = cursor.max(range.end());
        }
        if cursor < self.source_size {
            gaps.push(ByteRange {
                offset: cursor,
                length: self.source_size - cursor,
            });
        }
        gaps
    }
}

/// Streaming iterator over the source's rows as Arrow record batches
pub type BatchIterator = Box<dyn Iterator<Item = Result<RecordBatch>> + Send>;

/// Row data of a source file
pub struct RowBatches {
    /// Arrow schema shared by every batch
    pub schema: SchemaRef,
    /// Batches in file order
    pub batches: BatchIterator,
}

/// Parses a source file's structure and exposes its row data.
pub trait StructuralReader: Send + Sync {
    /// Read schema and chunk boundaries from the source bytes
    fn read_layout(&self, source: &Bytes) -> Result<ParquetLayout>;

    /// Stream the source rows
    fn read_batches(&self, source: &Bytes) -> Result<RowBatches>;
}
