use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::codec::{checksum, Codec, MAX_LEVEL, MIN_LEVEL};
use crate::error::{InfParquetError, Result, UnitId};
use crate::layout::ParquetLayout;
use crate::metadata::{
    BasicMetadata, CodecParams, CompressedChunk, ResidualSegment, RowGroupInfo, SourceInfo,
    FORMAT_VERSION,
};

use super::pool::{resolve_workers, run_batch, FailureMode, WorkUnit};
use super::progress::{NoProgress, ProgressObserver, ProgressTracker};

/// Options for a compression run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressOptions {
    /// Codec level, 1-9
    pub level: i32,
    /// Worker threads; 0 uses the available parallelism
    pub workers: usize,
    /// Record row counts and source column statistics in the document.
    /// When false only what reconstruction needs is kept.
    pub include_basic_metadata: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            level: MAX_LEVEL,
            workers: 0,
            include_basic_metadata: true,
        }
    }
}

impl CompressOptions {
    /// Reject out-of-range levels and worker counts
    pub fn validate(&self) -> Result<()> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.level) {
            return Err(InfParquetError::InvalidParameter(format!(
                "compression level {} is outside {}-{}",
                self.level, MIN_LEVEL, MAX_LEVEL
            )));
        }
        resolve_workers(self.workers)?;
        Ok(())
    }
}

/// Result of a successful run: the metadata and the blob it describes
#[derive(Debug, Clone)]
pub struct CompressedOutput {
    /// Layout, offsets and checksums of every unit
    pub metadata: BasicMetadata,
    /// Concatenated compressed bytes
    pub blob: Vec<u8>,
}

enum CompressUnit {
    Chunk {
        row_group_index: usize,
        column_index: usize,
        offset: u64,
        length: u64,
    },
    Residual {
        index: usize,
        offset: u64,
        length: u64,
    },
}

impl CompressUnit {
    fn range(&self) -> (u64, u64) {
        match *self {
            CompressUnit::Chunk { offset, length, .. } => (offset, length),
            CompressUnit::Residual { offset, length, .. } => (offset, length),
        }
    }
}

impl WorkUnit for CompressUnit {
    fn id(&self) -> UnitId {
        match *self {
            CompressUnit::Chunk {
                row_group_index,
                column_index,
                ..
            } => UnitId::Chunk {
                row_group_index,
                column_index,
            },
            CompressUnit::Residual { index, .. } => UnitId::Residual(index),
        }
    }
}

struct CompressedSlot {
    bytes: Vec<u8>,
    checksum: String,
}

/// Compresses every column chunk of a source file in parallel.
///
/// Units are one per (row group, column) plus one per residual range. Each
/// result lands in the slot of its unit, so the blob is always laid out in
/// (row group, column) order followed by residual ranges in file order.
pub struct ChunkCompressor<'a> {
    codec: &'a dyn Codec,
    options: CompressOptions,
    observer: &'a dyn ProgressObserver,
}

impl<'a> ChunkCompressor<'a> {
    /// Create a compressor using `codec`
    pub fn new(codec: &'a dyn Codec, options: CompressOptions) -> Self {
        Self {
            codec,
            options,
            observer: &NoProgress,
        }
    }

    /// Report progress to `observer`; it may cancel the run
    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Compress `source`, whose structure is `layout`.
    ///
    /// Nothing is returned unless every unit succeeded. On the first codec
    /// failure or observer cancellation, undispatched units are dropped and
    /// the run fails.
    pub fn compress(
        &self,
        layout: &ParquetLayout,
        source: &[u8],
        source_name: &str,
    ) -> Result<CompressedOutput> {
        self.options.validate()?;
        if source.len() as u64 != layout.source_size {
            return Err(InfParquetError::StructuralRead(format!(
                "layout describes {} bytes but source has {}",
                layout.source_size,
                source.len()
            )));
        }
        layout.validate()?;

        let level = self.options.level;
        let workers = resolve_workers(self.options.workers)?;

        let mut units: Vec<CompressUnit> = layout
            .row_groups
            .iter()
            .flat_map(|rg| {
                rg.columns.iter().map(move |c| CompressUnit::Chunk {
                    row_group_index: rg.index,
                    column_index: c.column_index,
                    offset: c.offset,
                    length: c.length,
                })
            })
            .collect();
        let num_chunks = units.len();
        units.extend(
            layout
                .residual_ranges()
                .into_iter()
                .enumerate()
                .map(|(index, r)| CompressUnit::Residual {
                    index,
                    offset: r.offset,
                    length: r.length,
                }),
        );
        let ranges: Vec<(u64, u64)> = units.iter().map(CompressUnit::range).collect();

        info!(
            "Compressing {} ({} bytes, {} chunks, {} residual ranges) at level {} with {} workers",
            source_name,
            source.len(),
            num_chunks,
            units.len() - num_chunks,
            level,
            workers
        );

        let tracker =
            ProgressTracker::new(self.observer, "compress", units.len(), layout.row_groups.len());
        let codec = self.codec;
        let outcome = run_batch(workers, units, FailureMode::FailFast, &tracker, |unit| {
            let (offset, length) = unit.range();
            let start = offset as usize;
            let slice = &source[start..start + length as usize];
            let bytes = if slice.is_empty() {
                Vec::new()
            } else {
                codec
                    .compress(slice, level)
                    .map_err(|e| InfParquetError::Compression {
                        unit: unit.id(),
                        message: e.to_string(),
                    })?
            };
            Ok(CompressedSlot {
                checksum: checksum(&bytes),
                bytes,
            })
        })?;
        let slots = outcome.into_results(tracker.operation())?;

        // Assemble in slot order
        let blob_size: usize = slots.iter().map(|s| s.bytes.len()).sum();
        let mut blob = Vec::with_capacity(blob_size);
        let mut chunks = Vec::with_capacity(num_chunks);
        let mut residual_segments = Vec::with_capacity(slots.len() - num_chunks);
        let include = self.options.include_basic_metadata;

        for (i, (slot, (offset, length))) in slots.into_iter().zip(ranges).enumerate() {
            let compressed_offset = blob.len() as u64;
            let compressed_length = slot.bytes.len() as u64;
            blob.extend_from_slice(&slot.bytes);

            if i < num_chunks {
                let rg = i / layout.num_columns();
                let col = i % layout.num_columns();
                let chunk = &layout.row_groups[rg].columns[col];
                chunks.push(CompressedChunk {
                    row_group_index: rg,
                    column_index: col,
                    column_path: chunk.path.clone(),
                    original_offset: offset,
                    original_length: length,
                    compressed_offset,
                    compressed_length,
                    level,
                    checksum: slot.checksum,
                    statistics: if include {
                        chunk.statistics.clone()
                    } else {
                        None
                    },
                });
            } else {
                residual_segments.push(ResidualSegment {
                    original_offset: offset,
                    original_length: length,
                    compressed_offset,
                    compressed_length,
                    checksum: slot.checksum,
                });
            }
        }

        let metadata = BasicMetadata {
            format_version: FORMAT_VERSION.to_string(),
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            source: SourceInfo {
                name: source_name.to_string(),
                size: source.len() as u64,
                checksum: checksum(source),
            },
            blob_file: String::new(),
            blob_size: blob.len() as u64,
            schema: layout.schema.clone(),
            num_row_groups: layout.row_groups.len(),
            num_columns: layout.num_columns(),
            codec: CodecParams {
                codec: self.codec.name().to_string(),
                level,
            },
            row_groups: layout
                .row_groups
                .iter()
                .map(|rg| RowGroupInfo {
                    index: rg.index,
                    num_rows: include.then_some(rg.num_rows),
                    byte_size: rg.byte_size,
                })
                .collect(),
            chunks,
            residual_segments,
        };
        metadata.validate()?;

        info!(
            "Compressed {} -> {} bytes ({:.2}x)",
            metadata.source.size,
            metadata.blob_size,
            metadata.compression_ratio()
        );
        Ok(CompressedOutput { metadata, blob })
    }
}
