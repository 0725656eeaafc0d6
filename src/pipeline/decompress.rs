use log::{info, warn};

use crate::codec::{checksum, Codec};
use crate::error::{DecompressFailure, InfParquetError, Result, UnitId};
use crate::metadata::MetadataDocument;

use super::pool::{resolve_workers, run_batch, BatchOutcome, FailureMode, WorkUnit};
use super::progress::{NoProgress, ProgressObserver, ProgressTracker};

/// Options for decompression and verification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecompressOptions {
    /// Worker threads; 0 uses the available parallelism
    pub workers: usize,
}

struct DecompressUnit {
    id: UnitId,
    original_length: u64,
    compressed_offset: u64,
    compressed_length: u64,
    checksum: String,
}

impl WorkUnit for DecompressUnit {
    fn id(&self) -> UnitId {
        self.id
    }
}

/// Outcome of a full reconstruction attempt
#[derive(Debug)]
pub struct Reconstruction {
    /// Reconstructed source bytes; ranges of failed or skipped units are zeroed
    pub bytes: Vec<u8>,
    /// Leading bytes that are known to be correct
    pub valid_prefix: u64,
    /// First failure, if any
    pub failure: Option<InfParquetError>,
}

impl Reconstruction {
    /// The reconstructed bytes, or the failure
    pub fn into_result(self) -> Result<Vec<u8>> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.bytes),
        }
    }
}

/// Per-unit integrity check results
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    /// Units that were checked
    pub units_checked: usize,
    /// Units that failed, in unit order
    pub failures: Vec<(UnitId, DecompressFailure)>,
}

impl IntegrityReport {
    /// True when no unit failed
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Rebuilds the source file from a metadata document and its blob.
///
/// Units are ordered by original offset, so slot `i` holds the `i`-th range
/// of the reconstructed file regardless of which worker finishes first.
pub struct ChunkDecompressor<'a> {
    codec: &'a dyn Codec,
    options: DecompressOptions,
    observer: &'a dyn ProgressObserver,
}

impl<'a> ChunkDecompressor<'a> {
    /// Create a decompressor using `codec`
    pub fn new(codec: &'a dyn Codec, options: DecompressOptions) -> Self {
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

    /// Reconstruct the full source, failing on the first bad unit
    pub fn decompress(&self, document: &MetadataDocument, blob: &[u8]) -> Result<Vec<u8>> {
        self.reconstruct(document, blob)?.into_result()
    }

    /// Reconstruct the full source, keeping partial output on failure.
    ///
    /// The outer `Result` fails only for problems that prevent any work
    /// (bad options, codec mismatch, pool setup).
    pub fn reconstruct(&self, document: &MetadataDocument, blob: &[u8]) -> Result<Reconstruction> {
        let basic = &document.basic;
        self.check_codec(document)?;
        if blob.len() as u64 != basic.blob_size {
            warn!(
                "Blob is {} bytes but metadata records {}",
                blob.len(),
                basic.blob_size
            );
        }

        let mut units: Vec<(u64, DecompressUnit)> = basic
            .chunks
            .iter()
            .map(|c| {
                (
                    c.original_offset,
                    DecompressUnit {
                        id: UnitId::Chunk {
                            row_group_index: c.row_group_index,
                            column_index: c.column_index,
                        },
                        original_length: c.original_length,
                        compressed_offset: c.compressed_offset,
                        compressed_length: c.compressed_length,
                        checksum: c.checksum.clone(),
                    },
                )
            })
            .chain(basic.residual_segments.iter().enumerate().map(|(i, s)| {
                (
                    s.original_offset,
                    DecompressUnit {
                        id: UnitId::Residual(i),
                        original_length: s.original_length,
                        compressed_offset: s.compressed_offset,
                        compressed_length: s.compressed_length,
                        checksum: s.checksum.clone(),
                    },
                )
            }))
            .collect();
        // Position order in the output; empty chunks share an offset with
        // their neighbour, so the unit id breaks ties
        units.sort_by_key(|(offset, unit)| (*offset, unit.id));
        let offsets: Vec<(u64, u64)> = units
            .iter()
            .map(|(offset, unit)| (*offset, unit.original_length))
            .collect();
        let units: Vec<DecompressUnit> = units.into_iter().map(|(_, u)| u).collect();
        let ids: Vec<UnitId> = units.iter().map(|u| u.id).collect();

        info!(
            "Reconstructing {} ({} bytes from {} units)",
            basic.source.name,
            basic.source.size,
            units.len()
        );

        let outcome = self.run(document, blob, units, FailureMode::FailFast, "decompress")?;

        let size = usize::try_from(basic.source.size).map_err(|_| {
            InfParquetError::ResourceExhaustion(format!(
                "source of {} bytes does not fit in memory",
                basic.source.size
            ))
        })?;
        let mut bytes = vec![0u8; size];
        let mut valid_prefix = 0u64;
        let mut prefix_intact = true;
        let mut misplaced = None;
        let BatchOutcome { slots, stop } = outcome;

        for ((slot, (offset, length)), id) in slots.iter().zip(offsets).zip(&ids) {
            match slot {
                Some(Ok(data)) => {
                    let target = usize::try_from(offset).ok().and_then(|start| {
                        let end = start.checked_add(data.len())?;
                        bytes.get_mut(start..end)
                    });
                    match target {
                        Some(target) => target.copy_from_slice(data),
                        None => {
                            prefix_intact = false;
                            misplaced.get_or_insert_with(|| {
                                InfParquetError::decompression(
                                    *id,
                                    DecompressFailure::OutsideSource {
                                        offset,
                                        length,
                                        source_size: basic.source.size,
                                    },
                                )
                            });
                            continue;
                        }
                    }
                    if prefix_intact {
                        valid_prefix = offset + length;
                    }
                }
                _ => prefix_intact = false,
            }
        }

        let failure = match stop {
            Some(_) => (BatchOutcome { slots, stop }).into_results("decompress").err(),
            None if misplaced.is_some() => misplaced,
            None => {
                let actual = checksum(&bytes);
                if actual != basic.source.checksum {
                    valid_prefix = 0;
                    Some(InfParquetError::Decompression {
                        unit: None,
                        reason: DecompressFailure::SourceChecksum {
                            expected: basic.source.checksum.clone(),
                            actual,
                        },
                        incomplete_output: None,
                    })
                } else {
                    None
                }
            }
        };

        if let Some(ref e) = failure {
            warn!("Reconstruction failed: {}", e);
        } else {
            info!("Reconstructed {} bytes", bytes.len());
        }
        Ok(Reconstruction {
            bytes,
            valid_prefix,
            failure,
        })
    }

    /// Decompress the chunks of one row group, returned in column order
    pub fn decompress_row_group(
        &self,
        document: &MetadataDocument,
        blob: &[u8],
        row_group_index: usize,
    ) -> Result<Vec<Vec<u8>>> {
        let basic = &document.basic;
        self.check_codec(document)?;
        if row_group_index >= basic.num_row_groups {
            return Err(InfParquetError::InvalidParameter(format!(
                "row group {} does not exist ({} row groups)",
                row_group_index, basic.num_row_groups
            )));
        }
        let units = basic
            .row_group_chunks(row_group_index)
            .iter()
            .map(|c| DecompressUnit {
                id: UnitId::Chunk {
                    row_group_index: c.row_group_index,
                    column_index: c.column_index,
                },
                original_length: c.original_length,
                compressed_offset: c.compressed_offset,
                compressed_length: c.compressed_length,
                checksum: c.checksum.clone(),
            })
            .collect();
        self.run(document, blob, units, FailureMode::FailFast, "decompress")?
            .into_results("decompress")
    }

    /// Check every unit without stopping at the first failure
    pub fn verify(&self, document: &MetadataDocument, blob: &[u8]) -> Result<IntegrityReport> {
        let basic = &document.basic;
        self.check_codec(document)?;
        let units: Vec<DecompressUnit> = basic
            .chunks
            .iter()
            .map(|c| DecompressUnit {
                id: UnitId::Chunk {
                    row_group_index: c.row_group_index,
                    column_index: c.column_index,
                },
                original_length: c.original_length,
                compressed_offset: c.compressed_offset,
                compressed_length: c.compressed_length,
                checksum: c.checksum.clone(),
            })
            .chain(
                basic
                    .residual_segments
                    .iter()
                    .enumerate()
                    .map(|(i, s)| DecompressUnit {
                        id: UnitId::Residual(i),
                        original_length: s.original_length,
                        compressed_offset: s.compressed_offset,
                        compressed_length: s.compressed_length,
                        checksum: s.checksum.clone(),
                    }),
            )
            .collect();
        let ids: Vec<UnitId> = units.iter().map(|u| u.id).collect();

        let outcome = self.run(document, blob, units, FailureMode::CollectAll, "verify")?;
        if outcome.stop == Some(super::pool::StopReason::Cancelled) {
            return Err(InfParquetError::Cancelled("verify".to_string()));
        }

        let mut report = IntegrityReport {
            units_checked: ids.len(),
            failures: Vec::new(),
        };
        for (id, slot) in ids.into_iter().zip(outcome.slots) {
            match slot {
                Some(Ok(_)) => {}
                Some(Err(InfParquetError::Decompression { reason, .. })) => {
                    report.failures.push((id, reason))
                }
                Some(Err(other)) => return Err(other),
                None => {
                    return Err(InfParquetError::ParallelProcessing(format!(
                        "{} was never verified",
                        id
                    )))
                }
            }
        }
        Ok(report)
    }

    fn check_codec(&self, document: &MetadataDocument) -> Result<()> {
        let recorded = &document.basic.codec.codec;
        if recorded != self.codec.name() {
            return Err(InfParquetError::InvalidParameter(format!(
                "document was compressed with {} but decompressor uses {}",
                recorded,
                self.codec.name()
            )));
        }
        Ok(())
    }

    fn run(
        &self,
        document: &MetadataDocument,
        blob: &[u8],
        units: Vec<DecompressUnit>,
        mode: FailureMode,
        operation: &'static str,
    ) -> Result<BatchOutcome<Vec<u8>>> {
        let workers = resolve_workers(self.options.workers)?;
        let tracker = ProgressTracker::new(
            self.observer,
            operation,
            units.len(),
            document.basic.num_row_groups,
        );
        let codec = self.codec;
        run_batch(workers, units, mode, &tracker, |unit| {
            decompress_unit(codec, blob, unit)
        })
    }
}

fn decompress_unit(codec: &dyn Codec, blob: &[u8], unit: &DecompressUnit) -> Result<Vec<u8>> {
    let fail = |reason| Err(InfParquetError::decompression(unit.id, reason));

    let end = unit.compressed_offset.checked_add(unit.compressed_length);
    let slice = match end {
        Some(end) if end <= blob.len() as u64 => {
            &blob[unit.compressed_offset as usize..end as usize]
        }
        _ => {
            return fail(DecompressFailure::OutOfBounds {
                offset: unit.compressed_offset,
                length: unit.compressed_length,
                blob_len: blob.len() as u64,
            })
        }
    };

    let actual = checksum(slice);
    if actual != unit.checksum {
        return fail(DecompressFailure::ChecksumMismatch {
            expected: unit.checksum.clone(),
            actual,
        });
    }

    let data = if slice.is_empty() {
        Vec::new()
    } else {
        match codec.decompress(slice, unit.original_length as usize) {
            Ok(data) => data,
            Err(e) => return fail(DecompressFailure::Codec(e.to_string())),
        }
    };
    if data.len() as u64 != unit.original_length {
        return fail(DecompressFailure::LengthMismatch {
            expected: unit.original_length,
            actual: data.len() as u64,
        });
    }
    Ok(data)
}
