//! Error taxonomy shared by every InfParquet component.
//!
//! All public operations return [`Result`]. Each error carries a taxonomy
//! code ([`ErrorKind`], via [`InfParquetError::kind`]) and a human-readable
//! message (its `Display` output).

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Convenience alias used throughout the crate
pub type Result<T, E = InfParquetError> = std::result::Result<T, E>;

/// Taxonomy code of an [`InfParquetError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad level, worker count, empty path or name
    InvalidParameter,
    /// Missing source, blob or metadata document
    NotFound,
    /// The OS refused access to a path
    PermissionDenied,
    /// Memory or allocation failure
    ResourceExhaustion,
    /// Codec failure while compressing a unit
    CompressionError,
    /// Codec failure, checksum mismatch or truncated blob while decompressing
    DecompressionError,
    /// Metadata document malformed or unreadable
    MetadataError,
    /// Source file layout unreadable
    StructuralReadError,
    /// Worker-pool failure not attributable to one unit
    ParallelProcessingError,
    /// Predicate or derivation query failed to parse or resolve
    InvalidQuery,
    /// Output write failure
    WriteError,
    /// Operation cancelled through the progress observer
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidParameter => "InvalidParameter",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::ResourceExhaustion => "ResourceExhaustion",
            ErrorKind::CompressionError => "CompressionError",
            ErrorKind::DecompressionError => "DecompressionError",
            ErrorKind::MetadataError => "MetadataError",
            ErrorKind::StructuralReadError => "StructuralReadError",
            ErrorKind::ParallelProcessingError => "ParallelProcessingError",
            ErrorKind::InvalidQuery => "InvalidQuery",
            ErrorKind::WriteError => "WriteError",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// Identifies one unit of pipeline work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitId {
    /// A column chunk, keyed by (row group, column)
    Chunk {
        /// Row group index (0-based)
        row_group_index: usize,
        /// Column index within the schema (0-based)
        column_index: usize,
    },
    /// A byte range of the source not covered by any column chunk
    Residual(usize),
}

impl UnitId {
    /// Chunk key of this unit, if it is a column chunk
    pub fn chunk(&self) -> Option<(usize, usize)> {
        match *self {
            UnitId::Chunk {
                row_group_index,
                column_index,
            } => Some((row_group_index, column_index)),
            UnitId::Residual(_) => None,
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Chunk {
                row_group_index,
                column_index,
            } => write!(
                f,
                "chunk (row group {}, column {})",
                row_group_index, column_index
            ),
            UnitId::Residual(i) => write!(f, "residual segment {}", i),
        }
    }
}

/// Reason a unit failed to decompress
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecompressFailure {
    /// Stored checksum does not match the compressed bytes
    #[error("checksum mismatch (expected {expected}, found {actual})")]
    ChecksumMismatch {
        /// Checksum recorded in the metadata document
        expected: String,
        /// Checksum computed over the stored bytes
        actual: String,
    },
    /// Decompressed size differs from the recorded original length
    #[error("length mismatch (expected {expected} bytes, got {actual})")]
    LengthMismatch {
        /// Recorded original length
        expected: u64,
        /// Length produced by the codec
        actual: u64,
    },
    /// Recorded slice lies outside the blob
    #[error("slice {offset}+{length} exceeds blob of {blob_len} bytes")]
    OutOfBounds {
        /// Recorded blob offset
        offset: u64,
        /// Recorded compressed length
        length: u64,
        /// Actual blob length
        blob_len: u64,
    },
    /// Recorded original range lies outside the source file
    #[error("range {offset}+{length} exceeds source of {source_size} bytes")]
    OutsideSource {
        /// Recorded original offset
        offset: u64,
        /// Recorded original length
        length: u64,
        /// Recorded source size
        source_size: u64,
    },
    /// Codec rejected the data
    #[error("codec error: {0}")]
    Codec(String),
    /// Reconstructed file does not match the recorded source checksum
    #[error("reconstructed source checksum mismatch (expected {expected}, found {actual})")]
    SourceChecksum {
        /// Recorded source checksum
        expected: String,
        /// Checksum of the reconstructed bytes
        actual: String,
    },
}

/// Errors returned by InfParquet operations
#[derive(Debug, thiserror::Error)]
pub enum InfParquetError {
    /// Bad level, worker count, empty path or name
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Missing source, blob or metadata document
    #[error("Not found: {0}")]
    NotFound(String),

    /// The OS refused access to a path
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Memory or allocation failure
    #[error("Resource exhausted: {0}")]
    ResourceExhaustion(String),

    /// Codec failure while compressing a unit
    #[error("Compression failed for {unit}: {message}")]
    Compression {
        /// Unit that failed
        unit: UnitId,
        /// Codec message
        message: String,
    },

    /// Decompression failure
    #[error("Decompression failed{}: {reason}{}", describe_unit(.unit), describe_incomplete(.incomplete_output))]
    Decompression {
        /// Unit that failed, if attributable
        unit: Option<UnitId>,
        /// What went wrong
        reason: DecompressFailure,
        /// Partial output left on disk, explicitly marked incomplete
        incomplete_output: Option<PathBuf>,
    },

    /// Metadata document malformed or unreadable
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Source file layout unreadable
    #[error("Structural read error: {0}")]
    StructuralRead(String),

    /// Worker-pool failure not attributable to one unit
    #[error("Parallel processing error: {0}")]
    ParallelProcessing(String),

    /// Predicate or derivation query failed to parse or resolve
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Output write failure
    #[error("Write error: {0}")]
    Write(String),

    /// Operation cancelled through the progress observer
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

fn describe_unit(unit: &Option<UnitId>) -> String {
    unit.map(|u| format!(" for {}", u)).unwrap_or_default()
}

fn describe_incomplete(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" (incomplete output left at {})", p.display()))
        .unwrap_or_default()
}

impl InfParquetError {
    /// Taxonomy code of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            InfParquetError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            InfParquetError::NotFound(_) => ErrorKind::NotFound,
            InfParquetError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            InfParquetError::ResourceExhaustion(_) => ErrorKind::ResourceExhaustion,
            InfParquetError::Compression { .. } => ErrorKind::CompressionError,
            InfParquetError::Decompression { .. } => ErrorKind::DecompressionError,
            InfParquetError::Metadata(_) => ErrorKind::MetadataError,
            InfParquetError::StructuralRead(_) => ErrorKind::StructuralReadError,
            InfParquetError::ParallelProcessing(_) => ErrorKind::ParallelProcessingError,
            InfParquetError::InvalidQuery(_) => ErrorKind::InvalidQuery,
            InfParquetError::Write(_) => ErrorKind::WriteError,
            InfParquetError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// Unit that caused the failure, when one is attributable
    pub fn unit(&self) -> Option<UnitId> {
        match self {
            InfParquetError::Compression { unit, .. } => Some(*unit),
            InfParquetError::Decompression { unit, .. } => *unit,
            _ => None,
        }
    }

    pub(crate) fn decompression(unit: UnitId, reason: DecompressFailure) -> Self {
        InfParquetError::Decompression {
            unit: Some(unit),
            reason,
            incomplete_output: None,
        }
    }

    /// Map an I/O error at `path`, using `fallback` for kinds without a
    /// dedicated taxonomy entry.
    pub(crate) fn io(err: io::Error, path: &Path, fallback: ErrorKind) -> Self {
        let message = format!("{}: {}", path.display(), err);
        match err.kind() {
            io::ErrorKind::NotFound => InfParquetError::NotFound(message),
            io::ErrorKind::PermissionDenied => InfParquetError::PermissionDenied(message),
            io::ErrorKind::OutOfMemory => InfParquetError::ResourceExhaustion(message),
            _ => match fallback {
                ErrorKind::InvalidParameter => InfParquetError::InvalidParameter(message),
                ErrorKind::MetadataError => InfParquetError::Metadata(message),
                ErrorKind::StructuralReadError => InfParquetError::StructuralRead(message),
                ErrorKind::DecompressionError => InfParquetError::Decompression {
                    unit: None,
                    reason: DecompressFailure::Codec(message),
                    incomplete_output: None,
                },
                _ => InfParquetError::Write(message),
            },
        }
    }
}
