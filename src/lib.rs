//! # InfParquet - Column-Chunk Recompression for Parquet Files
//!
//! `infparquet` recompresses the column chunks of an existing Parquet file
//! with a stronger general-purpose codec and writes a sidecar metadata
//! document that describes the file's structure, so it can be inspected and
//! filtered without decompressing any data.
//!
//! ## Key Features
//!
//! - **Exact reconstruction**: every byte of the source, including header,
//!   footer and padding, is stored and checksummed; decompression rebuilds
//!   the original file byte for byte.
//!
//! - **Parallel pipeline**: one independent unit per (row group, column),
//!   processed by a worker pool; output order never depends on which worker
//!   finishes first.
//!
//! - **Queryable metadata**: schema, row-group sizes and column statistics
//!   are kept in a JSON document and can be filtered with a small predicate
//!   language (`SELECT * WHERE column.max > 100`).
//!
//! - **Custom metadata**: named values derived from the row data
//!   (`SELECT COUNT(*) FROM data WHERE city = 'Denver'`) are cached in the
//!   document and become queryable attributes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use infparquet::archive::{self, Archive};
//! use infparquet::pipeline::{CompressOptions, NoProgress};
//!
//! let archive = Archive::default();
//! let report = archive.compress_file(
//!     "data.parquet",
//!     "out",
//!     &CompressOptions { level: 9, workers: 0, include_basic_metadata: true },
//!     &[],
//!     &NoProgress,
//! )?;
//!
//! let result = archive::query_documents(
//!     &[&report.paths.document],
//!     "SELECT * WHERE num_rows > 1000 AND column.null_count > 0",
//! )?;
//! println!("{}", result);
//! # Ok::<(), infparquet::InfParquetError>(())
//! ```
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`metadata`] | document model, load/save, custom items |
//! | [`pipeline`] | parallel chunk compression and decompression |
//! | [`derive`] | custom metadata from derivation queries |
//! | [`query`] | predicate queries over documents |
//! | [`archive`] | file-level operations |
//! | [`codec`], [`layout`] | codec and Parquet structure seams |

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod archive;
pub mod codec;
pub mod derive;
pub mod error;
pub mod layout;
mod lexer;
pub mod metadata;
pub mod pipeline;
pub mod query;
pub mod value;

#[cfg(test)]
mod testing;

pub use error::{ErrorKind, InfParquetError, Result};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::archive::{
        Archive, ArchivePaths, CompressReport, DecompressReport, DocumentSummary,
    };
    pub use crate::codec::{Codec, ZstdCodec};
    pub use crate::derive::{BatchReport, CustomMetadataBuilder, Definition, DefinitionSet};
    pub use crate::error::{ErrorKind, InfParquetError, Result};
    pub use crate::layout::{ParquetLayout, ParquetStructuralReader, StructuralReader};
    pub use crate::metadata::{BasicMetadata, CustomMetadataItem, MetadataDocument};
    pub use crate::pipeline::{
        ChunkCompressor, ChunkDecompressor, CompressOptions, DecompressOptions, NoProgress,
        Progress, ProgressObserver,
    };
    pub use crate::query::{QueryPredicate, QueryResult};
    pub use crate::value::{CustomValue, Scalar, Table};
}
