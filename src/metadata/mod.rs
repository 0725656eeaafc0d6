//! # Metadata Store
//!
//! The sidecar document that describes one compressed file: the write-once
//! [`BasicMetadata`] needed to rebuild the source byte-for-byte, and a map of
//! named [`CustomMetadataItem`]s that can be appended or overwritten later.
//!
//! ## Persistence
//!
//! Documents are stored as pretty-printed JSON. Custom items live in a
//! `BTreeMap`, so saving an unmodified document reproduces the same bytes.
//! Loading validates the ordering, size and coverage invariants and reports
//! any violation as a metadata error.
//!
//! ```rust,no_run
//! use infparquet::metadata::MetadataDocument;
//!
//! let mut doc = MetadataDocument::load("out/data.parquet.infpq.json")?;
//! doc.add_custom("owner", "analytics".into())?;
//! doc.save("out/data.parquet.infpq.json")?;
//! # Ok::<(), infparquet::InfParquetError>(())
//! ```

mod document;
mod store;

#[cfg(test)]
mod tests;

pub use document::{
    BasicMetadata, CodecParams, CompressedChunk, CustomMetadataItem, MetadataDocument,
    ResidualSegment, RowGroupInfo, SourceInfo, FORMAT_VERSION,
};
