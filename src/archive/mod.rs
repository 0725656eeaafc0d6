//! # Archive
//!
//! On-disk operations tying the components together. For a source
//! `data.parquet` compressed into `out/`:
//!
//! ```text
//! out/
//! ├── data.parquet.infpq        # compressed blob
//! └── data.parquet.infpq.json   # metadata document
//! ```
//!
//! The document records the blob file name relative to itself, so the pair
//! can be moved together.
//!
//! ## Example
//!
//! ```rust,no_run
//! use infparquet::archive::Archive;
//! use infparquet::pipeline::{CompressOptions, DecompressOptions, NoProgress};
//!
//! let archive = Archive::default();
//! let report = archive.compress_file(
//!     "data.parquet",
//!     "out",
//!     &CompressOptions::default(),
//!     &[],
//!     &NoProgress,
//! )?;
//! println!("ratio {:.2}x", report.compression_ratio());
//!
//! archive.decompress_file(
//!     &report.paths.document,
//!     "restored.parquet",
//!     &DecompressOptions::default(),
//!     &NoProgress,
//! )?;
//! # Ok::<(), infparquet::InfParquetError>(())
//! ```

mod summary;

#[cfg(test)]
mod tests;

pub use summary::DocumentSummary;

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::{info, warn};
use tempfile::NamedTempFile;

use crate::codec::{Codec, ZstdCodec};
use crate::derive::{BatchReport, CustomMetadataBuilder, Definition};
use crate::error::{ErrorKind, InfParquetError, Result};
use crate::layout::{ParquetStructuralReader, StructuralReader};
use crate::metadata::MetadataDocument;
use crate::pipeline::{
    ChunkCompressor, ChunkDecompressor, CompressOptions, DecompressOptions, IntegrityReport,
    ProgressObserver,
};
use crate::query::{self, QueryResult};
use crate::value::CustomValue;

/// Extension appended to the source file name for the blob
pub const BLOB_EXTENSION: &str = "infpq";

/// Extension appended to the blob file name for the metadata document
pub const DOCUMENT_EXTENSION: &str = "json";

/// Suffix appended to a partially reconstructed output file
pub const INCOMPLETE_SUFFIX: &str = ".incomplete";

/// Output locations for one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePaths {
    /// Compressed blob
    pub blob: PathBuf,
    /// Metadata document
    pub document: PathBuf,
}

impl ArchivePaths {
    /// Locations for `source` inside `output_dir`
    pub fn for_source<P: AsRef<Path>, Q: AsRef<Path>>(source: P, output_dir: Q) -> Result<Self> {
        let source = source.as_ref();
        let name = source.file_name().ok_or_else(|| {
            InfParquetError::InvalidParameter(format!(
                "source path {} has no file name",
                source.display()
            ))
        })?;
        let blob_name = append(name, &format!(".{}", BLOB_EXTENSION));
        let document_name = append(&blob_name, &format!(".{}", DOCUMENT_EXTENSION));
        let dir = output_dir.as_ref();
        Ok(Self {
            blob: dir.join(blob_name),
            document: dir.join(document_name),
        })
    }
}

fn append(name: &std::ffi::OsStr, suffix: &str) -> OsString {
    let mut out = name.to_os_string();
    out.push(suffix);
    out
}

/// Path of the partial output written when reconstruction fails
pub fn incomplete_path<P: AsRef<Path>>(output: P) -> PathBuf {
    PathBuf::from(append(output.as_ref().as_os_str(), INCOMPLETE_SUFFIX))
}

/// Outcome of [`Archive::compress_file`]
#[derive(Debug, Clone)]
pub struct CompressReport {
    /// Where the blob and document were written
    pub paths: ArchivePaths,
    /// Source size in bytes
    pub source_size: u64,
    /// Blob size in bytes
    pub blob_size: u64,
    /// Column chunks compressed
    pub chunks: usize,
    /// Custom metadata computed at compression time
    pub custom: BatchReport,
}

impl CompressReport {
    /// Source-to-blob size ratio
    pub fn compression_ratio(&self) -> f64 {
        if self.blob_size == 0 {
            1.0
        } else {
            self.source_size as f64 / self.blob_size as f64
        }
    }
}

/// Outcome of [`Archive::decompress_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressReport {
    /// Reconstructed file
    pub output: PathBuf,
    /// Bytes written
    pub bytes_written: u64,
}

fn require_path(path: &Path, what: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(InfParquetError::InvalidParameter(format!(
            "{} path must not be empty",
            what
        )));
    }
    Ok(())
}

/// Write `bytes` to `path` through a temporary file in the same directory
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| InfParquetError::io(e, dir, ErrorKind::WriteError))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| InfParquetError::io(e, tmp.path(), ErrorKind::WriteError))?;
    tmp.persist(path)
        .map_err(|e| InfParquetError::io(e.error, path, ErrorKind::WriteError))?;
    Ok(())
}

/// Compressed archives on disk, using one codec and one structural reader
pub struct Archive {
    codec: Box<dyn Codec>,
    reader: Box<dyn StructuralReader>,
}

impl Default for Archive {
    fn default() -> Self {
        Self::new(Box::new(ZstdCodec), Box::new(ParquetStructuralReader::new()))
    }
}

impl Archive {
    /// Archive using `codec` and `reader`
    pub fn new(codec: Box<dyn Codec>, reader: Box<dyn StructuralReader>) -> Self {
        Self { codec, reader }
    }

    /// Compress `input` into `output_dir`.
    ///
    /// `definitions` are evaluated against the source and stored as custom
    /// metadata; a failing definition is reported, not fatal. The blob and
    /// the document are only written once compression has fully succeeded,
    /// so a failed or cancelled run leaves no document behind.
    pub fn compress_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output_dir: Q,
        options: &CompressOptions,
        definitions: &[Definition],
        observer: &dyn ProgressObserver,
    ) -> Result<CompressReport> {
        let input = input.as_ref();
        let output_dir = output_dir.as_ref();
        require_path(input, "input")?;
        require_path(output_dir, "output directory")?;
        options.validate()?;
        let paths = ArchivePaths::for_source(input, output_dir)?;

        let source = Bytes::from(
            fs::read(input).map_err(|e| InfParquetError::io(e, input, ErrorKind::StructuralReadError))?,
        );
        let source_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let layout = self.reader.read_layout(&source)?;

        let output = ChunkCompressor::new(self.codec.as_ref(), options.clone())
            .with_observer(observer)
            .compress(&layout, &source, &source_name)?;

        let mut metadata = output.metadata;
        metadata.blob_file = paths
            .blob
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let chunks = metadata.chunks.len();
        let mut document = MetadataDocument::new(metadata);

        let custom = if definitions.is_empty() {
            BatchReport::default()
        } else {
            CustomMetadataBuilder::new(self.reader.as_ref(), source)
                .define_batch(&mut document, definitions)
        };

        write_atomic(&paths.blob, &output.blob)?;
        if let Err(e) = document.save(&paths.document) {
            if let Err(cleanup) = fs::remove_file(&paths.blob) {
                warn!("Could not remove {}: {}", paths.blob.display(), cleanup);
            }
            return Err(e);
        }

        info!(
            "Wrote {} and {}",
            paths.blob.display(),
            paths.document.display()
        );
        Ok(CompressReport {
            source_size: document.basic.source.size,
            blob_size: document.basic.blob_size,
            chunks,
            custom,
            paths,
        })
    }

    /// Load the document at `document_path` and its blob
    fn open(&self, document_path: &Path) -> Result<(MetadataDocument, Vec<u8>)> {
        require_path(document_path, "metadata")?;
        let document = MetadataDocument::load(document_path)?;
        let blob_path = blob_path(document_path, &document);
        let blob = fs::read(&blob_path)
            .map_err(|e| InfParquetError::io(e, &blob_path, ErrorKind::DecompressionError))?;
        Ok((document, blob))
    }

    /// Rebuild the source file described by `document_path` at `output`.
    ///
    /// `output` is replaced only when the reconstruction is complete and
    /// matches the source checksum. If a unit fails, the correct leading
    /// bytes are written to `<output>.incomplete` and the error names that
    /// file.
    pub fn decompress_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        document_path: P,
        output: Q,
        options: &DecompressOptions,
        observer: &dyn ProgressObserver,
    ) -> Result<DecompressReport> {
        let output = output.as_ref();
        require_path(output, "output")?;
        let (document, blob) = self.open(document_path.as_ref())?;

        let reconstruction = ChunkDecompressor::new(self.codec.as_ref(), options.clone())
            .with_observer(observer)
            .reconstruct(&document, &blob)?;

        match reconstruction.failure {
            None => {
                write_atomic(output, &reconstruction.bytes)?;
                info!(
                    "Reconstructed {} ({} bytes)",
                    output.display(),
                    reconstruction.bytes.len()
                );
                Ok(DecompressReport {
                    output: output.to_path_buf(),
                    bytes_written: reconstruction.bytes.len() as u64,
                })
            }
            Some(InfParquetError::Decompression { unit, reason, .. }) => {
                let partial = incomplete_path(output);
                let prefix = &reconstruction.bytes[..reconstruction.valid_prefix as usize];
                write_atomic(&partial, prefix)?;
                warn!(
                    "Wrote {} valid bytes to {}",
                    prefix.len(),
                    partial.display()
                );
                Err(InfParquetError::Decompression {
                    unit,
                    reason,
                    incomplete_output: Some(partial),
                })
            }
            Some(other) => Err(other),
        }
    }

    /// Check every compressed unit of an archive against its checksum
    pub fn verify<P: AsRef<Path>>(
        &self,
        document_path: P,
        options: &DecompressOptions,
        observer: &dyn ProgressObserver,
    ) -> Result<IntegrityReport> {
        let (document, blob) = self.open(document_path.as_ref())?;
        ChunkDecompressor::new(self.codec.as_ref(), options.clone())
            .with_observer(observer)
            .verify(&document, &blob)
    }

    /// Compute custom metadata for an existing archive and store it.
    ///
    /// Rows are read from `source` when given, otherwise from the archive
    /// itself after an in-memory reconstruction.
    pub fn add_custom<P: AsRef<Path>>(
        &self,
        document_path: P,
        definitions: &[Definition],
        source: Option<&Path>,
        options: &DecompressOptions,
    ) -> Result<BatchReport> {
        let document_path = document_path.as_ref();
        let bytes = match source {
            Some(path) => fs::read(path)
                .map_err(|e| InfParquetError::io(e, path, ErrorKind::StructuralReadError))?,
            None => {
                let (document, blob) = self.open(document_path)?;
                ChunkDecompressor::new(self.codec.as_ref(), options.clone())
                    .decompress(&document, &blob)?
            }
        };
        let builder = CustomMetadataBuilder::new(self.reader.as_ref(), Bytes::from(bytes));
        MetadataDocument::update(document_path, |document| {
            Ok(builder.define_batch(document, definitions))
        })
    }
}

/// Blob location recorded in a document, resolved next to the document
pub fn blob_path(document_path: &Path, document: &MetadataDocument) -> PathBuf {
    match document_path.parent() {
        Some(dir) => dir.join(&document.basic.blob_file),
        None => PathBuf::from(&document.basic.blob_file),
    }
}

/// Summarize the document at `document_path`
pub fn list<P: AsRef<Path>>(document_path: P) -> Result<DocumentSummary> {
    let document_path = document_path.as_ref();
    require_path(document_path, "metadata")?;
    let document = MetadataDocument::load(document_path)?;
    Ok(DocumentSummary::new(document_path, document))
}

/// Evaluate `text` against every document, merging the matches
pub fn query_documents<P: AsRef<Path>>(document_paths: &[P], text: &str) -> Result<QueryResult> {
    if document_paths.is_empty() {
        return Err(InfParquetError::InvalidParameter(
            "no metadata documents to query".to_string(),
        ));
    }
    let parsed = query::parse(text)?;
    let mut merged = QueryResult {
        success: true,
        ..QueryResult::default()
    };
    for path in document_paths {
        let document = MetadataDocument::load(path)?;
        merged.merge(query::evaluate(&document, &parsed)?);
    }
    Ok(merged)
}

/// Store a literal custom value, replacing any item of the same name
pub fn set_custom<P: AsRef<Path>>(document_path: P, name: &str, value: CustomValue) -> Result<()> {
    MetadataDocument::update(document_path, |document| {
        document.add_custom(name, value).map(|_| ())
    })
}

/// Remove a custom item; returns whether it existed
pub fn remove_custom<P: AsRef<Path>>(document_path: P, name: &str) -> Result<bool> {
    MetadataDocument::update(document_path, |document| {
        Ok(document.remove_custom(name).is_some())
    })
}
