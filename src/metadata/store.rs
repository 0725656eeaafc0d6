use std::fs;
use std::io::Write;
use std::path::Path;

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::error::{ErrorKind, InfParquetError, Result};

use super::MetadataDocument;

impl MetadataDocument {
    /// Serialize to the persisted JSON form
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| InfParquetError::Metadata(e.to_string()))
    }

    /// Parse and validate a persisted document
    pub fn from_json(json: &str) -> Result<Self> {
        let document: MetadataDocument =
            serde_json::from_str(json).map_err(|e| InfParquetError::Metadata(e.to_string()))?;
        document.basic.validate()?;
        Ok(document)
    }

    /// Load a document from `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| InfParquetError::io(e, path, ErrorKind::MetadataError))?;
        let document = Self::from_json(&json).map_err(|e| match e {
            InfParquetError::Metadata(msg) => {
                InfParquetError::Metadata(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!(
            "Loaded metadata document {} ({} chunks, {} custom items)",
            path.display(),
            document.basic.chunks.len(),
            document.custom.len()
        );
        Ok(document)
    }

    /// Write the document to `path`.
    ///
    /// The JSON is written to a temporary file next to `path` and renamed into
    /// place, so a failed save never leaves a truncated document behind.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(InfParquetError::InvalidParameter(
                "metadata location must not be empty".to_string(),
            ));
        }
        let json = self.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| InfParquetError::io(e, dir, ErrorKind::WriteError))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| InfParquetError::io(e, tmp.path(), ErrorKind::WriteError))?;
        tmp.persist(path)
            .map_err(|e| InfParquetError::io(e.error, path, ErrorKind::WriteError))?;

        debug!("Saved metadata document {}", path.display());
        Ok(())
    }

    /// Load the document at `path`, apply `f`, and write it back.
    ///
    /// Only custom items may change: an edit that touches the basic
    /// metadata is rejected and nothing is written.
    pub fn update<P, F, T>(path: P, f: F) -> Result<T>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut MetadataDocument) -> Result<T>,
    {
        let path = path.as_ref();
        let mut document = Self::load(path)?;
        let basic = document.basic.clone();
        let out = f(&mut document)?;
        if document.basic != basic {
            return Err(InfParquetError::InvalidParameter(
                "basic metadata is write-once and cannot be modified".to_string(),
            ));
        }
        document.save(path)?;
        info!(
            "Updated {} ({} custom items)",
            path.display(),
            document.custom.len()
        );
        Ok(out)
    }
}
