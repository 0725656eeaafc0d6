use std::fmt;
use std::path::{Path, PathBuf};

use crate::metadata::MetadataDocument;

/// Human-readable view of a metadata document
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    /// Where the document was loaded from
    pub path: PathBuf,
    /// The document
    pub document: MetadataDocument,
}

impl DocumentSummary {
    /// Summary of `document`, loaded from `path`
    pub fn new<P: AsRef<Path>>(path: P, document: MetadataDocument) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            document,
        }
    }
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

impl fmt::Display for DocumentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let basic = &self.document.basic;

        writeln!(f, "InfParquet Archive")?;
        writeln!(f, "==================")?;
        writeln!(f, "Document: {}", self.path.display())?;
        writeln!(f, "Blob:     {}", basic.blob_file)?;
        writeln!(f, "Created:  {} (run {})", basic.created_at.to_rfc3339(), basic.run_id)?;
        writeln!(f)?;

        writeln!(f, "Source:")?;
        writeln!(f, "  Name:      {}", basic.source.name)?;
        writeln!(
            f,
            "  Size:      {} -> {} ({:.2}x)",
            human_bytes(basic.source.size),
            human_bytes(basic.blob_size),
            basic.compression_ratio()
        )?;
        writeln!(f, "  Codec:     {} level {}", basic.codec.codec, basic.codec.level)?;
        writeln!(f, "  Checksum:  {}", basic.source.checksum)?;
        match basic.num_rows() {
            Some(rows) => writeln!(f, "  Rows:      {}", rows)?,
            None => writeln!(f, "  Rows:      (not recorded)")?,
        }
        writeln!(f)?;

        writeln!(f, "Schema ({} columns):", basic.num_columns)?;
        for (i, field) in basic.schema.iter().enumerate() {
            match &field.logical_type {
                Some(logical) => writeln!(
                    f,
                    "  {:3}. {} ({}, {})",
                    i + 1,
                    field.name,
                    field.physical_type,
                    logical
                )?,
                None => writeln!(f, "  {:3}. {} ({})", i + 1, field.name, field.physical_type)?,
            }
        }
        writeln!(f)?;

        writeln!(f, "Row groups ({}):", basic.num_row_groups)?;
        for rg in &basic.row_groups {
            let compressed: u64 = basic
                .row_group_chunks(rg.index)
                .iter()
                .map(|c| c.compressed_length)
                .sum();
            let rows = rg
                .num_rows
                .map_or_else(|| "?".to_string(), |n| n.to_string());
            writeln!(
                f,
                "  {:3}. {} rows, {} -> {}",
                rg.index,
                rows,
                human_bytes(rg.byte_size),
                human_bytes(compressed)
            )?;
        }

        if !self.document.custom.is_empty() {
            writeln!(f)?;
            writeln!(f, "Custom metadata ({}):", self.document.custom.len())?;
            for item in self.document.custom.values() {
                writeln!(f, "  {} = {}", item.name, item.value)?;
                if let Some(query) = &item.query {
                    writeln!(f, "      from: {}", query)?;
                }
            }
        }
        Ok(())
    }
}
