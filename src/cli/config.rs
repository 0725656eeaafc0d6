//! TOML configuration file support.
//!
//! Settings that would otherwise be repeated on every invocation can live in
//! a config file; explicit flags take precedence:
//!
//! ```toml
//! # infparquet.toml
//! [compress]
//! level = 9
//! workers = 8
//! include_basic_metadata = true
//!
//! [decompress]
//! workers = 8
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use infparquet::pipeline::{CompressOptions, DecompressOptions};

/// Root configuration structure for infparquet.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Compression settings.
    #[serde(default)]
    pub compress: CompressConfig,

    /// Decompression settings.
    #[serde(default)]
    pub decompress: DecompressConfig,
}

/// Configuration for the compress command.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompressConfig {
    /// Codec level (1-9).
    pub level: Option<i32>,

    /// Worker threads; 0 = all available cores.
    pub workers: Option<usize>,

    /// Keep row counts and column statistics in the document.
    pub include_basic_metadata: Option<bool>,
}

/// Configuration for decompress, verify and add-custom.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecompressConfig {
    /// Worker threads; 0 = all available cores.
    pub workers: Option<usize>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Compression options: flag, then config file, then library default.
    pub fn compress_options(
        &self,
        level: Option<i32>,
        workers: Option<usize>,
        no_basic_metadata: bool,
    ) -> CompressOptions {
        let defaults = CompressOptions::default();
        CompressOptions {
            level: level.or(self.compress.level).unwrap_or(defaults.level),
            workers: workers.or(self.compress.workers).unwrap_or(defaults.workers),
            include_basic_metadata: !no_basic_metadata
                && self
                    .compress
                    .include_basic_metadata
                    .unwrap_or(defaults.include_basic_metadata),
        }
    }

    /// Decompression options: flag, then config file, then library default.
    pub fn decompress_options(&self, workers: Option<usize>) -> DecompressOptions {
        DecompressOptions {
            workers: workers.or(self.decompress.workers).unwrap_or_default(),
        }
    }
}
