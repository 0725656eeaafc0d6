use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, InfParquetError, Result};
use crate::value::CustomValue;

/// One named derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// Custom item name
    pub name: String,
    /// Derivation query text
    pub query: String,
}

/// A set of definitions, read from TOML:
///
/// ```toml
/// [[custom]]
/// name = "total_rows"
/// query = "SELECT COUNT(*) FROM data"
///
/// [[custom]]
/// name = "max_price"
/// query = "SELECT MAX(price) FROM data WHERE city = 'Denver'"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionSet {
    /// Definitions in file order
    #[serde(default)]
    pub custom: Vec<Definition>,
}

impl DefinitionSet {
    /// Parse definitions from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            InfParquetError::InvalidParameter(format!("invalid custom metadata definitions: {}", e))
        })
    }

    /// Load definitions from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| InfParquetError::io(e, path, ErrorKind::InvalidParameter))?;
        Self::from_str(&content)
    }
}

/// Outcome of one definition
#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    /// Evaluated and stored
    Stored(CustomValue),
    /// Rejected; the document was not changed for this item
    Failed {
        /// Taxonomy code of the failure
        kind: ErrorKind,
        /// Failure message
        message: String,
    },
}

/// Per-item entry of a [`BatchReport`]
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    /// Definition name
    pub name: String,
    /// What happened
    pub status: ItemStatus,
}

/// Aggregate outcome of a batch of definitions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// One entry per definition, in input order
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    /// Number of stored items
    pub fn succeeded(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.status, ItemStatus::Stored(_)))
            .count()
    }

    /// Items that failed
    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|i| matches!(i.status, ItemStatus::Failed { .. }))
    }

    /// True when every item was stored
    pub fn is_ok(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} of {} custom metadata items stored",
            self.succeeded(),
            self.items.len()
        )?;
        for item in &self.items {
            match &item.status {
                ItemStatus::Stored(value) => writeln!(f, "  ok    {} = {}", item.name, value)?,
                ItemStatus::Failed { kind, message } => {
                    writeln!(f, "  FAIL  {}: [{}] {}", item.name, kind, message)?
                }
            }
        }
        Ok(())
    }
}
