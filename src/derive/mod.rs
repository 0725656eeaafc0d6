//! # Custom Metadata Builder
//!
//! Computes named values from the source rows and stores them as custom
//! metadata items. Derivations use a small SQL subset:
//!
//! ```text
//! SELECT COUNT(*) FROM data
//! SELECT MAX(price), AVG(price) FROM data WHERE city = 'Denver'
//! SELECT id, city FROM data WHERE price IS NULL LIMIT 10
//! ```
//!
//! Aggregates (`COUNT`, `SUM`, `AVG`, `MIN`, `MAX`) produce a scalar, or a
//! one-row table when several are selected. Projections produce a table of
//! at most [`MAX_TABLE_ROWS`] rows. The `FROM` name is not interpreted.
//!
//! This grammar is independent of the [`query`](crate::query) filter
//! language: derivations run over row data once, filters run over the
//! stored document.

mod batch;
mod eval;
mod parser;


pub use batch::{BatchReport, Definition, DefinitionSet, ItemReport, ItemStatus};
pub use eval::evaluate;
pub use parser::{
    parse, Aggregate, AggregateFn, Condition, DerivationQuery, Selection, MAX_TABLE_ROWS,
};

use bytes::Bytes;
use log::{info, warn};

use crate::error::{InfParquetError, Result};
use crate::layout::StructuralReader;
use crate::metadata::{CustomMetadataItem, MetadataDocument};
use crate::value::CustomValue;

/// Evaluates derivation queries against one source file
pub struct CustomMetadataBuilder<'a> {
    reader: &'a dyn StructuralReader,
    source: Bytes,
}

impl<'a> CustomMetadataBuilder<'a> {
    /// Builder over `source`, read through `reader`
    pub fn new(reader: &'a dyn StructuralReader, source: Bytes) -> Self {
        Self { reader, source }
    }

    /// Evaluate `query` without storing the result
    pub fn compute(&self, query: &str) -> Result<CustomValue> {
        let parsed = parse(query)?;
        let rows = self.reader.read_batches(&self.source)?;
        evaluate(&parsed, rows)
    }

    /// Evaluate `query` and store the result under `name`, replacing any
    /// existing item of that name. On failure the document is unchanged.
    pub fn define<'d>(
        &self,
        document: &'d mut MetadataDocument,
        name: &str,
        query: &str,
    ) -> Result<&'d CustomMetadataItem> {
        if name.trim().is_empty() {
            return Err(InfParquetError::InvalidParameter(
                "custom metadata name must not be empty".to_string(),
            ));
        }
        let value = self.compute(query)?;
        info!("Custom metadata '{}' = {}", name.trim(), value);
        document.insert_custom(name, Some(query.to_string()), value)
    }

    /// Evaluate every definition; failures are recorded per item and do not
    /// stop the batch.
    pub fn define_batch(
        &self,
        document: &mut MetadataDocument,
        definitions: &[Definition],
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for definition in definitions {
            let status = match self.define(document, &definition.name, &definition.query) {
                Ok(item) => ItemStatus::Stored(item.value.clone()),
                Err(e) => {
                    warn!("Custom metadata '{}' failed: {}", definition.name, e);
                    ItemStatus::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };
            report.items.push(ItemReport {
                name: definition.name.clone(),
                status,
            });
        }
        info!(
            "Stored {} of {} custom metadata items",
            report.succeeded(),
            report.items.len()
        );
        report
    }
}
