//! # Query Engine
//!
//! Filters metadata documents with a small SQL-like predicate language:
//!
//! ```text
//! SELECT * WHERE total_rows > 500
//! SELECT * WHERE column.name = 'price' AND NOT column.null_count = 0
//! SELECT * WHERE (num_row_groups >= 2 OR codec_level = 9) AND row_group.num_rows < 75
//! ```
//!
//! Attributes resolve against the built-in document fields first (names are
//! case-insensitive) and then against custom items (exact name). Built-ins
//! come in three scopes:
//!
//! | Scope | Attributes |
//! |-------|------------|
//! | file | `source_name`, `source_size`, `compressed_size`, `compression_ratio`, `num_rows`, `num_row_groups`, `num_columns`, `format_version`, `codec`, `codec_level` |
//! | row group | `row_group.index`, `row_group.num_rows`, `row_group.byte_size` |
//! | column chunk | `column.name`, `column.type`, `column.index`, `column.min`, `column.max`, `column.null_count`, `column.original_length`, `column.compressed_length`, `column.compression_ratio` |
//!
//! Predicates over row-group or column attributes also report which row
//! groups and column chunks satisfied them. A comparison between values of
//! incompatible types, or against a missing statistic, is false for every
//! operator.
//!
//! ## Example
//!
//! ```rust,no_run
//! use infparquet::metadata::MetadataDocument;
//! use infparquet::query;
//!
//! let document = MetadataDocument::load("out/data.parquet.infpq.json")?;
//! let result = query::run(&document, "SELECT * WHERE column.max > 100")?;
//! for column in &result.matching_columns {
//!     println!("{}", column);
//! }
//! # Ok::<(), infparquet::InfParquetError>(())
//! ```

mod eval;
mod parser;
mod result;


pub use eval::evaluate;
pub use parser::{parse, CompareOp, Query, QueryPredicate};
pub use result::{ColumnRef, QueryResult, RowGroupRef};

use crate::error::Result;
use crate::metadata::MetadataDocument;

/// Parse `text` and evaluate it against `document`
pub fn run(document: &MetadataDocument, text: &str) -> Result<QueryResult> {
    let query = parse(text)?;
    evaluate(document, &query)
}
