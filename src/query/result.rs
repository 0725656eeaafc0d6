use std::fmt;

use serde::{Deserialize, Serialize};

/// A row group that satisfied a predicate
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowGroupRef {
    /// Source name of the file holding the row group
    pub file: String,
    /// Row group index within that file
    pub row_group_index: usize,
}

impl fmt::Display for RowGroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rg{}", self.file, self.row_group_index)
    }
}

/// A column chunk that satisfied a predicate
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Source name of the file holding the chunk
    pub file: String,
    /// Row group index
    pub row_group_index: usize,
    /// Column index
    pub column_index: usize,
    /// Column path from the schema
    pub column_name: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rg{}/{} ({})",
            self.file, self.row_group_index, self.column_index, self.column_name
        )
    }
}

/// Outcome of evaluating a query against one document.
///
/// `success` is false only when the query could not be evaluated; a query
/// that matched nothing is a success with empty match lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Whether evaluation completed
    pub success: bool,
    /// Summary for display
    pub message: String,
    /// Source names of matching files, each listed once
    pub matching_files: Vec<String>,
    /// Matching row groups, ascending by (file, row group)
    pub matching_row_groups: Vec<RowGroupRef>,
    /// Matching column chunks, ascending by (file, row group, column)
    pub matching_columns: Vec<ColumnRef>,
}

impl QueryResult {
    /// True when nothing matched
    pub fn is_empty(&self) -> bool {
        self.matching_files.is_empty()
    }

    /// Merge another document's result into this one
    pub fn merge(&mut self, other: QueryResult) {
        self.success &= other.success;
        for file in other.matching_files {
            if !self.matching_files.contains(&file) {
                self.matching_files.push(file);
            }
        }
        self.matching_row_groups.extend(other.matching_row_groups);
        self.matching_row_groups.sort();
        self.matching_row_groups.dedup();
        self.matching_columns.extend(other.matching_columns);
        self.matching_columns.sort();
        self.matching_columns.dedup();
        self.message = summary(self);
    }
}

pub(crate) fn summary(result: &QueryResult) -> String {
    if result.matching_files.is_empty() {
        return "No matches".to_string();
    }
    let mut message = format!("Matched {} file(s)", result.matching_files.len());
    if !result.matching_row_groups.is_empty() {
        message.push_str(&format!(
            ", {} row group(s)",
            result.matching_row_groups.len()
        ));
    }
    if !result.matching_columns.is_empty() {
        message.push_str(&format!(
            ", {} column chunk(s)",
            result.matching_columns.len()
        ));
    }
    message
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        for file in &self.matching_files {
            writeln!(f, "  file: {}", file)?;
        }
        for row_group in &self.matching_row_groups {
            writeln!(f, "  row group: {}", row_group)?;
        }
        for column in &self.matching_columns {
            writeln!(f, "  column: {}", column)?;
        }
        Ok(())
    }
}
