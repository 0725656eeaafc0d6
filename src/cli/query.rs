use anyhow::{Context, Result};
use std::path::PathBuf;

use infparquet::archive;

/// Evaluate a predicate query over one or more documents
pub fn run(query: String, metadata: Vec<PathBuf>, json: bool) -> Result<()> {
    let result = archive::query_documents(&metadata, &query)
        .with_context(|| format!("Query failed: {}", query))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    } else {
        print!("{}", result);
    }
    Ok(())
}
