use anyhow::{Context, Result};
use std::path::PathBuf;

use infparquet::archive;

/// Display a metadata document
pub fn run(metadata: PathBuf, json: bool) -> Result<()> {
    let summary = archive::list(&metadata)
        .with_context(|| format!("Failed to read {}", metadata.display()))?;

    if json {
        println!("{}", summary.document.to_json()?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}
