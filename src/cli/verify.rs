use anyhow::{Context, Result};
use std::path::PathBuf;

use infparquet::archive::Archive;
use infparquet::pipeline::DecompressOptions;

/// Check every unit of an archive without writing output
pub fn run(metadata: PathBuf, options: DecompressOptions) -> Result<()> {
    let report = Archive::default()
        .verify(&metadata, &options, &super::log_progress)
        .with_context(|| format!("Failed to verify {}", metadata.display()))?;

    println!("Checked {} units", report.units_checked);
    if report.is_ok() {
        println!("  All checksums OK");
        return Ok(());
    }
    for (unit, failure) in &report.failures {
        println!("  FAIL {}: {}", unit, failure);
    }
    anyhow::bail!("{} units failed verification", report.failures.len())
}
