use anyhow::{Context, Result};
use std::path::PathBuf;

use infparquet::archive::Archive;
use infparquet::pipeline::DecompressOptions;

/// Reconstruct the original file from a metadata document and its blob
pub fn run(metadata: PathBuf, output: PathBuf, options: DecompressOptions) -> Result<()> {
    let report = Archive::default()
        .decompress_file(&metadata, &output, &options, &super::log_progress)
        .with_context(|| format!("Decompression of {} failed", metadata.display()))?;

    println!(
        "Reconstructed {} ({} bytes)",
        report.output.display(),
        report.bytes_written
    );
    Ok(())
}
