use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;

use infparquet::archive::Archive;
use infparquet::derive::DefinitionSet;
use infparquet::pipeline::CompressOptions;

/// Compress a Parquet file into `<output_dir>/<name>.infpq` plus its document
pub fn run(
    input: PathBuf,
    output_dir: Option<PathBuf>,
    options: CompressOptions,
    custom: Option<PathBuf>,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let output_dir = output_dir.unwrap_or_else(|| match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    });
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let definitions = match &custom {
        Some(path) => {
            DefinitionSet::from_file(path)
                .with_context(|| format!("Failed to load definitions: {}", path.display()))?
                .custom
        }
        None => Vec::new(),
    };

    info!("Input:   {}", input.display());
    info!("Output:  {}", output_dir.display());
    info!("Level:   {}", options.level);
    info!(
        "Workers: {}",
        if options.workers == 0 {
            "auto".to_string()
        } else {
            options.workers.to_string()
        }
    );

    let report = Archive::default()
        .compress_file(
            &input,
            &output_dir,
            &options,
            &definitions,
            &super::log_progress,
        )
        .with_context(|| format!("Compression of {} failed", input.display()))?;

    println!("Compressed {}", input.display());
    println!("  Blob:     {}", report.paths.blob.display());
    println!("  Metadata: {}", report.paths.document.display());
    println!(
        "  Size:     {} -> {} bytes ({:.2}x, {} chunks)",
        report.source_size,
        report.blob_size,
        report.compression_ratio(),
        report.chunks
    );

    if !report.custom.items.is_empty() {
        print!("{}", report.custom);
        if !report.custom.is_ok() {
            warn!(
                "{} custom metadata definitions were not stored",
                report.custom.failures().count()
            );
        }
    }
    Ok(())
}
