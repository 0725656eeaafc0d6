use anyhow::{Context, Result};
use std::path::PathBuf;

use infparquet::archive::Archive;
use infparquet::derive::{Definition, DefinitionSet};
use infparquet::pipeline::DecompressOptions;

/// Add custom metadata to an existing document
pub fn run(
    metadata: PathBuf,
    definitions: Option<PathBuf>,
    single: Option<(String, String)>,
    source: Option<PathBuf>,
    options: DecompressOptions,
) -> Result<()> {
    let definitions = match (definitions, single) {
        (Some(path), _) => {
            DefinitionSet::from_file(&path)
                .with_context(|| format!("Failed to load definitions: {}", path.display()))?
                .custom
        }
        (None, Some((name, query))) => vec![Definition { name, query }],
        (None, None) => anyhow::bail!("Provide --definitions FILE or --name and --query"),
    };

    let report = Archive::default()
        .add_custom(&metadata, &definitions, source.as_deref(), &options)
        .with_context(|| format!("Failed to update {}", metadata.display()))?;

    print!("{}", report);
    if !report.is_ok() {
        anyhow::bail!(
            "{} of {} definitions failed",
            report.failures().count(),
            report.items.len()
        );
    }
    Ok(())
}
