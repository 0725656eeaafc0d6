use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;
use std::path::PathBuf;

use infparquet::pipeline::Progress;

mod compress;
mod config;
mod custom;
mod decompress;
mod list;
mod query;
mod verify;

pub use config::Config;

/// InfParquet - recompress Parquet column chunks with a queryable metadata index
#[derive(Parser)]
#[command(name = "infparquet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a Parquet file into a blob and a metadata document
    Compress {
        /// Input Parquet file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory (defaults to the input's directory)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Compression level (1-9)
        #[arg(short, long)]
        level: Option<i32>,

        /// Worker threads (0 = all cores)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Omit row counts and column statistics from the document
        #[arg(long)]
        no_basic_metadata: bool,

        /// Custom metadata definitions (TOML) to compute while compressing
        #[arg(long, value_name = "FILE")]
        custom: Option<PathBuf>,
    },

    /// Reconstruct the original Parquet file
    Decompress {
        /// Metadata document (*.infpq.json)
        #[arg(value_name = "METADATA")]
        metadata: PathBuf,

        /// Output file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Worker threads (0 = all cores)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Show a summary of a metadata document
    List {
        /// Metadata document (*.infpq.json)
        #[arg(value_name = "METADATA")]
        metadata: PathBuf,

        /// Print the raw document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Filter metadata documents with a predicate query
    Query {
        /// Query text, e.g. "SELECT * WHERE column.max > 100"
        #[arg(value_name = "QUERY")]
        query: String,

        /// Metadata documents to search
        #[arg(value_name = "METADATA", required = true)]
        metadata: Vec<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute custom metadata and store it in an existing document
    AddCustom {
        /// Metadata document (*.infpq.json)
        #[arg(value_name = "METADATA")]
        metadata: PathBuf,

        /// Definitions file (TOML, [[custom]] name/query entries)
        #[arg(long, value_name = "FILE", conflicts_with_all = ["name", "query"])]
        definitions: Option<PathBuf>,

        /// Name of a single item
        #[arg(long, requires = "query")]
        name: Option<String>,

        /// Derivation query of a single item
        #[arg(long, requires = "name")]
        query: Option<String>,

        /// Read rows from the original file instead of the archive
        #[arg(long, value_name = "FILE")]
        source: Option<PathBuf>,

        /// Worker threads used to reconstruct the rows (0 = all cores)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Check every compressed chunk against its checksum
    Verify {
        /// Metadata document (*.infpq.json)
        #[arg(value_name = "METADATA")]
        metadata: PathBuf,

        /// Worker threads (0 = all cores)
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// Progress observer for the command line: log and never cancel
pub(crate) fn log_progress(progress: &Progress) -> bool {
    match progress.row_group {
        Some(rg) => debug!(
            "{}: row group {}/{} ({:.0}%)",
            progress.operation,
            rg + 1,
            progress.total_row_groups,
            progress.percent
        ),
        None => debug!("{}: {:.0}%", progress.operation, progress.percent),
    }
    true
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Compress {
            input,
            output_dir,
            level,
            workers,
            no_basic_metadata,
            custom,
        } => compress::run(
            input,
            output_dir,
            config.compress_options(level, workers, no_basic_metadata),
            custom,
        ),
        Commands::Decompress {
            metadata,
            output,
            workers,
        } => decompress::run(metadata, output, config.decompress_options(workers)),
        Commands::List { metadata, json } => list::run(metadata, json),
        Commands::Query {
            query,
            metadata,
            json,
        } => query::run(query, metadata, json),
        Commands::AddCustom {
            metadata,
            definitions,
            name,
            query,
            source,
            workers,
        } => custom::run(
            metadata,
            definitions,
            name.zip(query),
            source,
            config.decompress_options(workers),
        ),
        Commands::Verify { metadata, workers } => {
            verify::run(metadata, config.decompress_options(workers))
        }
    }
}
