//! # InfParquet
//!
//! Command-line front end for the `infparquet` library.
//!
//! ## Usage
//!
//! ```bash
//! # Compress, computing custom metadata from a definitions file
//! infparquet compress data.parquet -o out/ --level 9 --custom custom.toml
//!
//! # Inspect and filter
//! infparquet list out/data.parquet.infpq.json
//! infparquet query "SELECT * WHERE column.null_count > 0" out/*.infpq.json
//!
//! # Restore
//! infparquet decompress out/data.parquet.infpq.json restored.parquet
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
