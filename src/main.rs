//! # mzRange
//!
//! Command-line access to the range-query service.
//!
//! ## Usage
//!
//! ```bash
//! # Header summary of a cache file
//! mzrange info sample_01.rch
//!
//! # Chromatogram from the cache
//! mzrange chromatogram sample_01 445.11 445.13 10 12 --root /data/ms
//!
//! # Every point of an area, read from the mzML file
//! mzrange area sample_01 445.0 446.0 10 12 --raw --root /data/ms
//!
//! # Batch request described in TOML
//! mzrange batch --input request.toml --config mzrange.toml
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
