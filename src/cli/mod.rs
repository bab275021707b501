use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod batch;
mod info;
mod query;

/// mzRange - range queries over mass spectrometry caches and raw files
#[derive(Parser)]
#[command(name = "mzrange")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments shared by single-acquisition queries
#[derive(clap::Args, Debug)]
pub struct QueryArgs {
    /// Acquisition name (file stem)
    #[arg(value_name = "NAME")]
    name: String,

    /// Lower m/z bound
    #[arg(value_name = "MZ_LOW", allow_negative_numbers = true)]
    mz_low: f64,

    /// Upper m/z bound
    #[arg(value_name = "MZ_HIGH", allow_negative_numbers = true)]
    mz_high: f64,

    /// Lower retention time bound (minutes)
    #[arg(value_name = "RT_LOW", allow_negative_numbers = true)]
    rt_low: f64,

    /// Upper retention time bound (minutes)
    #[arg(value_name = "RT_HIGH", allow_negative_numbers = true)]
    rt_high: f64,

    /// Query the raw file instead of the cache
    #[arg(long)]
    raw: bool,

    /// Request profile data (implies --raw)
    #[arg(long)]
    profile: bool,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root directory to scan (repeatable, added to the config roots)
    #[arg(long = "root", value_name = "DIR")]
    roots: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the header summary of an .rch or folder.cache file as JSON
    Info {
        /// Cache file path
        #[arg(value_name = "CACHE")]
        file: PathBuf,
    },

    /// List registered raw acquisitions
    List {
        /// DOS wildcard mask (`*` and `?`)
        #[arg(value_name = "MASK", default_value = "*")]
        mask: String,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Root directory to scan (repeatable, added to the config roots)
        #[arg(long = "root", value_name = "DIR")]
        roots: Vec<PathBuf>,
    },

    /// Extract a chromatogram as (rt, intensity) pairs
    Chromatogram(QueryArgs),

    /// Extract every point of an LC-MS area as (mass, rt, intensity) triples
    Area(QueryArgs),

    /// Run a batch request described in a TOML file
    Batch {
        /// Batch request file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Root directory to scan (repeatable, added to the config roots)
        #[arg(long = "root", value_name = "DIR")]
        roots: Vec<PathBuf>,
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

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Info { file } => info::run(file),
        Commands::List {
            mask,
            config,
            roots,
        } => query::list(&mask, config, roots),
        Commands::Chromatogram(args) => query::chromatogram(args),
        Commands::Area(args) => query::area(args),
        Commands::Batch {
            input,
            config,
            roots,
        } => batch::run(input, config, roots),
    }
}
