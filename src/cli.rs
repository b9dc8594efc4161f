//! Command-line interface for pipediff

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pipediff")]
#[command(about = "Snapshot and compare tabular data between pipeline steps")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Default log level: debug with `--verbose`, info otherwise
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

/// Capture settings shared by commands that log snapshots
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CaptureArgs {
    /// Aggregation functions, comma separated (e.g. "min,max,nans")
    #[arg(long)]
    pub agg: Option<String>,

    /// Only aggregate these columns, comma separated
    #[arg(long)]
    pub columns: Option<String>,

    /// Only aggregate these row labels, comma separated
    #[arg(long)]
    pub rows: Option<String>,

    /// JSON file with default capture options
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override a capture option, e.g. --set shape=true (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = validate_assignment)]
    pub overrides: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Snapshot two JSON datasets and compare them side by side
    Compare {
        /// First dataset (JSON)
        left: PathBuf,

        /// Second dataset (JSON)
        right: PathBuf,

        #[command(flatten)]
        capture: CaptureArgs,

        /// Group the comparison by entry instead of by column
        #[arg(long)]
        entries_first: bool,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Tabulate the dtypes of one or more datasets
    Dtypes {
        /// Datasets (JSON)
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Capture and print a single snapshot
    Show {
        /// Dataset (JSON)
        file: PathBuf,

        #[command(flatten)]
        capture: CaptureArgs,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Label and cell differences between two datasets
    Diff {
        /// Left dataset (JSON)
        left: PathBuf,

        /// Right dataset (JSON)
        right: PathBuf,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Parse output format string
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Validate that an override looks like `key=value`
fn validate_assignment(s: &str) -> Result<String, String> {
    match s.split_once('=') {
        Some((key, _)) if !key.trim().is_empty() => Ok(s.to_string()),
        _ => Err(format!("Invalid override: '{}'. Expected KEY=VALUE", s)),
    }
}
