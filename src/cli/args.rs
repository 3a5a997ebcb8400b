//! Command line argument parsing for the rankdata CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// rankdata - learning-to-rank data preparation
#[derive(Parser, Debug, Clone)]
#[command(name = "rankdata")]
#[command(about = "Turn ranking records into fixed-shape batches")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct RankDataArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl RankDataArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Aggregate a qid-sorted LibSVM file into per-query arrays (JSON lines)
    Libsvm(LibsvmArgs),

    /// Validate a feature config and show the resolved decode specs
    Specs(SpecsArgs),
}

/// Arguments for LibSVM aggregation
#[derive(Parser, Debug, Clone)]
pub struct LibsvmArgs {
    /// LibSVM input file, sorted by query id
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Number of features per document (ids 1..=N)
    #[arg(short = 'n', long)]
    pub num_features: usize,

    /// Documents per query after truncation and padding
    #[arg(short, long)]
    pub list_size: usize,

    /// Seed for the per-query document shuffle
    #[arg(short, long, env = "RANKDATA_SEED")]
    pub seed: Option<u64>,

    /// Write aggregates here instead of stdout
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Stop after this many queries
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Arguments for spec resolution
#[derive(Parser, Debug, Clone)]
pub struct SpecsArgs {
    /// Feature config file (JSON)
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override the config's list size
    #[arg(short, long)]
    pub list_size: Option<usize>,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity() {
        let args = RankDataArgs::try_parse_from(["rankdata", "specs", "features.json"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = RankDataArgs::try_parse_from(["rankdata", "-vv", "specs", "features.json"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        let args = RankDataArgs::try_parse_from(["rankdata", "--quiet", "specs", "features.json"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_libsvm_args() {
        let args = RankDataArgs::try_parse_from([
            "rankdata",
            "--format",
            "json",
            "libsvm",
            "train.txt",
            "--num-features",
            "136",
            "--list-size",
            "100",
            "--seed",
            "7",
        ])
        .unwrap();

        assert_eq!(args.output_format, OutputFormat::Json);
        if let Command::Libsvm(libsvm) = args.command {
            assert_eq!(libsvm.num_features, 136);
            assert_eq!(libsvm.list_size, 100);
            assert_eq!(libsvm.seed, Some(7));
            assert!(libsvm.output.is_none());
        } else {
            panic!("Expected Libsvm command");
        }
    }

    #[test]
    fn test_libsvm_requires_list_size() {
        assert!(RankDataArgs::try_parse_from(["rankdata", "libsvm", "train.txt", "-n", "3"]).is_err());
    }
}
