//! CLI argument parsing for snrebin

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

/// Output format for rebinned scalers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format (default)
    #[default]
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "snrebin")]
#[command(version)]
#[command(about = "Rebin 1.6384 ms supernova scalers onto a 2 ms grid", long_about = None)]
pub struct Cli {
    /// SN scaler payload file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output format (overrides the config file)
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Show a per-DOM summary (hits in, hits out) on stderr
    #[arg(short = 'c', long = "summary")]
    pub statistics: bool,

    /// Start of 2 ms bin 0, in 0.1 ns since start of year (default: first payload's time)
    #[arg(
        long = "raw-start",
        value_name = "UTIME",
        value_parser = clap::value_parser!(u64).range(..=i64::MAX as u64)
    )]
    pub raw_start: Option<u64>,

    /// Stage payloads per DOM and print completed 2 ms bins instead of per-payload events
    #[arg(long = "stage")]
    pub stage: bool,

    /// Path to snrebin.toml
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_file() {
        let cli = Cli::parse_from(["snrebin", "sn_260295.dat"]);
        assert_eq!(cli.file, PathBuf::from("sn_260295.dat"));
        assert!(cli.format.is_none());
        assert!(!cli.statistics);
        assert!(!cli.stage);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_requires_file() {
        assert!(Cli::try_parse_from(["snrebin"]).is_err());
    }

    #[test]
    fn test_cli_format() {
        let cli = Cli::parse_from(["snrebin", "--format", "csv", "x.dat"]);
        assert_eq!(cli.format, Some(OutputFormat::Csv));
    }

    #[test]
    fn test_cli_summary_flag() {
        let cli = Cli::parse_from(["snrebin", "-c", "x.dat"]);
        assert!(cli.statistics);
    }

    #[test]
    fn test_cli_raw_start() {
        let cli = Cli::parse_from(["snrebin", "--raw-start", "20000000", "x.dat"]);
        assert_eq!(cli.raw_start, Some(20_000_000));
    }

    #[test]
    fn test_cli_rejects_negative_raw_start() {
        assert!(Cli::try_parse_from(["snrebin", "--raw-start", "-1", "x.dat"]).is_err());
    }

    #[test]
    fn test_cli_rejects_raw_start_beyond_payload_range() {
        let too_late = (i64::MAX as u64 + 1).to_string();
        assert!(Cli::try_parse_from(["snrebin", "--raw-start", &too_late, "x.dat"]).is_err());
        let latest = i64::MAX.to_string();
        let cli = Cli::parse_from(["snrebin", "--raw-start", &latest, "x.dat"]);
        assert_eq!(cli.raw_start, Some(i64::MAX as u64));
    }

    #[test]
    fn test_cli_stage_and_config() {
        let cli = Cli::parse_from(["snrebin", "--stage", "--config", "snrebin.toml", "x.dat"]);
        assert!(cli.stage);
        assert_eq!(cli.config, Some(PathBuf::from("snrebin.toml")));
    }
}
