//! snrebin.toml configuration
//!
//! # Example snrebin.toml
//!
//! ```toml
//! [staging]
//! ndom = 5160     # DOMs in the staging window
//! depth = 4000    # 2 ms bins kept per DOM
//!
//! [output]
//! format = "json" # text, json or csv
//! ```
//!
//! The scaler and destination bin widths are fixed and cannot be configured.

use crate::cli::OutputFormat;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_NDOM: usize = 5160;
pub const DEFAULT_DEPTH: usize = 4000;

/// Root configuration for snrebin.toml
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RebinConfig {
    pub staging: StagingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StagingConfig {
    pub ndom: usize,
    pub depth: usize,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            ndom: DEFAULT_NDOM,
            depth: DEFAULT_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

impl RebinConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RebinConfig = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// The staging window needs at least one DOM and two bins
    pub fn validate(&self) -> Result<()> {
        if self.staging.ndom == 0 {
            bail!("staging.ndom must be at least 1");
        }
        if self.staging.depth < 2 {
            bail!(
                "staging.depth must be at least 2 (got {})",
                self.staging.depth
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RebinConfig::from_toml_str("").unwrap();
        assert_eq!(config.staging.ndom, 5160);
        assert_eq!(config.staging.depth, 4000);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [staging]
            ndom = 86
            depth = 100

            [output]
            format = "csv"
        "#;
        let config = RebinConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.staging.ndom, 86);
        assert_eq!(config.staging.depth, 100);
        assert_eq!(config.output.format, OutputFormat::Csv);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config = RebinConfig::from_toml_str("[staging]\ndepth = 10\n").unwrap();
        assert_eq!(config.staging.ndom, DEFAULT_NDOM);
        assert_eq!(config.staging.depth, 10);
    }

    #[test]
    fn test_rejects_unknown_field() {
        let err = RebinConfig::from_toml_str("[staging]\nbinsize = 2\n").unwrap_err();
        assert!(format!("{:#}", err).contains("binsize"));
    }

    #[test]
    fn test_rejects_shallow_staging() {
        let err = RebinConfig::from_toml_str("[staging]\ndepth = 1\n").unwrap_err();
        assert!(err.to_string().contains("depth"));
        assert!(RebinConfig::from_toml_str("[staging]\nndom = 0\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snrebin.toml");
        fs::write(&path, "[output]\nformat = \"json\"\n").unwrap();
        let config = RebinConfig::from_file(&path).unwrap();
        assert_eq!(config.output.format, OutputFormat::Json);

        assert!(RebinConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
