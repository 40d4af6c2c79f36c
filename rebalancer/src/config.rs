//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one `<id>.json` file per portfolio
    #[serde(default = "default_store_dir")]
    pub dir: String,
}

fn default_store_dir() -> String {
    "./portfolios".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Symbol printed in front of money amounts
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Holdings shown individually in the allocation breakdown
    #[serde(default = "default_top_holdings")]
    pub top_holdings: usize,
}

fn default_currency() -> String {
    "₹".into()
}
fn default_top_holdings() -> usize {
    folio::portfolio::DEFAULT_TOP_HOLDINGS
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            top_holdings: default_top_holdings(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Load config from a TOML file, or fall back to defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("{} not found, using default config", path.display());
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.store.dir.trim().is_empty() {
            return Err(Error::Config("store dir must not be empty".into()));
        }
        if self.display.top_holdings == 0 {
            return Err(Error::Config("top_holdings must be > 0".into()));
        }
        if self.logging.audit_file.trim().is_empty() {
            return Err(Error::Config("audit_file must not be empty".into()));
        }
        Ok(())
    }

    /// Directory of the portfolio store.
    pub fn store_dir(&self) -> PathBuf {
        PathBuf::from(&self.store.dir)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// Format an amount in the smallest currency unit with the configured symbol.
    pub fn money(&self, amount: i64) -> String {
        format!("{}{}", self.display.currency, folio::Price(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[store]
dir = "./data/portfolios"

[display]
currency = "$"
top_holdings = 3

[logging]
dir = "./logs"
audit_file = "audit.jsonl"
"#
    }

    #[test]
    fn parse_example_config() {
        let config = Config::from_toml(example_toml()).unwrap();
        assert_eq!(config.store.dir, "./data/portfolios");
        assert_eq!(config.display.currency, "$");
        assert_eq!(config.display.top_holdings, 3);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.store.dir, "./portfolios");
        assert_eq!(config.display.currency, "₹");
        assert_eq!(config.display.top_holdings, 5);
        assert_eq!(config.logging.audit_file, "audit.jsonl");
    }

    #[test]
    fn partial_section_fills_defaults() {
        let config = Config::from_toml("[display]\ncurrency = \"€\"\n").unwrap();
        assert_eq!(config.display.currency, "€");
        assert_eq!(config.display.top_holdings, 5);
    }

    #[test]
    fn validate_catches_zero_top_holdings() {
        let toml = example_toml().replace("top_holdings = 3", "top_holdings = 0");
        assert!(matches!(Config::from_toml(&toml), Err(Error::Config(_))));
    }

    #[test]
    fn validate_catches_empty_store_dir() {
        let mut config = Config::default();
        config.store.dir = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            Config::from_toml("[store\ndir = 1"),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn audit_path() {
        let config = Config::from_toml(example_toml()).unwrap();
        assert_eq!(
            config.audit_path(),
            std::path::PathBuf::from("./logs/audit.jsonl")
        );
    }

    #[test]
    fn money_format() {
        let config = Config::from_toml(example_toml()).unwrap();
        assert_eq!(config.money(1394_20), "$1394.20");
        assert_eq!(Config::default().money(-5_00), "₹-5.00");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("folio.toml")).unwrap();
        assert_eq!(config.store.dir, "./portfolios");
        assert!(matches!(
            Config::load(&dir.path().join("folio.toml")),
            Err(Error::ConfigRead { .. })
        ));
    }
}
