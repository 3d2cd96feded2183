use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::bse::screener::error::{Result, ScreenerError};

/// Settings shared by the collection, flattening, and screening commands.
///
/// Every field has a default, so a configuration file only needs the values
/// it wants to change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScreenerConfig {
    /// Listing of active equities (CSV or XLSX with a header row, or the
    /// exchange description text list).
    pub stock_list: PathBuf,
    /// Zero-based column of the listing that holds the scrip codes.
    pub code_column: usize,
    /// JSON file holding cached per-company records.
    pub cache_file: PathBuf,
    /// Number of newly fetched companies between cache checkpoints.
    pub checkpoint_every: usize,
    /// Workbook produced by the flatten command.
    pub spreadsheet: PathBuf,
    /// Exchange name written next to each screened stock.
    pub exchange: String,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            stock_list: PathBuf::from("Equity.csv"),
            code_column: 0,
            cache_file: PathBuf::from("result.json"),
            checkpoint_every: 10,
            spreadsheet: PathBuf::from("data.xlsx"),
            exchange: "BSE".to_string(),
        }
    }
}

impl ScreenerConfig {
    /// Loads a configuration file, falling back to defaults for absent keys.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScreenerError::MissingInput(path.to_path_buf()));
        }
        let source = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.checkpoint_every == 0 {
            return Err(ScreenerError::InvalidConfig(
                "checkpoint_every must be at least 1".into(),
            ));
        }
        if self.exchange.trim().is_empty() {
            return Err(ScreenerError::InvalidConfig("exchange must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let config: ScreenerConfig =
            serde_json::from_str(r#"{"checkpoint_every": 25}"#).expect("config parsed");
        assert_eq!(config.checkpoint_every, 25);
        assert_eq!(config.cache_file, PathBuf::from("result.json"));
        assert_eq!(config.exchange, "BSE");
    }

    #[test]
    fn zero_checkpoint_frequency_is_rejected() {
        let config = ScreenerConfig {
            checkpoint_every: 0,
            ..ScreenerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ScreenerError::InvalidConfig(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed = serde_json::from_str::<ScreenerConfig>(r#"{"cache": "x.json"}"#);
        assert!(parsed.is_err());
    }
}
