//! Configuration for cutover runs

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Main cutover configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CutoverConfig {
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub instantiate: InstantiateConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl CutoverConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: CutoverConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the splitter cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let split = &self.split;
        if split.scan_columns == 0 {
            return Err(ConfigError::NoColumns);
        }
        if split.date_column == 0 || split.date_column > split.scan_columns {
            return Err(ConfigError::DateColumnOutOfRange {
                date_column: split.date_column,
                scan_columns: split.scan_columns,
            });
        }
        if split.reference_row == 0 {
            return Err(ConfigError::ReferenceRow);
        }
        if self.run.workers == Some(0) {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Configuration error: scan_columns must be at least 1")]
    NoColumns,
    #[error(
        "Configuration error: date_column {date_column} is outside the scanned columns 1..={scan_columns}"
    )]
    DateColumnOutOfRange { date_column: u32, scan_columns: u32 },
    #[error("Configuration error: reference_row is 1-based and cannot be 0")]
    ReferenceRow,
    #[error("Configuration error: workers must be at least 1")]
    NoWorkers,
}

/// How ledger sheets are split and extended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// 1-based column holding each row's governing date
    pub date_column: u32,
    /// Number of leading columns copied from each row
    pub scan_columns: u32,
    /// Consecutive blank dates tolerated before the scan stops
    pub blank_run_limit: u32,
    /// Row of the reference document holding the anchor formulas
    pub reference_row: u32,
    /// Formulas are filled down through at least this row
    pub fill_rows: u32,
    /// Number format applied to the date column of the current output
    pub date_format: String,
    pub freeze_header: bool,
    pub restore_companion_formulas: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            date_column: 6,
            scan_columns: 11,
            blank_run_limit: 9,
            reference_row: 2,
            fill_rows: 5000,
            date_format: "MM/DD/YY h:mm AM/PM".to_string(),
            freeze_header: true,
            restore_companion_formulas: true,
        }
    }
}

/// Per-entity documents generated from a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstantiateConfig {
    /// Appended to the entity name in output file names
    pub suffix: String,
    /// Entity label of the preview output that keeps the placeholder header
    pub preview_name: String,
    /// Header text (case-insensitive) marking the entity name column
    pub header: String,
}

impl Default for InstantiateConfig {
    fn default() -> Self {
        Self {
            suffix: String::new(),
            preview_name: "AATemplate".to_string(),
            header: "name".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Worker threads; one per job when unset
    pub workers: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CutoverConfig::default();
        assert_eq!(config.split.date_column, 6);
        assert_eq!(config.split.scan_columns, 11);
        assert_eq!(config.split.blank_run_limit, 9);
        assert_eq!(config.split.fill_rows, 5000);
        assert_eq!(config.instantiate.preview_name, "AATemplate");
        assert!(config.run.workers.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: CutoverConfig = toml::from_str(
            r#"
            [split]
            fill_rows = 200
            freeze_header = false

            [run]
            workers = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.split.fill_rows, 200);
        assert!(!config.split.freeze_header);
        assert_eq!(config.split.date_column, 6);
        assert_eq!(config.run.workers, Some(4));
        assert_eq!(config.instantiate, InstantiateConfig::default());
    }

    #[test]
    fn test_validation() {
        let mut config = CutoverConfig::default();
        config.split.date_column = 12;
        assert_eq!(
            config.validate(),
            Err(ConfigError::DateColumnOutOfRange { date_column: 12, scan_columns: 11 })
        );

        let mut config = CutoverConfig::default();
        config.split.scan_columns = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoColumns));

        let mut config = CutoverConfig::default();
        config.split.reference_row = 0;
        assert_eq!(config.validate(), Err(ConfigError::ReferenceRow));

        let mut config = CutoverConfig::default();
        config.run.workers = Some(0);
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));
    }
}
