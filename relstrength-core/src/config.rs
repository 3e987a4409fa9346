//! Evaluation configuration.
//!
//! Every knob of the pipeline is a named field with a default, so a TOML file
//! only needs the keys it changes:
//!
//! ```toml
//! benchmark_column = "Fused_equal"
//! window = 30
//! equity_columns = ["0700", "0005", "9988"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::Thresholds;
use crate::momentum::DEFAULT_WINDOW;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Parameters of one strength evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthConfig {
    /// Name of the date/key column in both source files.
    pub date_column: String,
    /// Factor column used as the fused benchmark.
    pub benchmark_column: String,
    /// Regression window for momentum.
    pub window: usize,
    /// Factor columns normalized for display.
    pub factor_columns: Vec<String>,
    /// Equity columns to classify. Empty means every equity column.
    pub equity_columns: Vec<String>,
    /// Relative level must be strictly above this to be strong.
    pub level_threshold: f64,
    /// Momentum rank must be strictly above this to be strong.
    pub rank_threshold: f64,
}

impl Default for StrengthConfig {
    fn default() -> Self {
        Self {
            date_column: "Date".into(),
            benchmark_column: "Fused_macro".into(),
            window: DEFAULT_WINDOW,
            factor_columns: ["HSI", "HSTECH", "USDCNH", "VHSI", "BTC"]
                .into_iter()
                .map(String::from)
                .collect(),
            equity_columns: Vec::new(),
            level_threshold: 0.0,
            rank_threshold: 0.5,
        }
    }
}

impl StrengthConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 2 {
            return Err(ConfigError::Invalid(format!(
                "window must be >= 2, got {}",
                self.window
            )));
        }
        if self.benchmark_column.trim().is_empty() {
            return Err(ConfigError::Invalid("benchmark_column is empty".into()));
        }
        if self.date_column.trim().is_empty() {
            return Err(ConfigError::Invalid("date_column is empty".into()));
        }
        if !(0.0..=1.0).contains(&self.rank_threshold) {
            return Err(ConfigError::Invalid(format!(
                "rank_threshold must be within [0, 1], got {}",
                self.rank_threshold
            )));
        }
        if !self.level_threshold.is_finite() {
            return Err(ConfigError::Invalid("level_threshold must be finite".into()));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            level: self.level_threshold,
            rank: self.rank_threshold,
        }
    }
}
