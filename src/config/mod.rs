//! Application Configuration
//!
//! Scanner settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::analysis::{ConsensusConfig, ConsensusError};
use crate::mrz::parser::{DEFAULT_FILLER_SLACK, MAX_FILLER_SLACK};
use crate::mrz::MrzParser;
use crate::vision::DEFAULT_MIN_BLOCK_WIDTH_RATIO;

/// Settings that cannot be used to build a scanner
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid consensus settings: {0}")]
    Consensus(#[from] ConsensusError),
    #[error("alignment ratio {0} must be within (0, 1]")]
    AlignmentRatio(f32),
    #[error("filler slack {0} exceeds the maximum of 2")]
    FillerSlack(usize),
}

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// MRZ parser settings
    pub parser: ParserSettings,
    /// Consensus policy
    pub consensus: ConsensusConfig,
    /// Alignment feedback settings
    pub alignment: AlignmentSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Fail fast on settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.consensus.validate()?;
        if self.parser.max_filler_slack > MAX_FILLER_SLACK {
            return Err(ConfigError::FillerSlack(self.parser.max_filler_slack));
        }
        let ratio = self.alignment.min_block_width_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::AlignmentRatio(ratio));
        }
        Ok(())
    }
}

/// Parser-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Trailing fillers a line may be missing or have in excess
    pub max_filler_slack: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            max_filler_slack: DEFAULT_FILLER_SLACK,
        }
    }
}

impl ParserSettings {
    /// Build a parser from these settings
    pub fn build(&self) -> MrzParser {
        MrzParser::new(self.max_filler_slack)
    }
}

/// Alignment feedback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentSettings {
    /// Fraction of the view width a text block must span
    pub min_block_width_ratio: f32,
}

impl Default for AlignmentSettings {
    fn default() -> Self {
        Self {
            min_block_width_ratio: DEFAULT_MIN_BLOCK_WIDTH_RATIO,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
