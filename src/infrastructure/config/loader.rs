use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::{Config, QualityDimension, MAX_SCORE};

/// Maximum correction budget per stage.
pub const MAX_CORRECTION_ATTEMPTS: u32 = 10;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid threshold for {dimension}: {threshold}. Must be between 0 and 9")]
    InvalidDimensionThreshold { dimension: String, threshold: u8 },

    #[error("Invalid similarity threshold: {0}. Must be between 0.0 and 1.0")]
    InvalidSimilarityThreshold(f64),

    #[error("Invalid max_correction_attempts: {0}. Must be at most 10")]
    InvalidMaxCorrectionAttempts(u32),

    #[error("Judge model cannot be empty")]
    EmptyJudgeModel,

    #[error("Direct correction timeout must be positive")]
    ZeroCorrectionTimeout,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .parley/config.yaml (project config)
    /// 3. .parley/local.yaml (local overrides, optional)
    /// 4. Environment variables (PARLEY_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".parley/config.yaml"))
            .merge(Yaml::file(".parley/local.yaml"))
            .merge(Env::prefixed("PARLEY_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        for dimension in QualityDimension::ALL {
            let threshold = config.gate.dimension(dimension).threshold;
            if threshold > MAX_SCORE {
                return Err(ConfigError::InvalidDimensionThreshold {
                    dimension: dimension.as_str().to_string(),
                    threshold,
                });
            }
        }

        let similarity = config.gate.similarity.threshold;
        if !(0.0..=1.0).contains(&similarity) {
            return Err(ConfigError::InvalidSimilarityThreshold(similarity));
        }

        if config.correction.max_correction_attempts > MAX_CORRECTION_ATTEMPTS {
            return Err(ConfigError::InvalidMaxCorrectionAttempts(
                config.correction.max_correction_attempts,
            ));
        }

        if config.judge.model.trim().is_empty() {
            return Err(ConfigError::EmptyJudgeModel);
        }

        if config.judge.direct_correction_timeout_ms == 0 {
            return Err(ConfigError::ZeroCorrectionTimeout);
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}
