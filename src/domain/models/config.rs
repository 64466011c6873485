use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::correction::CorrectionConfig;
use super::quality_gate::GateConfig;

/// Main configuration structure for parley-judge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Judge model and transport settings
    #[serde(default)]
    pub judge: JudgeConfig,

    /// Quality gate dimensions and thresholds
    #[serde(default)]
    pub gate: GateConfig,

    /// Correction pipeline budgets
    #[serde(default)]
    pub correction: CorrectionConfig,

    /// Built-in intervention settings
    #[serde(default)]
    pub interventions: InterventionSettings,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Judge model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JudgeConfig {
    /// Model identifier passed to the judge client
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum output tokens per judge call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API version header
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Transport timeout for ordinary judge calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for the direct correction rewrite call
    #[serde(default = "default_direct_correction_timeout_ms")]
    pub direct_correction_timeout_ms: u64,
}

fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

const fn default_max_tokens() -> u32 {
    1024
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_direct_correction_timeout_ms() -> u64 {
    5000
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            base_url: default_base_url(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            direct_correction_timeout_ms: default_direct_correction_timeout_ms(),
        }
    }
}

/// Settings for the built-in interventions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InterventionSettings {
    /// Minimum trajectory length before the variety intervention is considered
    #[serde(default = "default_variety_message_threshold")]
    pub variety_message_threshold: usize,
}

const fn default_variety_message_threshold() -> usize {
    10
}

impl Default for InterventionSettings {
    fn default() -> Self {
        Self {
            variety_message_threshold: default_variety_message_threshold(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".parley/audit.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for file output: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
