use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::reputation::EMA_ALPHA;

/// Main configuration structure for governed agents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Verification pipeline limits
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Reputation ledger parameters
    #[serde(default)]
    pub ledger: LedgerConfig,
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
    ".governed/reputation.db".to_string()
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

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log file rotation
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Timeouts and bounds for external calls made during verification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VerificationConfig {
    /// Timeout for test, lint, and compile-check commands
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Timeout per URL probe
    #[serde(default = "default_url_timeout_secs")]
    pub url_timeout_secs: u64,

    /// Maximum number of URLs probed per output
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,

    /// Timeout per reviewer call
    #[serde(default = "default_reviewer_timeout_secs")]
    pub reviewer_timeout_secs: u64,

    /// Minimum non-whitespace characters in a section body
    #[serde(default = "default_min_section_chars")]
    pub min_section_chars: usize,

    /// Dates older than this many years are flagged
    #[serde(default = "default_max_past_years")]
    pub max_past_years: i32,

    /// Dates further ahead than this many years are flagged
    #[serde(default = "default_max_future_years")]
    pub max_future_years: i32,
}

const fn default_command_timeout_secs() -> u64 {
    300
}

const fn default_url_timeout_secs() -> u64 {
    3
}

const fn default_max_urls() -> usize {
    5
}

const fn default_reviewer_timeout_secs() -> u64 {
    120
}

const fn default_min_section_chars() -> usize {
    20
}

const fn default_max_past_years() -> i32 {
    10
}

const fn default_max_future_years() -> i32 {
    5
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout_secs(),
            url_timeout_secs: default_url_timeout_secs(),
            max_urls: default_max_urls(),
            reviewer_timeout_secs: default_reviewer_timeout_secs(),
            min_section_chars: default_min_section_chars(),
            max_past_years: default_max_past_years(),
            max_future_years: default_max_future_years(),
        }
    }
}

impl VerificationConfig {
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub const fn url_timeout(&self) -> Duration {
        Duration::from_secs(self.url_timeout_secs)
    }

    pub const fn reviewer_timeout(&self) -> Duration {
        Duration::from_secs(self.reviewer_timeout_secs)
    }
}

/// Reputation ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LedgerConfig {
    /// EMA smoothing factor, in (0, 1]
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

const fn default_alpha() -> f64 {
    EMA_ALPHA
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
        }
    }
}
