use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid timeout for {0}: must be at least 1 second")]
    ZeroTimeout(&'static str),

    #[error("Invalid max_urls: must be at least 1")]
    InvalidMaxUrls,

    #[error("Invalid ledger alpha: {0}. Must be in (0, 1]")]
    InvalidAlpha(f64),

    #[error(
        "Invalid date window: max_past_years ({0}) and max_future_years ({1}) must be between 0 and {max}",
        max = MAX_DATE_WINDOW_YEARS
    )]
    InvalidDateWindow(i32, i32),
}

/// Largest accepted `max_past_years` / `max_future_years`.
pub const MAX_DATE_WINDOW_YEARS: i32 = 1000;

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .governed/config.yaml (project config)
    /// 3. .governed/local.yaml (local overrides, optional)
    /// 4. Environment variables (GOVERNED_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".governed/config.yaml"))
            .merge(Yaml::file(".governed/local.yaml"))
            .merge(Env::prefixed("GOVERNED_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("GOVERNED_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let verification = &config.verification;
        if verification.command_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("command_timeout_secs"));
        }
        if verification.url_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("url_timeout_secs"));
        }
        if verification.reviewer_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("reviewer_timeout_secs"));
        }
        if verification.max_urls == 0 {
            return Err(ConfigError::InvalidMaxUrls);
        }
        let window = 0..=MAX_DATE_WINDOW_YEARS;
        if !window.contains(&verification.max_past_years)
            || !window.contains(&verification.max_future_years)
        {
            return Err(ConfigError::InvalidDateWindow(
                verification.max_past_years,
                verification.max_future_years,
            ));
        }

        let alpha = config.ledger.alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::InvalidAlpha(alpha));
        }

        Ok(())
    }
}
