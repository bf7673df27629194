//! Infrastructure layer module
//!
//! Configuration loading and logging setup. Storage and process adapters
//! live in `crate::adapters`.

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigLoader};
pub use logging::LoggerImpl;
