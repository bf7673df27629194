//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment: programmatic defaults, project
//! YAML files, then `GOVERNED_*` environment variables.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
