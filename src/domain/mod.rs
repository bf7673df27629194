//! Domain layer for the governed agents system
//!
//! Contracts, claims, verdicts, and reputation, plus the port traits the
//! services depend on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ContractError, DomainError, DomainResult};
