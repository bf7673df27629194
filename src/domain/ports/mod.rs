//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces implemented by the adapters:
//! - CommandRunner: external test, lint, and compile-check tools
//! - UrlProber: link reachability probes
//! - Reviewer: independent council reviewers
//! - ReputationRepository: durable per-worker reputation
//!
//! These traits keep the verification services independent of any
//! specific process, network, or storage implementation.

pub mod command_runner;
pub mod reputation_repository;
pub mod reviewer;
pub mod url_prober;

pub use command_runner::{
    CommandOutcome, CommandRequest, CommandRunner, CommandStatus, SHELL_NOT_FOUND_EXIT,
};
pub use reputation_repository::ReputationRepository;
pub use reviewer::{ReviewRequest, Reviewer};
pub use url_prober::{ProbeOutcome, UrlProber};
