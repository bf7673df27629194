//! Governed Agents - contract verification for untrusted agent workers
//!
//! A worker's self-report is never taken at face value. Each task carries a
//! [`TaskContract`]; the worker's [`WorkerClaim`] is checked either by
//! deterministic gates (files, tests, lint, parse) or by a three-layer
//! council (structural, grounding, independent reviewers). The verdict is
//! scored against what the worker claimed, and the score moves the worker's
//! reputation in a persistent ledger. A claimed success that fails
//! verification scores below an honest failure.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors, and port traits
//! - **Service Layer** (`services`): gates, council, scoring, ledger, orchestration
//! - **Adapters** (`adapters`): `SQLite`, processes, HTTP, reviewers
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use governed_agents::adapters::sqlite::initialize_database;
//! use governed_agents::adapters::{
//!     MockReviewer, ReqwestUrlProber, SqliteReputationRepository, TokioCommandRunner,
//! };
//! use governed_agents::{ConfigLoader, ReputationLedger, TaskContract, VerificationOrchestrator, WorkerClaim};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let pool = initialize_database(&config.database).await?;
//!     let ledger = Arc::new(ReputationLedger::with_alpha(
//!         Arc::new(SqliteReputationRepository::new(pool)),
//!         config.ledger.alpha,
//!     ));
//!     let orchestrator = VerificationOrchestrator::new(
//!         Arc::new(TokioCommandRunner::new()),
//!         Arc::new(ReqwestUrlProber::new()?),
//!         Arc::new(MockReviewer::approving()),
//!         ledger,
//!         &config.verification,
//!     );
//!
//!     let contract = TaskContract::builder("Add a parser").required_file("parser.py").build()?;
//!     let report = orchestrator
//!         .verify_and_record(&contract, &WorkerClaim::success(), "worker-1")
//!         .await?;
//!     println!("{}", report.verdict.summary);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, CouncilSettings, CouncilTally, GateId, OutcomeScore, ReputationRecord,
    SelfReportedStatus, SupervisionLevel, TaskContract, TaskType, VerificationMode,
    VerificationVerdict, WorkerClaim, WorkerStats,
};
pub use domain::ports::{CommandRunner, ReputationRepository, Reviewer, UrlProber};
pub use domain::{ContractError, DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    CouncilAggregator, GateEngine, GroundingGate, ReputationLedger, ScoringPolicy,
    StructuralGate, VerificationOrchestrator, VerificationReport,
};
