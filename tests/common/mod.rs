//! Common test utilities for integration tests
//!
//! Shared fixtures for building orchestrators over real and scripted
//! adapters.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governed_agents::adapters::{InMemoryReputationRepository, MockReviewer, TokioCommandRunner};
use governed_agents::domain::models::VerificationConfig;
use governed_agents::domain::ports::{ProbeOutcome, UrlProber};
use governed_agents::{ReputationLedger, ReputationRepository, VerificationOrchestrator};
use tempfile::TempDir;

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write `contents` to `relative` under `dir`, creating parent directories.
pub fn write_file(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, contents).expect("Failed to write test file");
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Prober that answers every URL with the same status.
pub struct FixedProber(pub u16);

#[async_trait]
impl UrlProber for FixedProber {
    async fn probe(&self, _url: &str, _timeout: Duration) -> ProbeOutcome {
        ProbeOutcome::Status(self.0)
    }
}

pub fn memory_ledger() -> Arc<ReputationLedger<InMemoryReputationRepository>> {
    Arc::new(ReputationLedger::new(Arc::new(InMemoryReputationRepository::new())))
}

/// Orchestrator over real processes, a reachable-URL prober, and `reviewer`.
pub fn orchestrator_with<R: ReputationRepository>(
    ledger: Arc<ReputationLedger<R>>,
    reviewer: Arc<MockReviewer>,
) -> VerificationOrchestrator<R> {
    let config = VerificationConfig {
        command_timeout_secs: 30,
        reviewer_timeout_secs: 5,
        ..VerificationConfig::default()
    };
    VerificationOrchestrator::new(
        Arc::new(TokioCommandRunner::new()),
        Arc::new(FixedProber(200)),
        reviewer,
        ledger,
        &config,
    )
}

/// `n` whitespace-separated words.
pub fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}
