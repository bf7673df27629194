//! URL prober port - lightweight existence checks for cited links.

use std::time::Duration;

use async_trait::async_trait;

/// Result of probing one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered with this HTTP status.
    Status(u16),
    TimedOut,
    Failed(String),
}

impl ProbeOutcome {
    /// 2xx and 3xx count as reachable.
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Status(code) if (200..400).contains(code))
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Status(code) => format!("HTTP {code}"),
            Self::TimedOut => "timed out".to_string(),
            Self::Failed(reason) => reason.clone(),
        }
    }
}

/// Probes URLs with a bounded timeout.
#[async_trait]
pub trait UrlProber: Send + Sync {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}
