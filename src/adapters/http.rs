//! reqwest-backed URL prober.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::domain::ports::{ProbeOutcome, UrlProber};

const USER_AGENT: &str = concat!("governed-agents/", env!("CARGO_PKG_VERSION"));

/// Probes links with HEAD, retrying with GET when the server rejects HEAD.
#[derive(Debug, Clone)]
pub struct ReqwestUrlProber {
    client: Client,
}

impl ReqwestUrlProber {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(2)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client for URL probing")?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, method: reqwest::Method, url: &str) -> ProbeOutcome {
        match self.client.request(method, url).send().await {
            Ok(response) => ProbeOutcome::Status(response.status().as_u16()),
            Err(e) if e.is_timeout() => ProbeOutcome::TimedOut,
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        }
    }
}

#[async_trait]
impl UrlProber for ReqwestUrlProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let attempt = async {
            let head = self.send(reqwest::Method::HEAD, url).await;
            if head == ProbeOutcome::Status(StatusCode::METHOD_NOT_ALLOWED.as_u16()) {
                debug!(url, "HEAD not allowed, retrying with GET");
                return self.send(reqwest::Method::GET, url).await;
            }
            head
        };

        // One deadline covers both attempts.
        let outcome = tokio::time::timeout(timeout, attempt)
            .await
            .unwrap_or(ProbeOutcome::TimedOut);
        debug!(url, outcome = %outcome.describe(), "probed url");
        outcome
    }
}
