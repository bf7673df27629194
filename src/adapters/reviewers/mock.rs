//! Scripted reviewer for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{ReviewRequest, Reviewer};

/// One scripted reviewer reply.
#[derive(Debug, Clone)]
pub enum MockReview {
    /// Return this raw text.
    Reply(String),
    /// Fail the call with a reviewer error.
    Fail(String),
    /// Sleep, then return the text.
    Delayed(Duration, String),
}

impl MockReview {
    pub fn approve(confidence: f64) -> Self {
        Self::Reply(format!(
            r#"{{"verdict": "approve", "confidence": {confidence}, "strengths": ["clear"], "weaknesses": []}}"#
        ))
    }

    pub fn reject(confidence: f64, weakness: &str) -> Self {
        Self::Reply(format!(
            r#"{{"verdict": "reject", "confidence": {confidence}, "strengths": [], "weaknesses": ["{weakness}"]}}"#
        ))
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }
}

/// Reviewer that replays scripted replies by seat and counts calls.
///
/// Seat `i` gets script entry `i % len`. An empty script approves.
pub struct MockReviewer {
    script: Vec<MockReview>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockReviewer {
    pub fn new(script: Vec<MockReview>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn approving() -> Self {
        Self::new(Vec::new())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl Reviewer for MockReviewer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn review(&self, request: &ReviewRequest) -> DomainResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().await.push(request.prompt.clone());

        let reply = if self.script.is_empty() {
            MockReview::approve(0.9)
        } else {
            self.script[request.seat % self.script.len()].clone()
        };

        match reply {
            MockReview::Reply(text) => Ok(text),
            MockReview::Fail(reason) => Err(DomainError::Reviewer(reason)),
            MockReview::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }
}
