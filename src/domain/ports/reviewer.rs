//! Reviewer port - the channel to independent council reviewers.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// One request to one council seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    /// Zero-based index of the council seat, so a channel can route seats
    /// to different reviewers.
    pub seat: usize,
    pub prompt: String,
}

/// Text-in, text-out reviewer channel.
///
/// The returned text is untrusted and is expected to contain a JSON object
/// with `verdict`, `confidence`, `strengths`, and `weaknesses`.
#[async_trait]
pub trait Reviewer: Send + Sync {
    fn name(&self) -> &str;

    async fn review(&self, request: &ReviewRequest) -> DomainResult<String>;
}
