//! Adapters for external systems: processes, HTTP, reviewers, and storage.

pub mod http;
pub mod memory;
pub mod process;
pub mod reviewers;
pub mod sqlite;

pub use http::ReqwestUrlProber;
pub use memory::InMemoryReputationRepository;
pub use process::TokioCommandRunner;
pub use reviewers::{CommandReviewer, MockReview, MockReviewer};
pub use sqlite::SqliteReputationRepository;
