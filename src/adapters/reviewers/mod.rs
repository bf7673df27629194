//! Reviewer adapters.

pub mod command;
pub mod mock;

pub use command::CommandReviewer;
pub use mock::{MockReview, MockReviewer};
