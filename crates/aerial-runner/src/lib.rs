//! # aerial-runner
//!
//! Batch extraction of building-centered aerial images.
//!
//! The [`Driver`] feeds building records through a
//! [`ViewExtractor`](aerial_tiles::ViewExtractor), retrying once with a larger
//! tile neighborhood when the crop does not fit, and writes one PNG per
//! building. The `aerial` binary wraps it together with the dataset split and
//! undersampling tools.

pub mod driver;
mod error;

pub use driver::{Driver, RecordOutcome, RunSummary};
pub use error::RunnerError;

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
