//! Error types for the runner.

use aerial_dataset::DatasetError;
use aerial_tiles::AerialError;
use thiserror::Error;

/// Errors that abort a command.
///
/// Per-record failures during a download run are not errors at this level;
/// they are logged and counted in the [`RunSummary`](crate::RunSummary).
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Tile extraction setup failed.
    #[error(transparent)]
    Tiles(#[from] AerialError),

    /// Reading or writing a building table failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// I/O error on the output directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
