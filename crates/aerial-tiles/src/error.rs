//! Error types for the aerial tiles crate.

use crate::tile::TileCoord;
use thiserror::Error;

/// Errors that can occur while fetching tiles and extracting views.
#[derive(Debug, Error)]
pub enum AerialError {
    /// The tile server answered with a non-success status.
    #[error("No image for tile {tile}, got HTTP {status}")]
    TileUnavailable {
        /// Tile that was requested.
        tile: TileCoord,
        /// HTTP status code returned by the server.
        status: u16,
    },

    /// The crop window is not fully contained in the fetched mosaic.
    #[error(
        "Mosaic of {mosaic_width}x{mosaic_height} px does not cover crop rows {row_start}..{row_end}, cols {col_start}..{col_end}"
    )]
    InsufficientCoverage {
        /// First row of the crop window.
        row_start: i64,
        /// One past the last row of the crop window.
        row_end: i64,
        /// First column of the crop window.
        col_start: i64,
        /// One past the last column of the crop window.
        col_end: i64,
        /// Mosaic width in pixels.
        mosaic_width: u32,
        /// Mosaic height in pixels.
        mosaic_height: u32,
    },

    /// Projection or transform is undefined for the given input.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Invalid zoom level.
    #[error("Invalid zoom level {0} (must be {min}-{max})", min = crate::MIN_ZOOM, max = crate::MAX_ZOOM)]
    InvalidZoomLevel(u8),

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error when fetching tiles.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Image decoding or encoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

/// Coarse classification of an [`AerialError`].
///
/// Callers branch on this to decide between retrying with a larger
/// neighborhood and giving up on a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A tile could not be fetched from the server.
    Fetch,
    /// The fetched mosaic was too small for the requested crop.
    Coverage,
    /// The input location cannot be projected.
    Geometry,
    /// Anything else (I/O, decoding, configuration).
    Other,
}

impl AerialError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            AerialError::TileUnavailable { .. } => FailureKind::Fetch,
            AerialError::InsufficientCoverage { .. } => FailureKind::Coverage,
            AerialError::DegenerateGeometry(_) => FailureKind::Geometry,
            _ => FailureKind::Other,
        }
    }
}
