//! # aerial-tiles
//!
//! Geo-centered aerial image patches from slippy-map tiles.
//!
//! Given a WGS84 point, this crate fetches the tile containing it plus a ring
//! of neighbors from a tile server, stitches them into one mosaic, locates the
//! point in the mosaic and cuts a fixed-size square around it.
//!
//! ## Overview
//!
//! - [`tile`]: Web Mercator tile addressing and tile bounds
//! - [`cache`]: disk-backed tile cache with a politeness throttle
//! - [`mosaic`]: stitching of cached tiles
//! - [`transform`]: pixel <-> geographic affine transforms
//! - [`extract`]: the view extractor tying it all together
//!
//! Downloaded tiles are stored as `{x}-{y}-{z}.png` in the cache directory and
//! are never downloaded twice, so interrupted runs can simply be restarted.
//!
//! ## Example
//!
//! ```no_run
//! use aerial_tiles::{ExtractConfig, GeoPoint, HttpTileSource, TileServerConfig, ViewExtractor};
//!
//! let source = HttpTileSource::new(TileServerConfig::default())?;
//! let extractor = ViewExtractor::new("/tmp/tile_cache", source, ExtractConfig::default())?;
//!
//! let view = extractor.extract_view(&GeoPoint::new(11.5755, 48.1374), 1)?;
//! view.save("building.png")?;
//! # Ok::<(), aerial_tiles::AerialError>(())
//! ```

pub mod cache;
pub mod config;
mod error;
pub mod extract;
pub mod mosaic;
pub mod source;
pub mod tile;
pub mod transform;

pub use cache::{DownloadStats, Throttle, TileCache};
pub use config::{AerialConfig, ExtractConfig, TileServerConfig};
pub use error::{AerialError, FailureKind};
pub use extract::{CropWindow, ViewExtractor};
pub use mosaic::{build_mosaic, Mosaic};
pub use source::{FetchResponse, HttpTileSource, TileSource};
pub use tile::{locate_tile, neighborhood, tile_bounds, GeoPoint, TileBounds, TileCoord};
pub use transform::{derive_transform, AffineTransform};

/// Minimum valid zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum supported zoom level.
pub const MAX_ZOOM: u8 = 23;

/// Result type for tile operations.
pub type Result<T> = std::result::Result<T, AerialError>;
