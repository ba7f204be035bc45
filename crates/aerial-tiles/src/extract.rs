//! Fixed-size views centered on a geographic point.

use crate::cache::{Throttle, TileCache};
use crate::config::ExtractConfig;
use crate::mosaic::build_mosaic;
use crate::source::TileSource;
use crate::tile::{locate_tile, neighborhood, GeoPoint};
use crate::transform::derive_transform;
use crate::{AerialError, Result};
use image::{imageops, RgbImage};
use std::path::Path;
use tracing::debug;

/// Square crop window in mosaic pixels, end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub row_start: i64,
    pub row_end: i64,
    pub col_start: i64,
    pub col_end: i64,
}

impl CropWindow {
    /// Window of side `size` whose center pixel is `(row, col)`.
    pub fn centered(row: i64, col: i64, size: u32) -> Self {
        let half = (size / 2) as i64;
        let row_start = row - half;
        let col_start = col - half;
        Self {
            row_start,
            row_end: row_start + size as i64,
            col_start,
            col_end: col_start + size as i64,
        }
    }

    /// Whether the window lies inside a `width` x `height` raster.
    ///
    /// A window ending exactly on the last row or column is rejected too.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.row_start >= 0
            && self.col_start >= 0
            && self.row_end < height as i64
            && self.col_end < width as i64
    }
}

/// Extracts views around points using a [`TileCache`].
#[derive(Debug)]
pub struct ViewExtractor<S> {
    cache: TileCache<S>,
    config: ExtractConfig,
}

impl<S: TileSource> ViewExtractor<S> {
    /// Create an extractor with a cache under `cache_dir`.
    ///
    /// The cache's throttle is built from the configured sleep parameters.
    pub fn new<P: AsRef<Path>>(cache_dir: P, source: S, config: ExtractConfig) -> Result<Self> {
        config.validate()?;
        let throttle = Throttle::new(config.mean_sleep, config.std_sleep)?;
        let cache = TileCache::new(cache_dir, source, throttle)?;
        Ok(Self { cache, config })
    }

    /// Create an extractor around an existing cache.
    pub fn with_cache(cache: TileCache<S>, config: ExtractConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { cache, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Get the tile cache.
    pub fn cache(&self) -> &TileCache<S> {
        &self.cache
    }

    /// Cut an `out_img_size` square centered on `point` from the mosaic of
    /// tiles within `surrounding` rings of the point's tile.
    ///
    /// Missing tiles are fetched first; a tile the server refuses fails the
    /// call with [`AerialError::TileUnavailable`]. If the crop does not fit
    /// in the mosaic the call fails with
    /// [`AerialError::InsufficientCoverage`], which a larger `surrounding`
    /// may fix.
    pub fn extract_view(&self, point: &GeoPoint, surrounding: u32) -> Result<RgbImage> {
        let zoom = self.config.zoom_level;
        let out_size = self.config.out_img_size;

        let center = locate_tile(point, zoom)?;
        let tiles = neighborhood(&center, surrounding);
        self.cache.download_tiles(&tiles)?;

        let mosaic = build_mosaic(&tiles, self.cache.cache_dir(), self.config.tile_size);
        let transform = derive_transform(&tiles, &mosaic)?;
        let (row, col) = transform.geo_to_pixel(point.lon, point.lat)?;

        let window = CropWindow::centered(row, col, out_size);
        debug!(
            "{} -> {} pixel ({}, {}) in {}x{} mosaic",
            point,
            center,
            row,
            col,
            mosaic.width(),
            mosaic.height()
        );
        if !window.fits(mosaic.width(), mosaic.height()) {
            return Err(AerialError::InsufficientCoverage {
                row_start: window.row_start,
                row_end: window.row_end,
                col_start: window.col_start,
                col_end: window.col_end,
                mosaic_width: mosaic.width(),
                mosaic_height: mosaic.height(),
            });
        }

        Ok(imageops::crop_imm(
            mosaic.raster(),
            window.col_start as u32,
            window.row_start as u32,
            out_size,
            out_size,
        )
        .to_image())
    }
}
