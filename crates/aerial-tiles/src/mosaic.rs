//! Stitching of cached tiles into one raster.

use crate::tile::TileCoord;
use image::{imageops, RgbImage};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;

/// A rectangular composite of same-zoom tiles.
///
/// Tiles that could not be read are left black; their coordinates are kept
/// in [`Mosaic::missing_tiles`].
#[derive(Debug, Clone)]
pub struct Mosaic {
    raster: RgbImage,
    tile_size: u32,
    x_offset: i64,
    y_offset: i64,
    missing: Vec<TileCoord>,
}

impl Mosaic {
    /// The assembled RGB raster.
    pub fn raster(&self) -> &RgbImage {
        &self.raster
    }

    /// Consume the mosaic and return its raster.
    pub fn into_raster(self) -> RgbImage {
        self.raster
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    /// Raster size of one tile block.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Tile coordinate of the top-left block.
    pub fn origin(&self) -> (i64, i64) {
        (self.x_offset, self.y_offset)
    }

    /// Tiles whose block was left blank.
    pub fn missing_tiles(&self) -> &[TileCoord] {
        &self.missing
    }

    /// Pixel offset `(col, row)` of `tile`'s block in the raster.
    pub fn block_origin(&self, tile: &TileCoord) -> (i64, i64) {
        (
            (tile.x - self.x_offset) * self.tile_size as i64,
            (tile.y - self.y_offset) * self.tile_size as i64,
        )
    }
}

/// Assemble the cached rasters of `tiles` into one canvas.
///
/// The canvas has one `tile_size` block per distinct x (columns) and y
/// (rows); each tile is placed at `(x - min x, y - min y)`. Tiles must
/// already be cached under `cache_dir` and share the zoom level. A tile file
/// that is missing, unreadable or not `tile_size` square is skipped with a
/// warning, leaving its block black.
pub fn build_mosaic(tiles: &[TileCoord], cache_dir: &Path, tile_size: u32) -> Mosaic {
    let xs: BTreeSet<i64> = tiles.iter().map(|t| t.x).collect();
    let ys: BTreeSet<i64> = tiles.iter().map(|t| t.y).collect();
    let x_offset = xs.first().copied().unwrap_or(0);
    let y_offset = ys.first().copied().unwrap_or(0);

    let mut mosaic = Mosaic {
        raster: RgbImage::new(xs.len() as u32 * tile_size, ys.len() as u32 * tile_size),
        tile_size,
        x_offset,
        y_offset,
        missing: Vec::new(),
    };

    for tile in tiles {
        let path = tile.cache_path(cache_dir);
        let img = match image::open(&path) {
            Ok(img) => img.into_rgb8(),
            Err(e) => {
                warn!("Tile {} not available: {}", path.display(), e);
                mosaic.missing.push(*tile);
                continue;
            }
        };
        if img.width() != tile_size || img.height() != tile_size {
            warn!(
                "Tile {} is {}x{}, expected {}x{}",
                path.display(),
                img.width(),
                img.height(),
                tile_size,
                tile_size
            );
            mosaic.missing.push(*tile);
            continue;
        }

        let (col, row) = mosaic.block_origin(tile);
        imageops::replace(&mut mosaic.raster, &img, col, row);
    }

    mosaic
}
