//! Pixel to geographic coordinate transforms for mosaics.

use crate::mosaic::Mosaic;
use crate::tile::{TileBounds, TileCoord};
use crate::{AerialError, Result};

/// Affine map from pixel `(col, row)` to geographic `(lon, lat)`:
///
/// ```text
/// lon = a * col + b * row + c
/// lat = d * col + e * row + f
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    /// Map a `width` x `height` raster linearly onto `bounds`, north up.
    pub fn from_bounds(bounds: &TileBounds, width: u32, height: u32) -> Self {
        Self {
            a: bounds.width() / width as f64,
            b: 0.0,
            c: bounds.west,
            d: 0.0,
            e: -bounds.height() / height as f64,
            f: bounds.north,
        }
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// Geographic position of pixel coordinates `(col, row)`.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Inverse transform, mapping `(lon, lat)` back to `(col, row)`.
    pub fn inverse(&self) -> Result<AffineTransform> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(AerialError::DegenerateGeometry(format!(
                "transform {self:?} is not invertible"
            )));
        }
        let ia = self.e / det;
        let ib = -self.b / det;
        let id = -self.d / det;
        let ie = self.a / det;
        Ok(AffineTransform {
            a: ia,
            b: ib,
            c: -self.c * ia - self.f * ib,
            d: id,
            e: ie,
            f: -self.c * id - self.f * ie,
        })
    }

    /// Integer pixel `(row, col)` containing `(lon, lat)`, rounding down.
    ///
    /// The result may lie outside the raster.
    pub fn geo_to_pixel(&self, lon: f64, lat: f64) -> Result<(i64, i64)> {
        let (col, row) = self.inverse()?.apply(lon, lat);
        if !col.is_finite() || !row.is_finite() {
            return Err(AerialError::DegenerateGeometry(format!(
                "({lon}, {lat}) has no pixel position"
            )));
        }
        Ok((row.floor() as i64, col.floor() as i64))
    }
}

/// Union of the bounds of all `tiles`, or `None` for an empty slice.
pub fn union_bounds(tiles: &[TileCoord]) -> Option<TileBounds> {
    tiles
        .iter()
        .map(TileCoord::bounds)
        .reduce(|acc, b| acc.union(&b))
}

/// Transform mapping `mosaic`'s pixels onto the combined extent of `tiles`.
pub fn derive_transform(tiles: &[TileCoord], mosaic: &Mosaic) -> Result<AffineTransform> {
    let bounds = union_bounds(tiles)
        .ok_or_else(|| AerialError::DegenerateGeometry("no tiles to georeference".to_string()))?;
    if mosaic.width() == 0 || mosaic.height() == 0 {
        return Err(AerialError::DegenerateGeometry(
            "mosaic has zero area".to_string(),
        ));
    }
    Ok(AffineTransform::from_bounds(
        &bounds,
        mosaic.width(),
        mosaic.height(),
    ))
}
