//! Slippy-map tile addressing.
//!
//! Uses the OpenStreetMap Slippy Map tile naming convention:
//! - `z` is the zoom level
//! - `x` is the column (0 to 2^z - 1, from west to east)
//! - `y` is the row (0 to 2^z - 1, from north to south)
//!
//! Tiles built by [`neighborhood`] are not clamped to the pyramid, so `x` and
//! `y` are signed and may fall outside `0..2^z` near the antimeridian or the
//! poles.

use crate::{AerialError, Result, MAX_ZOOM, MIN_ZOOM};
use std::f64::consts::PI;
use std::fmt;
use std::path::{Path, PathBuf};

/// Offset that keeps points lying exactly on a tile edge in the tile to the
/// east/south, matching the usual slippy-map libraries.
const EDGE_EPSILON: f64 = 1e-14;

/// A WGS84 location in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Longitude in degrees (-180 to 180).
    pub lon: f64,
    /// Latitude in degrees (-90 to 90, exclusive).
    pub lat: f64,
}

impl GeoPoint {
    /// Create a point from longitude and latitude.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lon, self.lat)
    }
}

/// Slippy-map tile coordinates (x, y, z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// X coordinate (column, 0 at 180°W, increases eastward).
    pub x: i64,
    /// Y coordinate (row, 0 at ~85.05°N, increases southward).
    pub y: i64,
    /// Zoom level.
    pub z: u8,
}

impl TileCoord {
    /// Create a tile coordinate. No range check is performed.
    pub fn new(x: i64, y: i64, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Whether `x` and `y` lie inside the pyramid at this zoom level.
    pub fn is_valid(&self) -> bool {
        let n = tiles_per_axis(self.z);
        (0..n).contains(&self.x) && (0..n).contains(&self.y)
    }

    /// Cache file name for this tile, `{x}-{y}-{z}.png`.
    pub fn file_name(&self) -> String {
        format!("{}-{}-{}.png", self.x, self.y, self.z)
    }

    /// Get the cache file path for this tile.
    pub fn cache_path(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(self.file_name())
    }

    /// Get the bounding box for this tile.
    pub fn bounds(&self) -> TileBounds {
        tile_bounds(self)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tile(x={}, y={}, z={})", self.x, self.y, self.z)
    }
}

/// Geographic extent of a tile in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    /// Western edge (minimum longitude).
    pub west: f64,
    /// Southern edge (minimum latitude).
    pub south: f64,
    /// Eastern edge (maximum longitude).
    pub east: f64,
    /// Northern edge (maximum latitude).
    pub north: f64,
}

impl TileBounds {
    /// Check if a coordinate is within the bounds.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lon >= self.west
            && point.lon <= self.east
            && point.lat >= self.south
            && point.lat <= self.north
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &TileBounds) -> TileBounds {
        TileBounds {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    /// Box width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Box height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }
}

/// Number of tiles along one axis at zoom `z`.
pub fn tiles_per_axis(z: u8) -> i64 {
    1i64 << z
}

/// Find the tile containing `point` at zoom level `zoom`.
///
/// Latitudes beyond the Web Mercator limit (±85.0511°) land in the first or
/// last row. Fails for non-finite coordinates, latitudes at or beyond the
/// poles and longitudes outside ±180°.
pub fn locate_tile(point: &GeoPoint, zoom: u8) -> Result<TileCoord> {
    if !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
        return Err(AerialError::InvalidZoomLevel(zoom));
    }
    if !point.lon.is_finite() || !point.lat.is_finite() {
        return Err(AerialError::DegenerateGeometry(format!(
            "non-finite coordinate {point}"
        )));
    }
    if point.lat <= -90.0 || point.lat >= 90.0 {
        return Err(AerialError::DegenerateGeometry(format!(
            "latitude {} has no Mercator projection",
            point.lat
        )));
    }
    if point.lon < -180.0 || point.lon > 180.0 {
        return Err(AerialError::DegenerateGeometry(format!(
            "longitude {} outside [-180, 180]",
            point.lon
        )));
    }

    // Normalized Mercator position, (0, 0) at the north-west corner
    let fx = point.lon / 360.0 + 0.5;
    let sin_lat = point.lat.to_radians().sin();
    let fy = 0.5 - 0.25 * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / PI;

    let n = tiles_per_axis(zoom);
    let to_index = |f: f64| -> i64 {
        if f <= 0.0 {
            0
        } else if f >= 1.0 {
            n - 1
        } else {
            ((f * n as f64 + EDGE_EPSILON).floor() as i64).min(n - 1)
        }
    };

    Ok(TileCoord::new(to_index(fx), to_index(fy), zoom))
}

/// Geographic bounds of `tile`, from the inverse projection of its corners.
pub fn tile_bounds(tile: &TileCoord) -> TileBounds {
    let n = tiles_per_axis(tile.z) as f64;
    let lon = |x: i64| x as f64 / n * 360.0 - 180.0;
    let lat = |y: i64| (PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan().to_degrees();

    TileBounds {
        west: lon(tile.x),
        south: lat(tile.y + 1),
        east: lon(tile.x + 1),
        north: lat(tile.y),
    }
}

/// All tiles within `radius` rings of `center`, row by row from the
/// north-west corner.
///
/// Returns `(2 * radius + 1)^2` tiles at the center's zoom. Coordinates are
/// not clamped to the pyramid.
pub fn neighborhood(center: &TileCoord, radius: u32) -> Vec<TileCoord> {
    let r = radius as i64;
    let mut tiles = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
    for dy in -r..=r {
        for dx in -r..=r {
            tiles.push(TileCoord::new(center.x + dx, center.y + dy, center.z));
        }
    }
    tiles
}
