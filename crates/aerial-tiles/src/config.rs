//! Extraction and tile server configuration.

use crate::{AerialError, Result, MAX_ZOOM, MIN_ZOOM};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default zoom level; 18 works well for building-scale imagery.
pub const DEFAULT_ZOOM: u8 = 18;

/// Default side length of the extracted images in pixels.
pub const DEFAULT_OUT_IMG_SIZE: u32 = 256;

/// Default raster size of one tile from the tile server.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default tile server endpoint.
pub const DEFAULT_BASE_URL: &str = "https://mt1.google.com/vt";

/// Default layer type (satellite).
pub const DEFAULT_LAYER: &str = "s";

/// Parameters for extracting a view around a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Pyramid depth to fetch tiles at.
    pub zoom_level: u8,
    /// Side length of the output crop in pixels.
    pub out_img_size: u32,
    /// Raster size of a single tile (256, or 512 for HD tiles).
    pub tile_size: u32,
    /// Initial neighborhood radius in tile rings.
    pub surrounding: u32,
    /// Radius used for the single retry after insufficient coverage.
    pub max_surrounding: u32,
    /// Mean of the delay after each network fetch, in seconds.
    pub mean_sleep: f64,
    /// Standard deviation of the delay after each network fetch, in seconds.
    pub std_sleep: f64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            zoom_level: DEFAULT_ZOOM,
            out_img_size: DEFAULT_OUT_IMG_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
            surrounding: 1,
            max_surrounding: 2,
            mean_sleep: 1.0,
            std_sleep: 0.5,
        }
    }
}

impl ExtractConfig {
    /// Check all values are in range.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&self.zoom_level) {
            return Err(AerialError::InvalidZoomLevel(self.zoom_level));
        }
        if self.out_img_size == 0 {
            return Err(AerialError::InvalidConfig(
                "out_img_size must be positive".to_string(),
            ));
        }
        if self.tile_size == 0 {
            return Err(AerialError::InvalidConfig(
                "tile_size must be positive".to_string(),
            ));
        }
        if self.max_surrounding < self.surrounding {
            return Err(AerialError::InvalidConfig(format!(
                "max_surrounding {} is smaller than surrounding {}",
                self.max_surrounding, self.surrounding
            )));
        }
        if !self.mean_sleep.is_finite() || !self.std_sleep.is_finite() || self.std_sleep < 0.0 {
            return Err(AerialError::InvalidConfig(format!(
                "invalid sleep parameters mean={} std={}",
                self.mean_sleep, self.std_sleep
            )));
        }
        Ok(())
    }
}

/// Remote tile server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileServerConfig {
    /// Base endpoint; tile coordinates are passed as query parameters.
    pub base_url: String,
    /// Value of the `lyrs` query parameter.
    pub layer: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for TileServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            layer: DEFAULT_LAYER.to_string(),
            timeout_secs: 60,
            user_agent: concat!("aerial-tiles/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Combined configuration file contents.
///
/// ```yaml
/// extract:
///   zoom_level: 18
///   out_img_size: 256
/// server:
///   base_url: https://mt1.google.com/vt
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AerialConfig {
    /// Extraction parameters.
    pub extract: ExtractConfig,
    /// Tile server parameters.
    pub server: TileServerConfig,
}

impl AerialConfig {
    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: AerialConfig = serde_yaml::from_str(yaml)?;
        config.extract.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}
