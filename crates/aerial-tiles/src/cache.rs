//! Disk-backed tile cache.
//!
//! Every tile lives in one PNG file named `{x}-{y}-{z}.png` under the cache
//! directory. The presence of that file is the only cache-hit signal: a file
//! that exists is never fetched again and its content is never re-validated.
//! The cache is append-only; tiles are never invalidated or overwritten.
//!
//! Each network fetch is followed by a randomized pause so that long runs do
//! not hammer the tile server. Cache hits do not pause.

use crate::source::TileSource;
use crate::tile::TileCoord;
use crate::{AerialError, Result};
use image::ImageFormat;
use rand_distr::{Distribution, Normal};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Randomized politeness delay between tile downloads.
///
/// Delays are drawn from a Gaussian distribution and folded onto the
/// non-negative axis by taking the absolute value.
#[derive(Debug, Clone)]
pub struct Throttle {
    delay: Option<Normal<f64>>,
}

impl Throttle {
    /// Delay with the given mean and standard deviation in seconds.
    ///
    /// Both values must be finite and the deviation non-negative.
    pub fn new(mean_secs: f64, std_secs: f64) -> Result<Self> {
        if !mean_secs.is_finite() || !std_secs.is_finite() || std_secs < 0.0 {
            return Err(AerialError::InvalidConfig(format!(
                "bad sleep distribution mean={mean_secs} std={std_secs}"
            )));
        }
        let delay = Normal::new(mean_secs, std_secs).map_err(|e| {
            AerialError::InvalidConfig(format!(
                "bad sleep distribution mean={mean_secs} std={std_secs}: {e}"
            ))
        })?;
        Ok(Self { delay: Some(delay) })
    }

    /// No delay at all.
    pub fn disabled() -> Self {
        Self { delay: None }
    }

    /// Draw the next delay.
    pub fn next_delay(&self) -> Duration {
        match &self.delay {
            Some(normal) => {
                let secs = normal.sample(&mut rand::thread_rng()).abs();
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
            }
            None => Duration::ZERO,
        }
    }

    /// Block the current thread for one drawn delay.
    pub fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Download statistics for the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Number of requests sent to the tile source, successful or not.
    pub requests_sent: usize,
    /// Number of tiles downloaded and written to the cache.
    pub tiles_downloaded: usize,
    /// Total bytes received for downloaded tiles.
    pub bytes_downloaded: u64,
    /// Number of throttle pauses taken, one per downloaded tile.
    pub throttle_pauses: usize,
}

/// Tile cache on persistent storage in front of a [`TileSource`].
pub struct TileCache<S> {
    /// Cache directory for downloaded tiles.
    cache_dir: PathBuf,
    /// Where missing tiles come from.
    source: S,
    /// Pause after every network fetch.
    throttle: Throttle,
    requests_sent: AtomicUsize,
    tiles_downloaded: AtomicUsize,
    bytes_downloaded: AtomicU64,
    throttle_pauses: AtomicUsize,
}

impl<S> std::fmt::Debug for TileCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("cache_dir", &self.cache_dir)
            .field("throttle", &self.throttle)
            .finish()
    }
}

impl<S: TileSource> TileCache<S> {
    /// Create a cache rooted at `cache_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(cache_dir: P, source: S, throttle: Throttle) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir)?;

        Ok(Self {
            cache_dir,
            source,
            throttle,
            requests_sent: AtomicUsize::new(0),
            tiles_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
            throttle_pauses: AtomicUsize::new(0),
        })
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the underlying tile source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Cache file path of `tile`. Does not check whether it exists.
    pub fn tile_path(&self, tile: &TileCoord) -> PathBuf {
        tile.cache_path(&self.cache_dir)
    }

    /// Check if a tile is cached locally.
    pub fn is_cached(&self, tile: &TileCoord) -> bool {
        self.tile_path(tile).is_file()
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            tiles_downloaded: self.tiles_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            throttle_pauses: self.throttle_pauses.load(Ordering::Relaxed),
        }
    }

    /// Make sure `tile` is on disk and return its path.
    ///
    /// A cached tile is returned as is. Otherwise one request goes to the
    /// source: a 200 answer is decoded, stored as PNG and followed by a
    /// throttle pause; any other status fails with
    /// [`AerialError::TileUnavailable`] and nothing is written.
    pub fn ensure_cached(&self, tile: &TileCoord) -> Result<PathBuf> {
        let path = self.tile_path(tile);
        if path.is_file() {
            debug!("Cache hit for {}", tile);
            return Ok(path);
        }

        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        let response = self.source.fetch(tile)?;
        if !response.is_ok() {
            return Err(AerialError::TileUnavailable {
                tile: *tile,
                status: response.status,
            });
        }

        let raster = image::load_from_memory(&response.body)?;

        // Write under a temporary name so an interrupted run never leaves a
        // truncated file that would count as a cache hit.
        let partial = path.with_extension("png.part");
        raster.save_with_format(&partial, ImageFormat::Png)?;
        fs::rename(&partial, &path)?;

        self.tiles_downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded
            .fetch_add(response.body.len() as u64, Ordering::Relaxed);
        debug!("Fetched {} ({} bytes)", tile, response.body.len());

        self.throttle.pause();
        self.throttle_pauses.fetch_add(1, Ordering::Relaxed);
        Ok(path)
    }

    /// Ensure every tile in `tiles` is cached, in order.
    ///
    /// The first failure aborts the batch; tiles fetched before it stay
    /// cached.
    pub fn download_tiles(&self, tiles: &[TileCoord]) -> Result<Vec<PathBuf>> {
        tiles.iter().map(|tile| self.ensure_cached(tile)).collect()
    }
}
