//! Remote tile sources.

use crate::config::TileServerConfig;
use crate::tile::TileCoord;
use crate::Result;
use std::time::Duration;

/// Raw answer of a tile source for one tile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Whether the server delivered the tile (HTTP 200).
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Something that can be asked for the raster of a tile.
///
/// One call is one network round-trip; interpreting the status is left to
/// the caller.
pub trait TileSource {
    /// Request a single tile.
    fn fetch(&self, tile: &TileCoord) -> Result<FetchResponse>;
}

impl<S: TileSource + ?Sized> TileSource for &S {
    fn fetch(&self, tile: &TileCoord) -> Result<FetchResponse> {
        (**self).fetch(tile)
    }
}

/// Tile source backed by a blocking HTTP client.
///
/// Tiles are requested as `GET {base_url}?lyrs={layer}&x={x}&y={y}&z={z}`.
pub struct HttpTileSource {
    config: TileServerConfig,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for HttpTileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTileSource")
            .field("base_url", &self.config.base_url)
            .field("layer", &self.config.layer)
            .finish()
    }
}

impl HttpTileSource {
    /// Create a source with the given server settings.
    pub fn new(config: TileServerConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    /// URL requested for `tile`.
    pub fn tile_url(&self, tile: &TileCoord) -> String {
        format!(
            "{}?lyrs={}&x={}&y={}&z={}",
            self.config.base_url, self.config.layer, tile.x, tile.y, tile.z
        )
    }
}

impl TileSource for HttpTileSource {
    fn fetch(&self, tile: &TileCoord) -> Result<FetchResponse> {
        let response = self.client.get(self.tile_url(tile)).send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(FetchResponse { status, body })
    }
}
