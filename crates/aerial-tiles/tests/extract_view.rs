//! End-to-end tests for view extraction against an in-memory tile server.

use aerial_tiles::transform::union_bounds;
use aerial_tiles::{
    build_mosaic, derive_transform, locate_tile, neighborhood, AerialError, AffineTransform,
    ExtractConfig, FailureKind, FetchResponse, GeoPoint, TileCoord, TileSource, ViewExtractor,
};
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

const TILE_SIZE: u32 = 256;

/// Pixel value of `tile` at `(px, py)`; distinct per tile and position.
fn pattern(tile: &TileCoord, px: u32, py: u32) -> Rgb<u8> {
    Rgb([
        (tile.x as u32 * 31 + px) as u8,
        (tile.y as u32 * 17 + py) as u8,
        ((px / 16) * 16 + py / 16) as u8,
    ])
}

fn tile_raster(tile: &TileCoord) -> RgbImage {
    RgbImage::from_fn(TILE_SIZE, TILE_SIZE, |px, py| pattern(tile, px, py))
}

/// Generates patterned PNG tiles on demand and counts requests.
#[derive(Default)]
struct PatternServer {
    missing: HashSet<TileCoord>,
    requests: AtomicUsize,
}

impl TileSource for PatternServer {
    fn fetch(&self, tile: &TileCoord) -> aerial_tiles::Result<FetchResponse> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if self.missing.contains(tile) {
            return Ok(FetchResponse {
                status: 404,
                body: Vec::new(),
            });
        }
        let mut body = Vec::new();
        tile_raster(tile)
            .write_to(&mut Cursor::new(&mut body), ImageFormat::Png)
            .unwrap();
        Ok(FetchResponse { status: 200, body })
    }
}

fn test_config(zoom: u8, out_img_size: u32) -> ExtractConfig {
    ExtractConfig {
        zoom_level: zoom,
        out_img_size,
        tile_size: TILE_SIZE,
        mean_sleep: 0.0,
        std_sleep: 0.0,
        ..Default::default()
    }
}

/// Point that the 3x3 mosaic around `center` maps to pixel `(row, col)`.
fn point_at_pixel(center: &TileCoord, row: f64, col: f64) -> GeoPoint {
    let tiles = neighborhood(center, 1);
    let bounds = union_bounds(&tiles).unwrap();
    let transform = AffineTransform::from_bounds(&bounds, 3 * TILE_SIZE, 3 * TILE_SIZE);
    let (lon, lat) = transform.apply(col, row);
    GeoPoint::new(lon, lat)
}

#[test]
fn test_mosaic_center_pixel_yields_center_tile() {
    let center = TileCoord::new(100, 200, 18);
    // The mosaic transform is linear in latitude, so the tile's geographic
    // midpoint lands a row above pixel 384. Pick the point by pixel instead.
    let point = point_at_pixel(&center, 384.5, 384.5);
    assert_eq!(locate_tile(&point, 18).unwrap(), center);

    let dir = tempfile::tempdir().unwrap();
    let extractor =
        ViewExtractor::new(dir.path(), PatternServer::default(), test_config(18, 256)).unwrap();

    let view = extractor.extract_view(&point, 1).unwrap();
    assert_eq!(view.dimensions(), (256, 256));
    assert_eq!(view, tile_raster(&center));
    assert_eq!(extractor.cache().download_stats().tiles_downloaded, 9);
}

#[test]
fn test_crop_spanning_two_tiles() {
    let center = TileCoord::new(100, 200, 18);
    // 104 px above and 70 px right of the mosaic center, still in the center tile
    let point = point_at_pixel(&center, 280.5, 454.5);
    assert_eq!(locate_tile(&point, 18).unwrap(), center);

    let dir = tempfile::tempdir().unwrap();
    let extractor =
        ViewExtractor::new(dir.path(), PatternServer::default(), test_config(18, 64)).unwrap();
    let view = extractor.extract_view(&point, 1).unwrap();

    // Crop covers mosaic rows 248..312 and cols 422..486: the top rows come
    // from the northern neighbor, the rest from the center tile.
    let north = TileCoord::new(100, 199, 18);
    assert_eq!(*view.get_pixel(0, 0), pattern(&north, 166, 248));
    assert_eq!(*view.get_pixel(0, 7), pattern(&north, 166, 255));
    assert_eq!(*view.get_pixel(0, 8), pattern(&center, 166, 0));
    assert_eq!(*view.get_pixel(63, 63), pattern(&center, 229, 55));
}

#[test]
fn test_point_lands_in_center_block() {
    let points = [
        GeoPoint::new(11.5755, 48.1374),   // Munich
        GeoPoint::new(-122.3321, 47.6062), // Seattle
        GeoPoint::new(151.2093, -33.8688), // Sydney
        GeoPoint::new(-43.1729, -22.9068), // Rio de Janeiro
    ];

    let dir = tempfile::tempdir().unwrap();
    let server = PatternServer::default();
    let extractor = ViewExtractor::new(dir.path(), &server, test_config(17, 256)).unwrap();

    for point in &points {
        let center = locate_tile(point, 17).unwrap();
        let tiles = neighborhood(&center, 1);
        extractor.cache().download_tiles(&tiles).unwrap();

        let mosaic = build_mosaic(&tiles, dir.path(), TILE_SIZE);
        let transform = derive_transform(&tiles, &mosaic).unwrap();
        let (row, col) = transform.geo_to_pixel(point.lon, point.lat).unwrap();

        assert!((256..512).contains(&row), "row {row} for {point}");
        assert!((256..512).contains(&col), "col {col} for {point}");
    }
}

#[test]
fn test_second_extraction_uses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let server = PatternServer::default();
    let point = GeoPoint::new(11.5755, 48.1374);

    let first = ViewExtractor::new(dir.path(), &server, test_config(18, 128)).unwrap();
    let a = first.extract_view(&point, 1).unwrap();
    assert_eq!(server.requests.load(Ordering::Relaxed), 9);

    let second = ViewExtractor::new(dir.path(), &server, test_config(18, 128)).unwrap();
    let b = second.extract_view(&point, 1).unwrap();
    assert_eq!(server.requests.load(Ordering::Relaxed), 9);
    assert_eq!(a, b);
    assert_eq!(first.cache().download_stats().throttle_pauses, 9);
    assert_eq!(second.cache().download_stats().throttle_pauses, 0);
}

#[test]
fn test_oversized_crop_needs_larger_neighborhood() {
    let dir = tempfile::tempdir().unwrap();
    let extractor =
        ViewExtractor::new(dir.path(), PatternServer::default(), test_config(18, 800)).unwrap();
    let point = GeoPoint::new(11.5755, 48.1374);

    let err = extractor.extract_view(&point, 1).unwrap_err();
    assert_eq!(err.kind(), FailureKind::Coverage);
    assert!(matches!(
        err,
        AerialError::InsufficientCoverage {
            mosaic_width: 768,
            mosaic_height: 768,
            ..
        }
    ));

    let view = extractor.extract_view(&point, 2).unwrap();
    assert_eq!(view.dimensions(), (800, 800));
    assert_eq!(extractor.cache().download_stats().tiles_downloaded, 25);
}

#[test]
fn test_missing_tile_fails_extraction() {
    let point = GeoPoint::new(11.5755, 48.1374);
    let center = locate_tile(&point, 18).unwrap();
    let mut server = PatternServer::default();
    server.missing.insert(TileCoord::new(center.x + 1, center.y, 18));

    let dir = tempfile::tempdir().unwrap();
    let extractor = ViewExtractor::new(dir.path(), server, test_config(18, 256)).unwrap();

    let err = extractor.extract_view(&point, 1).unwrap_err();
    assert_eq!(err.kind(), FailureKind::Fetch);
    assert!(matches!(err, AerialError::TileUnavailable { status: 404, .. }));
}

#[test]
fn test_invalid_point_is_degenerate() {
    let dir = tempfile::tempdir().unwrap();
    let extractor =
        ViewExtractor::new(dir.path(), PatternServer::default(), test_config(18, 256)).unwrap();
    let err = extractor
        .extract_view(&GeoPoint::new(f64::NAN, 10.0), 1)
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Geometry);
    assert_eq!(extractor.cache().download_stats().requests_sent, 0);
}
