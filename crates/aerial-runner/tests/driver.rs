//! Driver runs against an in-memory tile server.

use aerial_dataset::{BuildingRecord, DatasetError};
use aerial_runner::{Driver, RecordOutcome, RunSummary};
use aerial_tiles::{locate_tile, ExtractConfig, FetchResponse, TileCoord, TileSource, ViewExtractor};
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

const MUNICH: &str =
    "POLYGON ((11.575 48.137, 11.576 48.137, 11.576 48.138, 11.575 48.138, 11.575 48.137))";

/// Serves a flat-colored PNG per tile, or 404 for tiles in `missing`.
#[derive(Default)]
struct FlatServer {
    missing: HashSet<TileCoord>,
}

impl TileSource for FlatServer {
    fn fetch(&self, tile: &TileCoord) -> aerial_tiles::Result<FetchResponse> {
        if self.missing.contains(tile) {
            return Ok(FetchResponse {
                status: 404,
                body: Vec::new(),
            });
        }
        let color = Rgb([(tile.x % 251) as u8, (tile.y % 251) as u8, 128]);
        let mut body = Vec::new();
        RgbImage::from_pixel(256, 256, color)
            .write_to(&mut Cursor::new(&mut body), ImageFormat::Png)
            .unwrap();
        Ok(FetchResponse { status: 200, body })
    }
}

fn config(out_img_size: u32) -> ExtractConfig {
    ExtractConfig {
        zoom_level: 18,
        out_img_size,
        mean_sleep: 0.0,
        std_sleep: 0.0,
        ..Default::default()
    }
}

fn driver(root: &Path, server: FlatServer, config: ExtractConfig) -> Driver<FlatServer> {
    let extractor = ViewExtractor::new(root.join("cache"), server, config).unwrap();
    Driver::new(extractor, root.join("out"))
}

fn building(id: &str, label: &str, geometry: &str) -> BuildingRecord {
    BuildingRecord {
        id: id.to_string(),
        label: label.to_string(),
        geometry: geometry.to_string(),
    }
}

fn requests<S: TileSource>(driver: &Driver<S>) -> usize {
    driver.extractor().cache().download_stats().requests_sent
}

#[test]
fn test_output_path_layout() {
    let dir = tempfile::tempdir().unwrap();
    let driver = driver(dir.path(), FlatServer::default(), config(256));
    assert_eq!(
        driver.output_path(&building("b1", "residential", MUNICH)),
        Some(dir.path().join("out/aerial-18/residential/b1.png"))
    );
}

#[test]
fn test_unsafe_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let driver = driver(dir.path(), FlatServer::default(), config(256));

    for (id, label) in [
        ("../escape", "residential"),
        ("b1", ".."),
        ("/etc/passwd", "residential"),
        ("b1", "/tmp"),
        ("a\\b", "residential"),
        ("", "residential"),
        ("b1", "."),
    ] {
        let record = building(id, label, MUNICH);
        assert_eq!(driver.output_path(&record), None, "id={id:?} label={label:?}");
        assert_eq!(driver.process_record(&record), RecordOutcome::Failed);
    }
    assert_eq!(requests(&driver), 0);
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_writes_image_and_rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let records = || -> Vec<aerial_dataset::Result<BuildingRecord>> {
        vec![
            Ok(building("b1", "residential", MUNICH)),
            Ok(building("b2", "commercial", MUNICH)),
        ]
    };

    let first = driver(dir.path(), FlatServer::default(), config(256));
    let summary = first.process_records(records());
    assert_eq!(summary.written, 2);
    // Second building reuses the cached tiles
    assert_eq!(requests(&first), 9);

    let path = first
        .output_path(&building("b1", "residential", MUNICH))
        .unwrap();
    let image = image::open(&path).unwrap();
    assert_eq!((image.width(), image.height()), (256, 256));
    assert!(!path.with_extension("png.part").exists());

    let second = driver(dir.path(), FlatServer::default(), config(256));
    let summary = second.process_records(records());
    assert_eq!(
        summary,
        RunSummary {
            already_present: 2,
            ..Default::default()
        }
    );
    assert_eq!(requests(&second), 0);
}

#[test]
fn test_existing_output_skips_network() {
    let dir = tempfile::tempdir().unwrap();
    let driver = driver(dir.path(), FlatServer::default(), config(256));
    let record = building("b1", "residential", MUNICH);

    let path = driver.output_path(&record).unwrap();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"placeholder").unwrap();

    assert_eq!(driver.process_record(&record), RecordOutcome::AlreadyPresent);
    assert_eq!(requests(&driver), 0);
    assert_eq!(std::fs::read(&path).unwrap(), b"placeholder");
}

#[test]
fn test_unavailable_tile_skips_record() {
    let dir = tempfile::tempdir().unwrap();
    let record = building("b1", "residential", MUNICH);
    let center = locate_tile(&record.centroid().unwrap(), 18).unwrap();

    let server = FlatServer {
        missing: HashSet::from([center]),
    };
    let driver = driver(dir.path(), server, config(256));

    assert_eq!(driver.process_record(&record), RecordOutcome::Unavailable);
    assert!(!driver.output_path(&record).unwrap().exists());
    // Download stops at the center tile (5th, NW first) and is not retried
    // with a wider neighborhood
    assert_eq!(requests(&driver), 5);
}

#[test]
fn test_large_crop_retries_with_wider_neighborhood() {
    let dir = tempfile::tempdir().unwrap();
    let driver = driver(dir.path(), FlatServer::default(), config(800));
    let record = building("b1", "residential", MUNICH);

    match driver.process_record(&record) {
        RecordOutcome::Written(path) => {
            let image = image::open(&path).unwrap();
            assert_eq!((image.width(), image.height()), (800, 800));
        }
        other => panic!("expected a written image, got {other:?}"),
    }
    // 3x3 first, then the 16 new tiles of the 5x5 ring
    assert_eq!(driver.extractor().cache().download_stats().tiles_downloaded, 25);
}

#[test]
fn test_no_retry_without_wider_neighborhood() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExtractConfig {
        max_surrounding: 1,
        ..config(800)
    };
    let driver = driver(dir.path(), FlatServer::default(), config);
    let record = building("b1", "residential", MUNICH);

    assert_eq!(driver.process_record(&record), RecordOutcome::InsufficientCoverage);
    assert_eq!(requests(&driver), 9);
    assert!(!driver.output_path(&record).unwrap().exists());
}

#[test]
fn test_failures_do_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let driver = driver(dir.path(), FlatServer::default(), config(256));

    let records = vec![
        Ok(building("bad", "residential", "POLYGON ((1 2")),
        Ok(building("pole", "residential", "POINT (0 90)")),
        Err(DatasetError::MalformedRow {
            line: 3,
            reason: "expected at least 3 columns, found 2".to_string(),
        }),
        Ok(building("b1", "residential", MUNICH)),
    ];
    let summary = driver.process_records(records);

    assert_eq!(summary.bad_geometry, 2);
    assert_eq!(summary.other_failures, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(summary.total(), 4);
    assert_eq!(requests(&driver), 9);
}
