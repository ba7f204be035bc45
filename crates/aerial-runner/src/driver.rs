//! Per-record extraction driver.
//!
//! Walks the building records one at a time, extracts the view around each
//! centroid and writes it to `{output_dir}/aerial-{zoom}/{label}/{id}.png`.
//! Records whose output already exists are skipped before any tile work, so
//! an interrupted run can be restarted from scratch.

use aerial_dataset::BuildingRecord;
use aerial_tiles::{AerialError, FailureKind, GeoPoint, TileSource, ViewExtractor};
use image::{ImageFormat, RgbImage};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new image was written to this path.
    Written(PathBuf),
    /// The output image already existed.
    AlreadyPresent,
    /// A tile in the neighborhood could not be fetched.
    Unavailable,
    /// The crop did not fit even with the largest neighborhood.
    InsufficientCoverage,
    /// The footprint or its centroid could not be projected.
    BadGeometry,
    /// Any other failure (I/O, decoding, malformed row).
    Failed,
}

/// Counts of record outcomes for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub written: usize,
    pub already_present: usize,
    pub unavailable: usize,
    pub insufficient_coverage: usize,
    pub bad_geometry: usize,
    pub other_failures: usize,
}

impl RunSummary {
    /// Count one outcome.
    pub fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Written(_) => self.written += 1,
            RecordOutcome::AlreadyPresent => self.already_present += 1,
            RecordOutcome::Unavailable => self.unavailable += 1,
            RecordOutcome::InsufficientCoverage => self.insufficient_coverage += 1,
            RecordOutcome::BadGeometry => self.bad_geometry += 1,
            RecordOutcome::Failed => self.other_failures += 1,
        }
    }

    /// Number of records seen.
    pub fn total(&self) -> usize {
        self.written
            + self.already_present
            + self.unavailable
            + self.insufficient_coverage
            + self.bad_geometry
            + self.other_failures
    }

    /// Number of records skipped because of a failure.
    pub fn skipped(&self) -> usize {
        self.unavailable + self.insufficient_coverage + self.bad_geometry + self.other_failures
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records: {} written, {} already present, {} skipped \
             ({} unavailable, {} insufficient coverage, {} bad geometry, {} other)",
            self.total(),
            self.written,
            self.already_present,
            self.skipped(),
            self.unavailable,
            self.insufficient_coverage,
            self.bad_geometry,
            self.other_failures
        )
    }
}

/// Runs the view extractor over building records.
#[derive(Debug)]
pub struct Driver<S> {
    extractor: ViewExtractor<S>,
    output_dir: PathBuf,
}

impl<S: TileSource> Driver<S> {
    /// Create a driver writing images below `output_dir`.
    pub fn new<P: AsRef<Path>>(extractor: ViewExtractor<S>, output_dir: P) -> Self {
        Self {
            extractor,
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the extractor.
    pub fn extractor(&self) -> &ViewExtractor<S> {
        &self.extractor
    }

    /// Get the output root directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where the image for `record` goes.
    ///
    /// `None` if the id or label is not a plain file name.
    pub fn output_path(&self, record: &BuildingRecord) -> Option<PathBuf> {
        if !is_plain_name(&record.label) || !is_plain_name(&record.id) {
            return None;
        }
        Some(
            self.output_dir
                .join(format!("aerial-{}", self.extractor.config().zoom_level))
                .join(&record.label)
                .join(format!("{}.png", record.id)),
        )
    }

    /// Extract the view around `point`, widening the neighborhood once if
    /// the first mosaic is too small for the crop.
    pub fn extract_with_retry(&self, point: &GeoPoint) -> aerial_tiles::Result<RgbImage> {
        let config = self.extractor.config();
        let err = match self.extractor.extract_view(point, config.surrounding) {
            Ok(view) => return Ok(view),
            Err(err) => err,
        };

        match err.kind() {
            FailureKind::Coverage if config.max_surrounding > config.surrounding => {
                debug!(
                    "Retrying {} with surrounding={}: {}",
                    point, config.max_surrounding, err
                );
                self.extractor.extract_view(point, config.max_surrounding)
            }
            FailureKind::Coverage
            | FailureKind::Fetch
            | FailureKind::Geometry
            | FailureKind::Other => Err(err),
        }
    }

    /// Process one record.
    ///
    /// Never fails: every problem is logged with the record id and turned
    /// into an outcome.
    pub fn process_record(&self, record: &BuildingRecord) -> RecordOutcome {
        let Some(path) = self.output_path(record) else {
            warn!(
                "Skipping building {:?}: id or label {:?} is not a plain file name",
                record.id, record.label
            );
            return RecordOutcome::Failed;
        };
        if path.exists() {
            debug!("Output for building {} exists, skipping", record.id);
            return RecordOutcome::AlreadyPresent;
        }

        let point = match record.centroid() {
            Ok(point) => point,
            Err(e) => {
                warn!("Skipping building {}: {}", record.id, e);
                return RecordOutcome::BadGeometry;
            }
        };

        let view = match self.extract_with_retry(&point) {
            Ok(view) => view,
            Err(e) => {
                warn!("Skipping building {}: {}", record.id, e);
                return match e.kind() {
                    FailureKind::Fetch => RecordOutcome::Unavailable,
                    FailureKind::Coverage => RecordOutcome::InsufficientCoverage,
                    FailureKind::Geometry => RecordOutcome::BadGeometry,
                    FailureKind::Other => RecordOutcome::Failed,
                };
            }
        };

        match write_view(&view, &path) {
            Ok(()) => {
                debug!("Wrote {}", path.display());
                RecordOutcome::Written(path)
            }
            Err(e) => {
                warn!("Skipping building {}: {}", record.id, e);
                RecordOutcome::Failed
            }
        }
    }

    /// Process every record in turn and summarize the run.
    ///
    /// Rows that could not be parsed count as other failures.
    pub fn process_records<I>(&self, records: I) -> RunSummary
    where
        I: IntoIterator<Item = aerial_dataset::Result<BuildingRecord>>,
    {
        let mut summary = RunSummary::default();
        for record in records {
            let outcome = match record {
                Ok(record) => self.process_record(&record),
                Err(e) => {
                    warn!("Skipping row: {}", e);
                    RecordOutcome::Failed
                }
            };
            summary.record(&outcome);

            let seen = summary.total();
            if seen % 1000 == 0 {
                info!("Processed {} records ({} written)", seen, summary.written);
            }
        }

        let stats = self.extractor.cache().download_stats();
        info!(
            "Downloaded {} tiles ({} bytes) in {} requests",
            stats.tiles_downloaded, stats.bytes_downloaded, stats.requests_sent
        );
        summary
    }
}

/// Whether `name` is a single normal path component.
fn is_plain_name(name: &str) -> bool {
    if name.contains(|c: char| c == '/' || c == '\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Write `view` as PNG, creating parent directories.
///
/// The image goes to a temporary file first so an interrupted write never
/// leaves a truncated image that would be taken as done.
fn write_view(view: &RgbImage, path: &Path) -> Result<(), AerialError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let part = path.with_extension("png.part");
    view.save_with_format(&part, ImageFormat::Png)?;
    fs::rename(&part, path)?;
    Ok(())
}
