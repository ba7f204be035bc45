//! # aerial-dataset
//!
//! Building tables for aerial patch extraction.
//!
//! Input tables are CSV files, optionally bzip2-compressed (`.csv.bz2`), with
//! one building per row. This crate reads them as [`BuildingRecord`]s for the
//! extraction driver, and provides the two preprocessing steps run before it:
//!
//! - [`split`]: seeded random train/test split
//! - [`undersample`]: balancing over cities and classes
//!
//! ## Example
//!
//! ```no_run
//! use aerial_dataset::read_building_records;
//!
//! for record in read_building_records("part1/buildings.csv.bz2")? {
//!     let record = record?;
//!     let center = record.centroid()?;
//!     println!("{} ({}) at {}", record.id, record.label, center);
//! }
//! # Ok::<(), aerial_dataset::DatasetError>(())
//! ```

mod error;
pub mod record;
pub mod split;
pub mod table;
pub mod undersample;

pub use error::DatasetError;
pub use record::{read_building_records, BuildingRecord};
pub use split::{output_prefix, split_file, split_train_test, DEFAULT_SPLIT_RATIO};
pub use table::{open_input, read_table, write_table, Table};
pub use undersample::{deduplicate, undersample, BalanceReport};

/// Seed used for shuffling when none is given.
pub const DEFAULT_SEED: u64 = 42;

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
