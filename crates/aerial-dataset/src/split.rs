//! Random train/test splitting.

use crate::table::{read_table, write_table, Table};
use crate::{DatasetError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default share of rows that go into the training set.
pub const DEFAULT_SPLIT_RATIO: f64 = 0.8;

/// Shuffle `table` deterministically and cut it into a training part of
/// `floor(len * ratio)` rows and a test part with the rest.
pub fn split_train_test(table: &Table, ratio: f64, seed: u64) -> Result<(Table, Table)> {
    if !(0.0..=1.0).contains(&ratio) {
        return Err(DatasetError::InvalidRatio(ratio));
    }

    let mut rows = table.rows().to_vec();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rows.shuffle(&mut rng);

    let cut = (rows.len() as f64 * ratio).floor() as usize;
    let test_rows = rows.split_off(cut);

    Ok((
        Table::new(table.headers().clone(), rows),
        Table::new(table.headers().clone(), test_rows),
    ))
}

/// File name of `path` up to its first dot, e.g. `buildings` for
/// `data/buildings.csv.bz2`.
pub fn output_prefix(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or_default()
        .to_string()
}

/// Split the table at `input` and write `{prefix}_train.csv.bz2` and
/// `{prefix}_test.csv.bz2` into `out_dir`.
pub fn split_file(input: &Path, ratio: f64, seed: u64, out_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let table = read_table(input)?;
    let (train, test) = split_train_test(&table, ratio, seed)?;

    let prefix = output_prefix(input);
    let train_path = out_dir.join(format!("{prefix}_train.csv.bz2"));
    let test_path = out_dir.join(format!("{prefix}_test.csv.bz2"));
    write_table(&train_path, &train)?;
    write_table(&test_path, &test)?;

    info!(
        "Split {} rows into {} training and {} test rows",
        table.len(),
        train.len(),
        test.len()
    );
    Ok((train_path, test_path))
}
