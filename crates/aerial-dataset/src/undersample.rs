//! City- and class-balanced undersampling.
//!
//! The target is the same number of buildings for every (city, class) pair:
//! the size of the rarest class divided by the number of cities. Pairs with
//! more buildings are cut down; pairs with fewer keep all of theirs and the
//! shortfall is backfilled per class from buildings of that class that were
//! cut elsewhere.

use crate::table::Table;
use crate::Result;
use csv::StringRecord;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Column holding the unique building identifier.
pub const ID_COLUMN: &str = "building_id";
/// Column holding the class label.
pub const CLASS_COLUMN: &str = "class";
/// Column holding the city name.
pub const CITY_COLUMN: &str = "city";

/// Summary of a balancing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    /// Rows left after removing duplicate building ids.
    pub unique_rows: usize,
    /// Distinct cities, sorted.
    pub cities: Vec<String>,
    /// Distinct classes, sorted.
    pub classes: Vec<String>,
    /// Target number of buildings per (city, class) pair.
    pub per_city: usize,
    /// Rows added per class to make up for short (city, class) pairs.
    pub backfilled: BTreeMap<String, usize>,
}

/// Keep the first row of every building id.
pub fn deduplicate(table: &Table) -> Result<Table> {
    let id_col = table.column_index(ID_COLUMN)?;
    let mut seen = HashSet::new();
    let mut out = table.empty_like();
    for row in table.rows() {
        if seen.insert(row[id_col].to_string()) {
            out.push(row.clone());
        }
    }
    Ok(out)
}

/// Balance `table` over cities and classes.
///
/// Shuffling is deterministic for a given `seed`.
pub fn undersample(table: &Table, seed: u64) -> Result<(Table, BalanceReport)> {
    let data = deduplicate(table)?;
    info!("Deduplication yielded {} buildings", data.len());

    let class_col = data.column_index(CLASS_COLUMN)?;
    let city_col = data.column_index(CITY_COLUMN)?;

    let mut groups: BTreeMap<(String, String), Vec<StringRecord>> = BTreeMap::new();
    let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut cities = BTreeSet::new();
    for row in data.rows() {
        let city = row[city_col].to_string();
        let class = row[class_col].to_string();
        *class_counts.entry(class.clone()).or_default() += 1;
        cities.insert(city.clone());
        groups.entry((city, class)).or_default().push(row.clone());
    }

    let cities: Vec<String> = cities.into_iter().collect();
    let classes: Vec<String> = class_counts.keys().cloned().collect();
    let per_city = match class_counts.iter().min_by_key(|(_, count)| **count) {
        Some((class, min_samples)) => {
            debug!("Class {} has least support with {} samples", class, min_samples);
            min_samples / cities.len()
        }
        None => 0,
    };
    info!(
        "Need {} samples per city and class ({} cities, {} classes)",
        per_city,
        cities.len(),
        classes.len()
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = data.empty_like();
    let mut excess: BTreeMap<&str, Vec<StringRecord>> = BTreeMap::new();
    let mut missing: BTreeMap<&str, usize> = BTreeMap::new();

    for city in &cities {
        for class in &classes {
            let mut subset = groups
                .remove(&(city.clone(), class.clone()))
                .unwrap_or_default();
            subset.shuffle(&mut rng);

            if subset.len() < per_city {
                *missing.entry(class).or_default() += per_city - subset.len();
            } else if subset.len() > per_city {
                excess
                    .entry(class)
                    .or_default()
                    .extend(subset.split_off(per_city));
            }
            for row in subset {
                out.push(row);
            }
        }
    }

    // Every class has at least per_city * cities rows, so its excess always
    // covers its shortfall.
    let mut backfilled = BTreeMap::new();
    for class in &classes {
        let wanted = missing.get(class.as_str()).copied().unwrap_or(0);
        if wanted == 0 {
            continue;
        }
        let mut pool = excess.remove(class.as_str()).unwrap_or_default();
        pool.shuffle(&mut rng);
        pool.truncate(wanted);
        if pool.len() < wanted {
            warn!("Class {} could only backfill {} of {} rows", class, pool.len(), wanted);
        }
        backfilled.insert(class.clone(), pool.len());
        for row in pool {
            out.push(row);
        }
    }

    info!("Balanced dataset has {} rows", out.len());
    let report = BalanceReport {
        unique_rows: data.len(),
        cities,
        classes,
        per_city,
        backfilled,
    };
    Ok((out, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_SEED;

    fn table(rows: &[(&str, &str, &str)]) -> Table {
        let headers = StringRecord::from(vec![ID_COLUMN, CLASS_COLUMN, CITY_COLUMN]);
        let rows = rows
            .iter()
            .map(|(id, class, city)| StringRecord::from(vec![*id, *class, *city]))
            .collect();
        Table::new(headers, rows)
    }

    fn count(table: &Table, class: &str, city: &str) -> usize {
        table
            .rows()
            .iter()
            .filter(|r| &r[1] == class && &r[2] == city)
            .count()
    }

    #[test]
    fn test_deduplicate_keeps_first() {
        let t = table(&[("1", "a", "x"), ("2", "b", "x"), ("1", "c", "y")]);
        let d = deduplicate(&t).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(&d.rows()[0][1], "a");
    }

    #[test]
    fn test_balanced_input_unchanged_in_size() {
        let t = table(&[
            ("1", "res", "berlin"),
            ("2", "com", "berlin"),
            ("3", "res", "munich"),
            ("4", "com", "munich"),
        ]);
        let (out, report) = undersample(&t, DEFAULT_SEED).unwrap();
        assert_eq!(report.per_city, 1);
        assert_eq!(out.len(), 4);
        assert_eq!(report.cities, vec!["berlin", "munich"]);
        assert_eq!(report.classes, vec!["com", "res"]);
    }

    #[test]
    fn test_undersample_cuts_and_backfills() {
        // com has 4 buildings (rarest) over 2 cities -> 2 per city and class.
        // munich has only 1 com, so one com row is backfilled from berlin.
        let t = table(&[
            ("1", "com", "berlin"),
            ("2", "com", "berlin"),
            ("3", "com", "berlin"),
            ("4", "com", "munich"),
            ("5", "res", "berlin"),
            ("6", "res", "berlin"),
            ("7", "res", "berlin"),
            ("8", "res", "munich"),
            ("9", "res", "munich"),
            ("10", "res", "munich"),
        ]);
        let (out, report) = undersample(&t, DEFAULT_SEED).unwrap();

        assert_eq!(report.per_city, 2);
        assert_eq!(report.backfilled.get("com"), Some(&1));
        assert_eq!(report.backfilled.get("res"), None);
        assert_eq!(count(&out, "res", "berlin"), 2);
        assert_eq!(count(&out, "res", "munich"), 2);
        assert_eq!(count(&out, "com", "munich"), 1);
        assert_eq!(count(&out, "com", "berlin"), 3);
        assert_eq!(out.len(), 8);

        let ids: HashSet<&str> = out.rows().iter().map(|r| &r[0]).collect();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_backfill_across_classes() {
        // com only in berlin, ind only in munich: per_city is 1 and each
        // class borrows its second row to cover the city it is absent from.
        let t = table(&[
            ("1", "com", "berlin"),
            ("2", "com", "berlin"),
            ("3", "ind", "munich"),
            ("4", "ind", "munich"),
        ]);
        let (out, report) = undersample(&t, DEFAULT_SEED).unwrap();
        assert_eq!(report.per_city, 1);
        assert_eq!(report.backfilled.get("com"), Some(&1));
        assert_eq!(report.backfilled.get("ind"), Some(&1));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_rare_class_with_many_cities() {
        // Rarest class has 1 building over 3 cities -> nothing is kept
        let t = table(&[
            ("1", "com", "berlin"),
            ("2", "ind", "munich"),
            ("3", "ind", "munich"),
            ("4", "res", "hamburg"),
            ("5", "res", "hamburg"),
            ("6", "res", "hamburg"),
        ]);
        let (out, report) = undersample(&t, DEFAULT_SEED).unwrap();
        assert_eq!(report.per_city, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_undersample_is_deterministic() {
        let rows: Vec<(String, &str, &str)> = (0..40)
            .map(|i| {
                (
                    i.to_string(),
                    if i % 3 == 0 { "com" } else { "res" },
                    if i % 2 == 0 { "berlin" } else { "munich" },
                )
            })
            .collect();
        let borrowed: Vec<(&str, &str, &str)> =
            rows.iter().map(|(a, b, c)| (a.as_str(), *b, *c)).collect();
        let t = table(&borrowed);

        let a = undersample(&t, 3).unwrap();
        let b = undersample(&t, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_city_column() {
        let headers = StringRecord::from(vec![ID_COLUMN, CLASS_COLUMN]);
        let t = Table::new(headers, vec![StringRecord::from(vec!["1", "a"])]);
        assert!(matches!(
            undersample(&t, DEFAULT_SEED),
            Err(crate::DatasetError::MissingColumn(_))
        ));
    }
}
