//! Building records from the input table.

use crate::table::open_input;
use crate::{DatasetError, Result};
use aerial_tiles::GeoPoint;
use csv::StringRecord;
use geo::{Centroid, Geometry};
use std::path::Path;
use wkt::TryFromWkt;

/// One building: identifier, class label and footprint as WKT.
///
/// Column layout follows the So2Sat building tables: id first, label second,
/// geometry last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingRecord {
    pub id: String,
    pub label: String,
    pub geometry: String,
}

impl BuildingRecord {
    /// Build a record from a CSV row with at least three fields.
    pub fn from_row(row: &StringRecord) -> Result<Self> {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        if row.len() < 3 {
            return Err(DatasetError::MalformedRow {
                line,
                reason: format!("expected at least 3 columns, found {}", row.len()),
            });
        }
        Ok(Self {
            id: row[0].to_string(),
            label: row[1].to_string(),
            geometry: row[row.len() - 1].to_string(),
        })
    }

    /// Centroid of the footprint.
    pub fn centroid(&self) -> Result<GeoPoint> {
        let geometry = Geometry::<f64>::try_from_wkt_str(&self.geometry).map_err(|e| {
            DatasetError::Geometry {
                id: self.id.clone(),
                reason: e.to_string(),
            }
        })?;
        let point = geometry.centroid().ok_or_else(|| DatasetError::Geometry {
            id: self.id.clone(),
            reason: "empty geometry has no centroid".to_string(),
        })?;
        Ok(GeoPoint::new(point.x(), point.y()))
    }
}

/// Stream building records from a CSV (or `.csv.bz2`) file with a header row.
///
/// Rows are parsed lazily; each item fails independently.
pub fn read_building_records<P: AsRef<Path>>(
    path: P,
) -> Result<impl Iterator<Item = Result<BuildingRecord>>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(open_input(path.as_ref())?);

    Ok(reader
        .into_records()
        .map(|row| BuildingRecord::from_row(&row?)))
}
