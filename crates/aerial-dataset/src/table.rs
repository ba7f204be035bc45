//! In-memory CSV tables with transparent bzip2 support.

use crate::{DatasetError, Result};
use bzip2::read::MultiBzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use csv::StringRecord;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Whether `path` names a bzip2-compressed file.
pub fn is_bz2(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bz2")
}

/// Open `path` for reading, decompressing `.bz2` files on the fly.
pub fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    if is_bz2(path) {
        Ok(Box::new(MultiBzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// A CSV table: one header row and any number of data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    /// Create a table from a header and rows.
    pub fn new(headers: StringRecord, rows: Vec<StringRecord>) -> Self {
        Self { headers, rows }
    }

    /// Empty table sharing this table's header.
    pub fn empty_like(&self) -> Self {
        Self::new(self.headers.clone(), Vec::new())
    }

    /// Header row.
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Data rows.
    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row.
    pub fn push(&mut self, row: StringRecord) {
        self.rows.push(row);
    }

    /// Position of the column named `name`.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }

    /// Parse a CSV document whose first line is the header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers = csv.headers()?.clone();
        let rows = csv.records().collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    /// Write header and rows as CSV.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<W> {
        let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        csv.write_record(&self.headers)?;
        for row in &self.rows {
            csv.write_record(row)?;
        }
        csv.flush()?;
        csv.into_inner().map_err(|e| DatasetError::Io(e.into_error()))
    }
}

/// Read a whole table from `path` (`.bz2` is decompressed).
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    Table::from_reader(open_input(path.as_ref())?)
}

/// Write `table` to `path`, bzip2-compressing when the name ends in `.bz2`.
pub fn write_table<P: AsRef<Path>>(path: P, table: &Table) -> Result<()> {
    let path = path.as_ref();
    let file = BufWriter::new(File::create(path)?);
    if is_bz2(path) {
        let encoder = table.to_writer(BzEncoder::new(file, Compression::default()))?;
        encoder.finish()?.flush()?;
    } else {
        table.to_writer(file)?.flush()?;
    }
    Ok(())
}
