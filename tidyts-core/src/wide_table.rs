use crate::error::{Result, TidyError};
use csv::ReaderBuilder;
use std::io::Read;

/// A raw wide table as handed over by the data source: one header row, then
/// one row per identity with identity cells followed by one cell per date.
///
/// Cells are kept as strings; typing happens in [`crate::reshape`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WideTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl WideTable {
    /// Parse a CSV stream whose first record is the header.
    ///
    /// Every row must have as many cells as the header.
    pub fn from_reader<R: Read>(reader: R) -> Result<WideTable> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<String>>();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }
        log::info!(
            "wide_table: loaded {} rows x {} columns",
            rows.len(),
            headers.len()
        );
        Ok(WideTable { headers, rows })
    }

    /// Parse a CSV string, see [`WideTable::from_reader`].
    pub fn parse_csv(csv_object: &str) -> Result<WideTable> {
        WideTable::from_reader(csv_object.as_bytes())
    }

    /// Position of a header, or `MissingColumn`.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| TidyError::MissingColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
