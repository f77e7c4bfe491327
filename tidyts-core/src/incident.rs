//! Incident logs: one event per row with categorical attributes and an
//! occurrence date, e.g. the NYPD shooting incident extract.

use crate::error::{Result, TidyError};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use tidyts_utils::dates::parse_source_date;

/// Inclusive range of calendar days, yielding each date from the first
/// through the second.
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct DateRange(pub NaiveDate, pub NaiveDate);

impl Iterator for DateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 > self.1 {
            return None;
        }
        let current = self.0;
        match current.succ_opt() {
            Some(next) => self.0 = next,
            // NaiveDate::MAX: stop after yielding it
            None => self.1 = NaiveDate::MIN,
        }
        Some(current)
    }
}

/// Keep only events whose `column` equals `value` exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentFilter {
    pub column: String,
    pub value: String,
}

impl std::str::FromStr for IncidentFilter {
    type Err = String;

    /// Parse `column=value`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((column, value)) if !column.is_empty() => Ok(IncidentFilter {
                column: column.to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("expected column=value, got {s:?}")),
        }
    }
}

/// A loaded incident log.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IncidentLog {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Occurrence date of each row.
    pub dates: Vec<NaiveDate>,
}

impl IncidentLog {
    /// Parse a CSV stream with headers; `date_column` holds the occurrence
    /// date in month/day/year form. A trailing time ("01/01/2006 12:00:00 AM")
    /// is ignored.
    pub fn from_reader<R: Read>(reader: R, date_column: &str) -> Result<IncidentLog> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<String>>();
        let date_position = headers
            .iter()
            .position(|h| h == date_column)
            .ok_or_else(|| TidyError::MissingColumn(date_column.to_string()))?;

        let mut rows = Vec::new();
        let mut dates = Vec::new();
        for (row_number, record) in rdr.records().enumerate() {
            let record = record?;
            let cell = record.get(date_position).unwrap_or_default();
            let date_part = cell.split_whitespace().next().unwrap_or_default();
            let date = parse_source_date(date_part).map_err(|_| TidyError::InvalidValue {
                row: row_number,
                column: date_column.to_string(),
                value: cell.to_string(),
            })?;
            dates.push(date);
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }
        log::info!("incident: loaded {} events", rows.len());
        Ok(IncidentLog {
            headers,
            rows,
            dates,
        })
    }

    pub fn parse_csv(csv_object: &str, date_column: &str) -> Result<IncidentLog> {
        IncidentLog::from_reader(csv_object.as_bytes(), date_column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First and last occurrence date in the whole log.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.dates.iter().min()?;
        let last = self.dates.iter().max()?;
        Some((*first, *last))
    }

    /// Number of matching events per calendar day.
    ///
    /// Every day between the first and last event of the whole log is present,
    /// days without a matching event count 0, so filtered series share one
    /// date axis.
    pub fn daily_counts(&self, filter: Option<&IncidentFilter>) -> Result<Vec<(NaiveDate, f64)>> {
        let Some((first, last)) = self.date_span() else {
            return Ok(Vec::new());
        };
        let filter_position = match filter {
            Some(f) => Some((
                self.headers
                    .iter()
                    .position(|h| *h == f.column)
                    .ok_or_else(|| TidyError::MissingColumn(f.column.clone()))?,
                f.value.as_str(),
            )),
            None => None,
        };

        let mut counts: BTreeMap<NaiveDate, f64> =
            DateRange(first, last).map(|d| (d, 0.0)).collect();
        for (row, date) in self.rows.iter().zip(&self.dates) {
            let matches = filter_position.map_or(true, |(position, value)| {
                row.get(position).map(String::as_str) == Some(value)
            });
            if matches {
                *counts.entry(*date).or_default() += 1.0;
            }
        }
        Ok(counts.into_iter().collect())
    }
}
