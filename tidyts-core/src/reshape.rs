//! Wide to long reshaping.
//!
//! A wide table has identity columns followed by one column per date. Melting
//! turns every (row, date column) cell into an [`Observation`].

use crate::error::{Result, TidyError};
use crate::observation::{Identity, MetricSeries, Observation};
use crate::wide_table::WideTable;
use chrono::NaiveDate;
use tidyts_utils::dates::parse_source_date;

/// Column roles for a wide table. Every header that is neither an identity
/// nor a drop column must be a date label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WideSchema {
    /// Identity columns, in key order.
    pub identity: Vec<String>,
    /// Columns discarded before reshaping (coordinates, internal IDs).
    pub drop: Vec<String>,
}

impl WideSchema {
    pub fn new<S: AsRef<str>>(identity: &[S], drop: &[S]) -> WideSchema {
        WideSchema {
            identity: identity.iter().map(|s| s.as_ref().to_string()).collect(),
            drop: drop.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Schema of the global time series: `Province/State, Country/Region, Lat, Long`.
    pub fn global() -> WideSchema {
        WideSchema::new(&["Province/State", "Country/Region"], &["Lat", "Long"])
    }

    /// Schema of the US county time series.
    pub fn us_counties() -> WideSchema {
        WideSchema::new(
            &["Admin2", "Province_State", "Country_Region"],
            &[
                "UID",
                "iso2",
                "iso3",
                "code3",
                "FIPS",
                "Lat",
                "Long_",
                "Combined_Key",
                "Population",
            ],
        )
    }
}

/// Where each header goes after classification.
enum ColumnRole {
    Identity,
    Drop,
    Date(NaiveDate),
}

fn classify_columns(table: &WideTable, schema: &WideSchema) -> Result<Vec<ColumnRole>> {
    for name in &schema.identity {
        table.column_index(name)?;
    }
    table
        .headers
        .iter()
        .map(|header| {
            if schema.identity.contains(header) {
                Ok(ColumnRole::Identity)
            } else if schema.drop.contains(header) {
                Ok(ColumnRole::Drop)
            } else {
                parse_source_date(header)
                    .map(ColumnRole::Date)
                    .map_err(|e| TidyError::MalformedDateLabel {
                        label: header.clone(),
                        reason: e.0,
                    })
            }
        })
        .collect()
}

/// Melt a wide table into one observation per (row, date column).
///
/// Empty cells carry no observation. Any other cell must parse as a number.
pub fn melt(table: &WideTable, schema: &WideSchema, metric: &str) -> Result<MetricSeries> {
    let roles = classify_columns(table, schema)?;
    let identity_positions = schema
        .identity
        .iter()
        .map(|name| table.column_index(name))
        .collect::<Result<Vec<usize>>>()?;
    let date_columns = roles
        .iter()
        .enumerate()
        .filter_map(|(i, role)| match role {
            ColumnRole::Date(date) => Some((i, *date)),
            ColumnRole::Identity | ColumnRole::Drop => None,
        })
        .collect::<Vec<(usize, NaiveDate)>>();

    let mut observations = Vec::with_capacity(table.rows.len() * date_columns.len());
    let mut skipped = 0u32;
    for (row_number, row) in table.rows.iter().enumerate() {
        let identity = Identity(
            identity_positions
                .iter()
                .map(|&i| row[i].clone())
                .collect(),
        );
        for &(column, date) in &date_columns {
            let cell = row[column].trim();
            if cell.is_empty() {
                skipped += 1;
                continue;
            }
            // "NaN" and "inf" parse as f64 but are not counts
            let value = cell
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| TidyError::InvalidValue {
                    row: row_number,
                    column: table.headers[column].clone(),
                    value: cell.to_string(),
                })?;
            observations.push(Observation {
                identity: identity.clone(),
                date,
                metric: metric.to_string(),
                value,
            });
        }
    }
    if skipped > 0 {
        log::debug!("reshape: skipped {} empty {} cells", skipped, metric);
    }
    log::info!(
        "reshape: melted {} rows x {} dates into {} {} observations",
        table.rows.len(),
        date_columns.len(),
        observations.len(),
        metric
    );
    Ok(MetricSeries {
        metric: metric.to_string(),
        identity_fields: schema.identity.clone(),
        observations,
    })
}
