use crate::error::{Result, TidyError};
use crate::observation::Identity;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Read;

/// Static per-identity attribute (population) keyed by a subset of the
/// identity fields, e.g. `Country/Region` alone or `(Province/State, Country/Region)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LookupTable {
    /// Identity field names the keys are made of, in key order.
    pub key_fields: Vec<String>,
    /// Key -> value; `None` when the source cell was blank or not a finite number.
    pub values: HashMap<Identity, Option<f64>>,
}

fn is_blank(cell: &str) -> bool {
    matches!(cell.trim().to_lowercase().as_str(), "" | "null" | "n/a" | "na")
}

/// Finite number in `cell`; blanks, junk, `NaN` and infinities give `None`.
fn parse_finite(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl LookupTable {
    /// Build a table from (key, value) pairs, rejecting repeated keys.
    pub fn from_entries<I>(key_fields: &[&str], entries: I) -> Result<LookupTable>
    where
        I: IntoIterator<Item = (Identity, Option<f64>)>,
    {
        let mut values = HashMap::new();
        for (key, value) in entries {
            if values.contains_key(&key) {
                return Err(TidyError::DuplicateLookupKey(key));
            }
            values.insert(key, value);
        }
        Ok(LookupTable {
            key_fields: key_fields.iter().map(|f| f.to_string()).collect(),
            values,
        })
    }

    /// Parse a lookup CSV (with headers).
    ///
    /// `key_columns` maps each lookup column to the identity field it stands
    /// for, e.g. `("Country_Region", "Country/Region")`. Blank, non-numeric
    /// and non-finite value cells are kept as absent.
    pub fn from_reader<R: Read>(
        reader: R,
        key_columns: &[(String, String)],
        value_column: &str,
    ) -> Result<LookupTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| TidyError::MissingColumn(name.to_string()))
        };
        let key_positions = key_columns
            .iter()
            .map(|(column, _)| position(column.as_str()))
            .collect::<Result<Vec<usize>>>()?;
        let value_position = position(value_column)?;

        let mut values = HashMap::new();
        let mut unusable = 0u32;
        for record in rdr.records() {
            let record = record?;
            let key = Identity(
                key_positions
                    .iter()
                    .map(|&i| record.get(i).unwrap_or_default().to_string())
                    .collect(),
            );
            let cell = record.get(value_position).unwrap_or_default();
            let value = parse_finite(cell);
            if value.is_none() && !is_blank(cell) {
                unusable += 1;
            }
            if values.insert(key.clone(), value).is_some() {
                return Err(TidyError::DuplicateLookupKey(key));
            }
        }
        if unusable > 0 {
            log::debug!("lookup: kept {} unusable {} cells as absent", unusable, value_column);
        }
        log::info!("lookup: loaded {} {} entries", values.len(), value_column);
        Ok(LookupTable {
            key_fields: key_columns.iter().map(|(_, field)| field.clone()).collect(),
            values,
        })
    }

    /// Value for a key. `None` both when the key is unknown and when the
    /// source cell was blank.
    pub fn get(&self, key: &Identity) -> Option<f64> {
        self.values.get(key).copied().flatten()
    }

    /// Positions of the key fields within `identity_fields`.
    pub fn key_positions(&self, identity_fields: &[String]) -> Result<Vec<usize>> {
        self.key_fields
            .iter()
            .map(|field| {
                identity_fields
                    .iter()
                    .position(|f| f == field)
                    .ok_or_else(|| TidyError::UnknownField(field.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
