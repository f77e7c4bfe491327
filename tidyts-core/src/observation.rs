use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Ordered tuple of categorical fields addressing one source row,
/// e.g. (Province/State, Country/Region).
///
/// Equality is exact, field by field. No trimming or case folding is done, so
/// two tables that spell a region differently do not match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(pub Vec<String>);

impl Identity {
    /// Project onto the given field positions, in that order.
    pub fn project(&self, positions: &[usize]) -> Identity {
        Identity(positions.iter().map(|&i| self.0[i].clone()).collect())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Identity {
    fn from(value: [S; N]) -> Self {
        Identity(value.into_iter().map(Into::into).collect())
    }
}

/// A single (identity, date, metric) value from a source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub identity: Identity,
    pub date: NaiveDate,
    pub metric: String,
    pub value: f64,
}

/// All observations of one metric taken from one source table.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub metric: String,
    /// Names of the identity fields, parallel to every `Identity` in the series.
    pub identity_fields: Vec<String>,
    pub observations: Vec<Observation>,
}

impl MetricSeries {
    /// Build a series from (identity, date, value) triples.
    pub fn from_values<I>(metric: &str, identity_fields: &[&str], values: I) -> MetricSeries
    where
        I: IntoIterator<Item = (Identity, NaiveDate, f64)>,
    {
        let observations = values
            .into_iter()
            .map(|(identity, date, value)| Observation {
                identity,
                date,
                metric: metric.to_string(),
                value,
            })
            .collect();
        MetricSeries {
            metric: metric.to_string(),
            identity_fields: identity_fields.iter().map(|f| f.to_string()).collect(),
            observations,
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Rebuild the wide view: identity -> date -> value.
    ///
    /// Duplicated (identity, date) pairs keep the last value; the joiner is
    /// where duplicates are rejected.
    pub fn pivot(&self) -> BTreeMap<Identity, BTreeMap<NaiveDate, f64>> {
        let mut result: BTreeMap<Identity, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for obs in &self.observations {
            result
                .entry(obs.identity.clone())
                .or_default()
                .insert(obs.date, obs.value);
        }
        result
    }
}
