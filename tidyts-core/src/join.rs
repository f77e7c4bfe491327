//! Outer join of metric series on (identity, date), plus a left join of a
//! static lookup (population) on identity alone.

use crate::error::{Result, TidyError};
use crate::lookup::LookupTable;
use crate::observation::{Identity, MetricSeries};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// One (identity, date) with every joined metric.
///
/// A metric missing from its source for this key is `None`, never `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRecord {
    pub identity: Identity,
    pub date: NaiveDate,
    pub metrics: BTreeMap<String, Option<f64>>,
    pub population: Option<f64>,
}

impl CombinedRecord {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().flatten()
    }
}

/// Result of [`join`]: records ordered by identity then date.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    pub identity_fields: Vec<String>,
    /// Joined metric names in source order.
    pub metrics: Vec<String>,
    pub records: Vec<CombinedRecord>,
}

impl Joined {
    /// Drop records whose `primary` metric is present and not positive.
    ///
    /// Pre-outbreak zero rows carry no signal and would skew differencing.
    /// Records where the primary metric is absent are kept.
    pub fn retain_positive(self, primary: &str) -> Result<Joined> {
        if !self.metrics.iter().any(|m| m == primary) {
            return Err(TidyError::UnknownMetric(primary.to_string()));
        }
        let before = self.records.len();
        let records = self
            .records
            .into_iter()
            .filter(|record| record.metric(primary).map_or(true, |v| v > 0.0))
            .collect::<Vec<_>>();
        log::info!(
            "join: dropped {} records with non-positive {}",
            before - records.len(),
            primary
        );
        Ok(Joined {
            identity_fields: self.identity_fields,
            metrics: self.metrics,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Full outer join of `sources` on (identity, date), then a left join of
/// `lookup` on identity.
///
/// Every (identity, date) found in any source yields exactly one record. A
/// repeated (identity, date) within one metric is a `JoinKeyCollision`; it is
/// never summed or deduplicated.
pub fn join(sources: &[MetricSeries], lookup: Option<&LookupTable>) -> Result<Joined> {
    let identity_fields = sources
        .first()
        .map(|s| s.identity_fields.clone())
        .unwrap_or_default();
    for source in sources {
        if source.identity_fields != identity_fields {
            return Err(TidyError::IdentityMismatch {
                expected: identity_fields,
                found: source.identity_fields.clone(),
            });
        }
    }
    let lookup_positions = match lookup {
        Some(table) => Some(table.key_positions(&identity_fields)?),
        None => None,
    };

    let mut metrics: Vec<String> = Vec::new();
    let mut seen: HashSet<(&str, &Identity, NaiveDate)> = HashSet::new();
    let mut combined: BTreeMap<(Identity, NaiveDate), BTreeMap<String, Option<f64>>> =
        BTreeMap::new();
    for source in sources {
        if !metrics.contains(&source.metric) {
            metrics.push(source.metric.clone());
        }
        for obs in &source.observations {
            if !seen.insert((source.metric.as_str(), &obs.identity, obs.date)) {
                return Err(TidyError::JoinKeyCollision {
                    metric: source.metric.clone(),
                    identity: obs.identity.clone(),
                    date: obs.date,
                });
            }
            combined
                .entry((obs.identity.clone(), obs.date))
                .or_default()
                .insert(source.metric.clone(), Some(obs.value));
        }
    }

    let mut unmatched: BTreeSet<&Identity> = BTreeSet::new();
    let records = combined
        .iter()
        .map(|((identity, date), present)| {
            let metrics = metrics
                .iter()
                .map(|m| (m.clone(), present.get(m).copied().flatten()))
                .collect();
            let population = match (lookup, &lookup_positions) {
                (Some(table), Some(positions)) => {
                    let key = identity.project(positions);
                    if !table.values.contains_key(&key) {
                        unmatched.insert(identity);
                    }
                    table.get(&key)
                }
                _ => None,
            };
            CombinedRecord {
                identity: identity.clone(),
                date: *date,
                metrics,
                population,
            }
        })
        .collect::<Vec<_>>();

    if !unmatched.is_empty() {
        log::warn!(
            "join: {} identities have no lookup match, e.g. ({})",
            unmatched.len(),
            unmatched.iter().next().map(|i| i.to_string()).unwrap_or_default()
        );
    }
    log::info!(
        "join: {} sources -> {} combined records",
        sources.len(),
        records.len()
    );
    Ok(Joined {
        identity_fields,
        metrics,
        records,
    })
}
