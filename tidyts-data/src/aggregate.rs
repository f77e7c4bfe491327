//! Group-and-sum of combined records into cumulative and day-over-day series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tidyts_core::join::CombinedRecord;
use tidyts_core::{Derived, Result, TidyError};

/// Group label used when everything is aggregated together.
pub const GLOBAL_GROUP: &str = "ALL";

/// How records are grouped before summing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// One group, labelled [`GLOBAL_GROUP`].
    #[default]
    Global,
    /// One group per full identity.
    Identity,
    /// One group per value of a single identity field, e.g. `Country/Region`.
    Field(String),
}

impl std::str::FromStr for GroupBy {
    type Err = String;

    /// `all`, `identity`, or an identity field name.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "" => Err("empty group-by".to_string()),
            "all" | "ALL" | "global" => Ok(GroupBy::Global),
            "identity" => Ok(GroupBy::Identity),
            field => Ok(GroupBy::Field(field.to_string())),
        }
    }
}

impl GroupBy {
    /// Bind to the identity fields of a joined table.
    pub fn resolve(&self, identity_fields: &[String]) -> Result<KeySelector> {
        match self {
            GroupBy::Global => Ok(KeySelector::Constant(GLOBAL_GROUP.to_string())),
            GroupBy::Identity => Ok(KeySelector::Identity),
            GroupBy::Field(name) => identity_fields
                .iter()
                .position(|f| f == name)
                .map(KeySelector::Field)
                .ok_or_else(|| TidyError::UnknownField(name.clone())),
        }
    }
}

/// A resolved grouping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelector {
    Constant(String),
    Field(usize),
    Identity,
}

impl KeySelector {
    pub fn key(&self, record: &CombinedRecord) -> String {
        match self {
            KeySelector::Constant(label) => label.clone(),
            KeySelector::Field(position) => record.identity.0[*position].clone(),
            KeySelector::Identity => record.identity.to_string(),
        }
    }
}

/// Sums for one (group, date).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedPoint {
    pub group_key: String,
    pub date: NaiveDate,
    pub cumulative: BTreeMap<String, f64>,
    /// `Undefined` on the first date of a group.
    pub incremental: BTreeMap<String, Derived>,
    /// Sum of member populations; `None` unless every member has one.
    pub population: Option<f64>,
}

/// One group's points, ascending by date with no repeated dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSeries {
    pub group_key: String,
    pub points: Vec<AggregatedPoint>,
}

impl AggregatedSeries {
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Cumulative values of `metric`, 0 where the metric was never summed.
    pub fn cumulative(&self, metric: &str) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.cumulative.get(metric).copied().unwrap_or_default())
            .collect()
    }

    pub fn incremental(&self, metric: &str) -> Vec<Derived> {
        self.points
            .iter()
            .map(|p| p.incremental.get(metric).copied().unwrap_or_default())
            .collect()
    }

    /// Latest cumulative value of `metric`.
    pub fn latest(&self, metric: &str) -> Option<f64> {
        self.points
            .last()
            .and_then(|p| p.cumulative.get(metric).copied())
    }
}

#[derive(Default)]
struct Accumulator {
    sums: BTreeMap<String, f64>,
    population: Option<f64>,
    members: usize,
}

/// Group `records` by `(key(record), date)` and sum `metrics`.
///
/// Absent metric values add nothing to a sum. Increments are raw differences
/// between consecutive dates of a group; a downward revision shows up as a
/// negative increment and is not clamped.
pub fn aggregate<F>(
    records: &[CombinedRecord],
    key: F,
    metrics: &[String],
) -> Vec<AggregatedSeries>
where
    F: Fn(&CombinedRecord) -> String,
{
    let mut groups: BTreeMap<String, BTreeMap<NaiveDate, Accumulator>> = BTreeMap::new();
    for record in records {
        let acc = groups
            .entry(key(record))
            .or_default()
            .entry(record.date)
            .or_default();
        for metric in metrics {
            *acc.sums.entry(metric.clone()).or_default() +=
                record.metric(metric).unwrap_or_default();
        }
        acc.population = match (acc.members, acc.population, record.population) {
            (0, _, p) => p,
            (_, Some(total), Some(p)) => Some(total + p),
            _ => None,
        };
        acc.members += 1;
    }

    let series = groups
        .into_iter()
        .map(|(group_key, by_date)| {
            let mut points: Vec<AggregatedPoint> = Vec::with_capacity(by_date.len());
            for (date, acc) in by_date {
                let incremental = metrics
                    .iter()
                    .map(|metric| {
                        let current = acc.sums[metric];
                        let step = match points.last() {
                            Some(previous) => {
                                Derived::Computed(current - previous.cumulative[metric])
                            }
                            None => Derived::Undefined,
                        };
                        (metric.clone(), step)
                    })
                    .collect();
                points.push(AggregatedPoint {
                    group_key: group_key.clone(),
                    date,
                    cumulative: acc.sums,
                    incremental,
                    population: acc.population,
                });
            }
            AggregatedSeries { group_key, points }
        })
        .collect::<Vec<_>>();
    log::info!(
        "aggregate: {} records -> {} groups",
        records.len(),
        series.len()
    );
    series
}

/// Group keys ranked by latest cumulative `metric`, largest first; ties by key.
pub fn top_groups(series: &[AggregatedSeries], metric: &str, n: usize) -> Vec<(String, f64)> {
    let mut ranked = series
        .iter()
        .filter_map(|s| s.latest(metric).map(|v| (s.group_key.clone(), v)))
        .collect::<Vec<_>>();
    ranked.sort_by(|(a_key, a), (b_key, b)| b.total_cmp(a).then_with(|| a_key.cmp(b_key)));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidyts_core::join::join;
    use tidyts_core::{Identity, MetricSeries};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, d).unwrap()
    }

    fn metrics(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn two_identities() -> Vec<CombinedRecord> {
        let cases = MetricSeries::from_values(
            "cases",
            &["Province/State", "Country/Region"],
            vec![
                (Identity::from(["", "A"]), day(1), 1.0),
                (Identity::from(["", "A"]), day(2), 3.0),
                (Identity::from(["", "A"]), day(3), 6.0),
                (Identity::from(["x", "B"]), day(1), 0.0),
                (Identity::from(["x", "B"]), day(2), 2.0),
                (Identity::from(["x", "B"]), day(3), 2.0),
            ],
        );
        join(&[cases], None).unwrap().records
    }

    #[test]
    fn test_global_sum_and_first_increment_undefined() {
        let records = two_identities();
        let series = aggregate(&records, |_| GLOBAL_GROUP.to_string(), &metrics(&["cases"]));
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].group_key, "ALL");
        assert_eq!(series[0].cumulative("cases"), vec![1.0, 5.0, 8.0]);
        assert_eq!(
            series[0].incremental("cases"),
            vec![Derived::Undefined, Derived::Computed(4.0), Derived::Computed(3.0)]
        );
    }

    #[test]
    fn test_length_equals_distinct_dates_per_group() {
        let mut records = two_identities();
        records.retain(|r| !(r.identity == Identity::from(["x", "B"]) && r.date == day(3)));
        let selector = GroupBy::Field("Country/Region".to_string())
            .resolve(&metrics(&["Province/State", "Country/Region"]))
            .unwrap();
        let series = aggregate(&records, |r| selector.key(r), &metrics(&["cases"]));
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].group_key, "A");
        assert_eq!(series[0].points.len(), 3);
        assert_eq!(series[1].group_key, "B");
        assert_eq!(series[1].points.len(), 2);
        for s in &series {
            assert_eq!(s.points[0].incremental["cases"], Derived::Undefined);
            assert!(s.dates().windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_downward_revision_passes_through() {
        let cases = MetricSeries::from_values(
            "cases",
            &["Country/Region"],
            vec![
                (Identity::from(["A"]), day(1), 10.0),
                (Identity::from(["A"]), day(2), 7.0),
                (Identity::from(["A"]), day(3), 9.0),
            ],
        );
        let records = join(&[cases], None).unwrap().records;
        let series = aggregate(&records, |_| GLOBAL_GROUP.to_string(), &metrics(&["cases"]));
        assert_eq!(
            series[0].incremental("cases"),
            vec![Derived::Undefined, Derived::Computed(-3.0), Derived::Computed(2.0)]
        );
    }

    #[test]
    fn test_absent_metric_adds_nothing() {
        let cases = MetricSeries::from_values(
            "cases",
            &["Country/Region"],
            vec![(Identity::from(["A"]), day(1), 5.0), (Identity::from(["B"]), day(1), 2.0)],
        );
        let deaths = MetricSeries::from_values(
            "deaths",
            &["Country/Region"],
            vec![(Identity::from(["A"]), day(1), 1.0)],
        );
        let records = join(&[cases, deaths], None).unwrap().records;
        let series = aggregate(
            &records,
            |_| GLOBAL_GROUP.to_string(),
            &metrics(&["cases", "deaths"]),
        );
        let point = &series[0].points[0];
        assert_eq!(point.cumulative["cases"], 7.0);
        assert_eq!(point.cumulative["deaths"], 1.0);
    }

    #[test]
    fn test_population_needs_every_member() {
        let mut records = two_identities();
        for r in records.iter_mut() {
            r.population = if r.identity.0[1] == "A" { Some(100.0) } else { Some(50.0) };
        }
        let series = aggregate(&records, |_| GLOBAL_GROUP.to_string(), &metrics(&["cases"]));
        assert_eq!(series[0].points[0].population, Some(150.0));

        records[3].population = None;
        let series = aggregate(&records, |_| GLOBAL_GROUP.to_string(), &metrics(&["cases"]));
        // records[3] is B on day 1
        assert_eq!(series[0].points[0].population, None);
        assert_eq!(series[0].points[1].population, Some(150.0));
    }

    #[test]
    fn test_group_by_parse_and_resolve() {
        assert_eq!("all".parse::<GroupBy>().unwrap(), GroupBy::Global);
        assert_eq!("identity".parse::<GroupBy>().unwrap(), GroupBy::Identity);
        assert_eq!(
            "Country/Region".parse::<GroupBy>().unwrap(),
            GroupBy::Field("Country/Region".to_string())
        );
        let fields = metrics(&["Country/Region"]);
        assert!(matches!(
            GroupBy::Field("Admin2".to_string()).resolve(&fields),
            Err(TidyError::UnknownField(name)) if name == "Admin2"
        ));
    }

    #[test]
    fn test_identity_key_joins_fields() {
        let records = two_identities();
        let selector = GroupBy::Identity
            .resolve(&metrics(&["Province/State", "Country/Region"]))
            .unwrap();
        assert_eq!(selector.key(&records[0]), ", A");
        assert_eq!(selector.key(&records[3]), "x, B");
    }

    #[test]
    fn test_top_groups() {
        let records = two_identities();
        let selector = KeySelector::Field(1);
        let series = aggregate(&records, |r| selector.key(r), &metrics(&["cases"]));
        assert_eq!(top_groups(&series, "cases", 1), vec![("A".to_string(), 6.0)]);
        assert_eq!(top_groups(&series, "cases", 5).len(), 2);
        assert!(top_groups(&series, "deaths", 5).is_empty());
    }
}
