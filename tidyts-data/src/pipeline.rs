//! The batch pipeline: join, filter, aggregate, then derive smoothed
//! increments, trend lines and per-capita rates for every group.

use crate::aggregate::{aggregate, top_groups, AggregatedSeries, GroupBy};
use crate::rates::{per_capita, PER_CAPITA_SCALE};
use crate::smoothing::{centered_moving_average, smooth_derived};
use crate::trend::{fit_dates, TrendModel};
use crate::yearly::{annotate, normalize_years, NormalizedYearPoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tidyts_core::incident::{IncidentFilter, IncidentLog};
use tidyts_core::join::join;
use tidyts_core::lookup::LookupTable;
use tidyts_core::{Derived, MetricSeries, Result, TidyError};

/// Default smoothing window in days.
pub const DEFAULT_WINDOW: usize = 7;

/// Settings for [`Pipeline`]; every field has a default so a config file
/// only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Centered moving-average window.
    pub window: usize,
    pub group_by: GroupBy,
    /// Metrics to report; empty means every joined metric.
    pub metrics: Vec<String>,
    /// Metric used for the non-positive filter and for ranking; defaults to
    /// the first joined metric.
    pub primary_metric: Option<String>,
    /// Drop records whose primary metric is zero or negative before
    /// aggregating.
    pub filter_non_positive: bool,
    pub per_capita_scale: f64,
    /// Fit the trend over the last `n` dates only.
    pub trend_window: Option<usize>,
    /// Keep only the `n` groups with the largest latest primary value.
    pub top: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            window: DEFAULT_WINDOW,
            group_by: GroupBy::Global,
            metrics: Vec::new(),
            primary_metric: None,
            filter_non_positive: true,
            per_capita_scale: PER_CAPITA_SCALE,
            trend_window: None,
            top: None,
        }
    }
}

/// One output cell group, unique per (group, date, metric).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    pub group: String,
    pub date: NaiveDate,
    pub metric: String,
    pub cumulative: f64,
    pub incremental: Derived,
    pub smoothed: Derived,
    pub trend: Derived,
    pub per_capita: Derived,
}

/// Everything derived for one group.
#[derive(Debug)]
pub struct GroupReport {
    pub group_key: String,
    /// Ordered by date, then by metric in join order.
    pub rows: Vec<OutputRow>,
    /// Trend fit per metric, including the failed ones.
    pub trends: BTreeMap<String, Result<TrendModel>>,
}

struct MetricColumns {
    cumulative: Vec<f64>,
    incremental: Vec<Derived>,
    smoothed: Vec<Derived>,
    trend: Vec<Derived>,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Pipeline {
        Pipeline { config }
    }

    /// Run the series pipeline over already reshaped `sources`.
    ///
    /// Join and configuration errors abort the run. A trend fit that fails
    /// for one group and metric only marks that column `Degenerate`.
    pub fn run(
        &self,
        sources: &[MetricSeries],
        lookup: Option<&LookupTable>,
    ) -> Result<Vec<GroupReport>> {
        let mut joined = join(sources, lookup)?;
        let primary = self
            .config
            .primary_metric
            .clone()
            .or_else(|| joined.metrics.first().cloned());
        if let Some(primary) = &primary {
            if self.config.filter_non_positive {
                joined = joined.retain_positive(primary)?;
            } else if !joined.metrics.contains(primary) {
                return Err(TidyError::UnknownMetric(primary.clone()));
            }
        }

        let metrics = if self.config.metrics.is_empty() {
            joined.metrics.clone()
        } else {
            for metric in &self.config.metrics {
                if !joined.metrics.contains(metric) {
                    return Err(TidyError::UnknownMetric(metric.clone()));
                }
            }
            self.config.metrics.clone()
        };

        let selector = self.config.group_by.resolve(&joined.identity_fields)?;
        let mut series = aggregate(&joined.records, |r| selector.key(r), &metrics);

        let rank_metric = primary
            .filter(|p| metrics.contains(p))
            .or_else(|| metrics.first().cloned());
        if let (Some(n), Some(rank_metric)) = (self.config.top, &rank_metric) {
            let keep = top_groups(&series, rank_metric, n)
                .into_iter()
                .map(|(key, _)| key)
                .collect::<Vec<String>>();
            series.retain(|s| keep.contains(&s.group_key));
            // ranked order, largest first
            series.sort_by_key(|s| keep.iter().position(|k| *k == s.group_key));
        }

        let reports = series
            .iter()
            .map(|s| self.report(s, &metrics))
            .collect::<Vec<_>>();
        log::info!(
            "pipeline: {} groups, {} metrics, {} rows",
            reports.len(),
            metrics.len(),
            reports.iter().map(|r| r.rows.len()).sum::<usize>()
        );
        Ok(reports)
    }

    fn report(&self, series: &AggregatedSeries, metrics: &[String]) -> GroupReport {
        let dates = series.dates();
        let mut trends = BTreeMap::new();
        let columns = metrics
            .iter()
            .map(|metric| {
                let cumulative = series.cumulative(metric);
                let incremental = series.incremental(metric);
                let smoothed = smooth_derived(&incremental, self.config.window);
                let (trend, fit) = self.trend_column(&dates, &cumulative);
                if let Err(e) = &fit {
                    log::warn!("pipeline: no trend for {} / {}: {}", series.group_key, metric, e);
                }
                trends.insert(metric.clone(), fit);
                MetricColumns {
                    cumulative,
                    incremental,
                    smoothed,
                    trend,
                }
            })
            .collect::<Vec<_>>();

        let mut rows = Vec::with_capacity(dates.len() * metrics.len());
        for (i, point) in series.points.iter().enumerate() {
            for (metric, column) in metrics.iter().zip(&columns) {
                rows.push(OutputRow {
                    group: series.group_key.clone(),
                    date: point.date,
                    metric: metric.clone(),
                    cumulative: column.cumulative[i],
                    incremental: column.incremental[i],
                    smoothed: column.smoothed[i],
                    trend: column.trend[i],
                    per_capita: per_capita(
                        column.cumulative[i],
                        point.population,
                        self.config.per_capita_scale,
                    ),
                });
            }
        }
        GroupReport {
            group_key: series.group_key.clone(),
            rows,
            trends,
        }
    }

    /// Trend of the cumulative values. Dates before the fitted window are
    /// `Undefined`; if the fit fails the window is `Degenerate`.
    fn trend_column(
        &self,
        dates: &[NaiveDate],
        cumulative: &[f64],
    ) -> (Vec<Derived>, Result<TrendModel>) {
        let start = self
            .config
            .trend_window
            .map_or(0, |n| dates.len().saturating_sub(n));
        let points = dates[start..]
            .iter()
            .copied()
            .zip(cumulative[start..].iter().copied())
            .collect::<Vec<(NaiveDate, f64)>>();
        let fit = fit_dates(&points);
        let mut column = vec![Derived::Undefined; start];
        match &fit {
            Ok(model) => column.extend(model.predicted.iter().map(|v| Derived::Computed(*v))),
            Err(_) => column.extend(std::iter::repeat(Derived::Degenerate).take(points.len())),
        }
        (column, fit)
    }

    /// Daily event counts of `events`, smoothed and normalized within each
    /// calendar year.
    pub fn incidents(
        &self,
        events: &IncidentLog,
        filter: Option<&IncidentFilter>,
    ) -> Result<Vec<NormalizedYearPoint>> {
        let counts = events.daily_counts(filter)?;
        let (dates, raw): (Vec<NaiveDate>, Vec<f64>) = counts.into_iter().unzip();
        let smoothed = centered_moving_average(&raw, self.config.window);
        let normalized = normalize_years(&annotate(&dates, &raw, &smoothed));
        log::info!("pipeline: {} incident days normalized", normalized.len());
        Ok(normalized)
    }
}
