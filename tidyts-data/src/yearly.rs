//! Per-calendar-year views of a daily series: day-of-year annotation and
//! min/max normalization within each year, for overlaying years on one axis.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tidyts_core::{Derived, Result, TidyError};
use tidyts_utils::dates::year_and_day;

/// One day of a series tagged with its calendar year and day of year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearPoint {
    pub year: i32,
    /// 1-based, so January 1 is 1 and December 31 of a leap year is 366
    pub day_of_year: u32,
    pub date: NaiveDate,
    pub raw: f64,
    pub smoothed: f64,
}

/// Zip parallel `dates`, `raw` and `smoothed` slices into year points.
/// Stops at the shortest slice.
pub fn annotate(dates: &[NaiveDate], raw: &[f64], smoothed: &[f64]) -> Vec<YearPoint> {
    dates
        .iter()
        .zip(raw)
        .zip(smoothed)
        .map(|((date, raw), smoothed)| {
            let (year, day_of_year) = year_and_day(date);
            YearPoint {
                year,
                day_of_year,
                date: *date,
                raw: *raw,
                smoothed: *smoothed,
            }
        })
        .collect()
}

/// Smallest and largest smoothed value seen in one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearRange {
    pub year: i32,
    pub min: f64,
    pub max: f64,
}

impl YearRange {
    /// Map `value` onto the year's range, 0 at `min` and 1 at `max`.
    ///
    /// Raw values can land outside `[0, 1]` since the range comes from the
    /// smoothed series.
    pub fn scale(&self, value: f64) -> Result<f64> {
        let width = self.max - self.min;
        if width == 0.0 {
            return Err(TidyError::DegenerateRange {
                year: self.year,
                value: self.min,
            });
        }
        Ok((value - self.min) / width)
    }
}

/// Range of the smoothed value for every year present in `points`.
pub fn year_ranges(points: &[YearPoint]) -> BTreeMap<i32, YearRange> {
    let mut ranges: BTreeMap<i32, YearRange> = BTreeMap::new();
    for point in points {
        ranges
            .entry(point.year)
            .and_modify(|range| {
                range.min = range.min.min(point.smoothed);
                range.max = range.max.max(point.smoothed);
            })
            .or_insert(YearRange {
                year: point.year,
                min: point.smoothed,
                max: point.smoothed,
            });
    }
    ranges
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedYearPoint {
    pub year: i32,
    pub day_of_year: u32,
    pub date: NaiveDate,
    pub raw_value: f64,
    pub smoothed_value: f64,
    pub normalized_raw: Derived,
    pub normalized_smoothed: Derived,
}

/// Normalize raw and smoothed values within each calendar year.
///
/// A year whose smoothed values are all equal cannot be scaled: every point of
/// that year gets `Derived::Degenerate` and the other years are unaffected.
pub fn normalize_years(points: &[YearPoint]) -> Vec<NormalizedYearPoint> {
    let ranges = year_ranges(points);
    for range in ranges.values() {
        if let Err(e) = range.scale(range.min) {
            log::warn!("yearly: {e}");
        }
    }

    points
        .iter()
        .map(|point| {
            let normalize = |value: f64| match ranges.get(&point.year).map(|r| r.scale(value)) {
                Some(Ok(scaled)) => Derived::Computed(scaled),
                _ => Derived::Degenerate,
            };
            NormalizedYearPoint {
                year: point.year,
                day_of_year: point.day_of_year,
                date: point.date,
                raw_value: point.raw,
                smoothed_value: point.smoothed,
                normalized_raw: normalize(point.raw),
                normalized_smoothed: normalize(point.smoothed),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_annotate_day_of_year() {
        let dates = [date(2020, 1, 1), date(2020, 12, 31), date(2021, 12, 31)];
        let points = annotate(&dates, &[1.0, 2.0, 3.0], &[1.5, 2.5, 3.5]);
        assert_eq!(points.len(), 3);
        assert_eq!((points[0].year, points[0].day_of_year), (2020, 1));
        assert_eq!((points[1].year, points[1].day_of_year), (2020, 366));
        assert_eq!((points[2].year, points[2].day_of_year), (2021, 365));
        assert_eq!(points[2].smoothed, 3.5);
    }

    #[test]
    fn test_normalize_within_each_year() {
        let dates = [
            date(2019, 6, 1),
            date(2019, 6, 2),
            date(2019, 6, 3),
            date(2020, 6, 1),
            date(2020, 6, 2),
        ];
        let raw = [1.0, 4.0, 7.0, 10.0, 30.0];
        let smoothed = [2.0, 4.0, 6.0, 10.0, 30.0];
        let normalized = normalize_years(&annotate(&dates, &raw, &smoothed));

        let smoothed_2019: Vec<f64> = normalized[..3]
            .iter()
            .filter_map(|p| p.normalized_smoothed.value())
            .collect();
        assert_eq!(smoothed_2019.len(), 3);
        assert_relative_eq!(smoothed_2019[0], 0.0);
        assert_relative_eq!(smoothed_2019[1], 0.5);
        assert_relative_eq!(smoothed_2019[2], 1.0);
        // raw is scaled by the smoothed range
        assert_relative_eq!(normalized[0].normalized_raw.value().unwrap(), -0.25);
        assert_relative_eq!(normalized[2].normalized_raw.value().unwrap(), 1.25);

        assert_eq!(normalized[3].normalized_smoothed, Derived::Computed(0.0));
        assert_eq!(normalized[4].normalized_smoothed, Derived::Computed(1.0));
    }

    #[test]
    fn test_flat_year_is_degenerate_and_isolated() {
        let dates = [date(2020, 3, 1), date(2020, 3, 2), date(2021, 3, 1), date(2021, 3, 2)];
        let raw = [5.0, 6.0, 1.0, 3.0];
        let smoothed = [5.5, 5.5, 1.0, 3.0];
        let normalized = normalize_years(&annotate(&dates, &raw, &smoothed));

        for point in &normalized[..2] {
            assert_eq!(point.normalized_raw, Derived::Degenerate);
            assert_eq!(point.normalized_smoothed, Derived::Degenerate);
            assert_eq!(point.raw_value, if point.date == dates[0] { 5.0 } else { 6.0 });
        }
        assert_eq!(normalized[2].normalized_smoothed, Derived::Computed(0.0));
        assert_eq!(normalized[3].normalized_smoothed, Derived::Computed(1.0));
    }

    #[test]
    fn test_single_point_year_is_degenerate() {
        let ranges = year_ranges(&annotate(&[date(2022, 1, 9)], &[4.0], &[4.0]));
        let range = ranges[&2022];
        assert!(matches!(
            range.scale(4.0),
            Err(TidyError::DegenerateRange { year: 2022, value }) if value == 4.0
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize_years(&[]).is_empty());
        assert!(year_ranges(&[]).is_empty());
    }
}
