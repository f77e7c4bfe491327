//! Ordinary least-squares trend lines for overlays and extrapolation.

use chrono::NaiveDate;
use serde::Serialize;
use tidyts_core::{Result, TidyError};
use tidyts_utils::dates::ordinal_date;

/// Result of a straight-line fit `y = slope * x + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendModel {
    /// Slope of the fitted line
    pub slope: f64,
    /// Intercept of the fitted line
    pub intercept: f64,
    /// R-squared (coefficient of determination)
    pub r_squared: f64,
    /// Fitted value at every input point, in input order
    pub predicted: Vec<f64>,
}

impl TrendModel {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Value of the line at `date`, for fits made with [`fit_dates`].
    pub fn predict_date(&self, date: &NaiveDate) -> f64 {
        self.predict(ordinal_date(date) as f64)
    }
}

fn distinct_count(xs: &[f64]) -> usize {
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// Fit `y` as an affine function of `x`.
///
/// Needs at least two distinct `x` values, otherwise `InsufficientData`.
pub fn fit_line(points: &[(f64, f64)]) -> Result<TrendModel> {
    let xs = points.iter().map(|(x, _)| *x).collect::<Vec<f64>>();
    let found = distinct_count(&xs);
    if found < 2 {
        return Err(TidyError::InsufficientData { needed: 2, found });
    }

    let n = points.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    // centered sums keep ordinal dates (~7e5) from swamping the variance
    let (ss_xx, ss_xy, ss_yy) = points.iter().fold((0.0, 0.0, 0.0), |(xx, xy, yy), (x, y)| {
        let dx = x - mean_x;
        let dy = y - mean_y;
        (xx + dx * dx, xy + dx * dy, yy + dy * dy)
    });

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;
    let predicted = xs.iter().map(|x| slope * x + intercept).collect::<Vec<f64>>();

    let ss_res: f64 = points
        .iter()
        .zip(&predicted)
        .map(|((_, y), p)| (y - p).powi(2))
        .sum();
    let r_squared = if ss_yy.abs() < 1e-10 {
        1.0
    } else {
        1.0 - ss_res / ss_yy
    };

    Ok(TrendModel {
        slope,
        intercept,
        r_squared,
        predicted,
    })
}

/// Fit values against ordinal dates (days from the common era).
pub fn fit_dates(points: &[(NaiveDate, f64)]) -> Result<TrendModel> {
    let numeric = points
        .iter()
        .map(|(date, y)| (ordinal_date(date) as f64, *y))
        .collect::<Vec<(f64, f64)>>();
    fit_line(&numeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fit_line_recovers_exact_line() {
        let points = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)];
        let model = fit_line(&points).unwrap();
        assert_relative_eq!(model.slope, 2.0, epsilon = 1e-10);
        assert_relative_eq!(model.intercept, 1.0, epsilon = 1e-10);
        assert_relative_eq!(model.r_squared, 1.0, epsilon = 1e-10);
        assert_eq!(model.predicted.len(), 4);
        for ((_, y), p) in points.iter().zip(&model.predicted) {
            assert_relative_eq!(*p, *y, epsilon = 1e-10);
        }
    }

    #[test]
    fn fit_line_negative_slope() {
        let points = [(0.0, 10.0), (1.0, 8.0), (2.0, 6.0), (3.0, 4.0), (4.0, 2.0)];
        let model = fit_line(&points).unwrap();
        assert_relative_eq!(model.slope, -2.0, epsilon = 1e-10);
        assert_relative_eq!(model.predict(5.0), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn fit_line_with_noise() {
        let points = [(0.0, 0.0), (1.0, 2.0), (2.0, 1.0), (3.0, 3.0)];
        let model = fit_line(&points).unwrap();
        // sxy = 4, sxx = 5
        assert_relative_eq!(model.slope, 0.8, epsilon = 1e-10);
        assert_relative_eq!(model.intercept, 0.3, epsilon = 1e-10);
        assert!(model.r_squared > 0.0 && model.r_squared < 1.0);
    }

    #[test]
    fn fit_line_two_points() {
        let model = fit_line(&[(0.0, 0.0), (1.0, 1.0)]).unwrap();
        assert_relative_eq!(model.slope, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn fit_line_needs_two_distinct_x() {
        assert!(matches!(
            fit_line(&[]),
            Err(TidyError::InsufficientData { needed: 2, found: 0 })
        ));
        assert!(matches!(
            fit_line(&[(3.0, 1.0)]),
            Err(TidyError::InsufficientData { needed: 2, found: 1 })
        ));
        assert!(matches!(
            fit_line(&[(3.0, 1.0), (3.0, 5.0), (3.0, 2.0)]),
            Err(TidyError::InsufficientData { needed: 2, found: 1 })
        ));
    }

    #[test]
    fn fit_dates_uses_day_ordinals() {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let points = (0..10)
            .map(|i| (start + chrono::Duration::days(i), 100.0 + 5.0 * i as f64))
            .collect::<Vec<_>>();
        let model = fit_dates(&points).unwrap();
        assert_relative_eq!(model.slope, 5.0, epsilon = 1e-8);
        assert_relative_eq!(model.predicted[0], 100.0, epsilon = 1e-6);
        assert_relative_eq!(model.predicted[9], 145.0, epsilon = 1e-6);
        let next = NaiveDate::from_ymd_opt(2020, 3, 11).unwrap();
        assert_relative_eq!(model.predict_date(&next), 150.0, epsilon = 1e-6);
    }
}
