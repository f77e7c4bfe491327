//! Centered moving average with edge-clamped windows.

use tidyts_core::Derived;

/// Smooth `series` with a centered moving average of `window` points.
///
/// With `mid = window / 2`:
/// - `i < mid` averages `series[0..=i + mid]`
/// - `i >= n - mid` averages `series[i - mid..]`
/// - `i == mid` is the direct mean of the first `window` values
/// - every other index slides the previous mean by one step, adding the
///   entering value and removing the leaving one, each scaled by `1 / window`
///
/// The output always has the input's length. `window <= 1` and
/// `window > series.len()` return the input unchanged.
pub fn centered_moving_average(series: &[f64], window: usize) -> Vec<f64> {
    let n = series.len();
    let window = window.max(1);
    if window == 1 || window > n {
        return series.to_vec();
    }
    let mid = window / 2;
    let scale = 1.0 / window as f64;
    let mean = |slice: &[f64]| slice.iter().sum::<f64>() / slice.len() as f64;

    let mut result = Vec::with_capacity(n);
    let mut running = 0.0;
    for i in 0..n {
        let value = if i < mid {
            mean(&series[..=i + mid])
        } else if i >= n - mid {
            mean(&series[i - mid..])
        } else if i == mid {
            running = mean(&series[..window]);
            running
        } else {
            running += (series[i - mid + window - 1] - series[i - 1 - mid]) * scale;
            running
        };
        result.push(value);
    }
    result
}

/// Smooth every run of computed values independently; `Undefined` and
/// `Degenerate` cells are kept where they are.
pub fn smooth_derived(series: &[Derived], window: usize) -> Vec<Derived> {
    let mut result = series.to_vec();
    let mut start = 0;
    while start < series.len() {
        if !series[start].is_computed() {
            start += 1;
            continue;
        }
        let end = series[start..]
            .iter()
            .position(|d| !d.is_computed())
            .map_or(series.len(), |offset| start + offset);
        let run = series[start..end]
            .iter()
            .filter_map(Derived::value)
            .collect::<Vec<f64>>();
        for (slot, smoothed) in result[start..end]
            .iter_mut()
            .zip(centered_moving_average(&run, window))
        {
            *slot = Derived::Computed(smoothed);
        }
        start = end;
    }
    result
}
