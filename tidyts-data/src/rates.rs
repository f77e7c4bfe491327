//! Population-scaled rates.

use tidyts_core::Derived;

/// Default multiplier: rates are reported per 100 000 people.
pub const PER_CAPITA_SCALE: f64 = 100_000.0;

/// `cumulative / population * scale`.
///
/// `Undefined` when the population is unknown or not positive.
pub fn per_capita(cumulative: f64, population: Option<f64>, scale: f64) -> Derived {
    population
        .filter(|p| *p > 0.0)
        .map(|p| cumulative / p * scale)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_per_capita() {
        let rate = per_capita(50.0, Some(1_000_000.0), PER_CAPITA_SCALE);
        assert_relative_eq!(rate.value().unwrap(), 5.0);
        assert_eq!(per_capita(3.0, Some(10.0), 1.0), Derived::Computed(0.3));
    }

    #[test]
    fn test_missing_or_zero_population() {
        assert_eq!(per_capita(50.0, None, PER_CAPITA_SCALE), Derived::Undefined);
        assert_eq!(per_capita(50.0, Some(0.0), PER_CAPITA_SCALE), Derived::Undefined);
        assert_eq!(per_capita(50.0, Some(-1.0), PER_CAPITA_SCALE), Derived::Undefined);
    }
}
