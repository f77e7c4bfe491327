//! Shared utility functions for tidyts crates.

/// Date utility functions
pub mod dates {
    use crate::error::DateError;
    use chrono::{Datelike, NaiveDate};

    /// Two-digit-year form used by the dated column labels, e.g. "1/22/20".
    pub const SHORT_YEAR_FORMAT: &str = "%m/%d/%y";

    /// Four-digit-year form used by incident logs, e.g. "01/01/2006".
    pub const LONG_YEAR_FORMAT: &str = "%m/%d/%Y";

    /// Parse a source date label in "month/day/year" form.
    ///
    /// The year may have two or four digits; the format is picked from the
    /// width of the last component so "1/22/20" is 2020 and not year 20.
    pub fn parse_source_date(s: &str) -> Result<NaiveDate, DateError> {
        let label = s.trim();
        if label.matches('/').count() != 2 {
            return Err(DateError(format!("not a month/day/year label: {label:?}")));
        }
        let year_part = label.rsplit('/').next().unwrap_or_default();
        let format = match year_part.len() {
            2 => SHORT_YEAR_FORMAT,
            4 => LONG_YEAR_FORMAT,
            _ => {
                return Err(DateError(format!(
                    "year must have 2 or 4 digits: {label:?}"
                )))
            }
        };
        NaiveDate::parse_from_str(label, format).map_err(|e| DateError(format!("{label:?}: {e}")))
    }

    /// Integer encoding of a date used as the explanatory variable of a trend fit.
    /// Day 1 is January 1 of year 1 (proleptic Gregorian).
    pub fn ordinal_date(date: &NaiveDate) -> i32 {
        date.num_days_from_ce()
    }

    /// Calendar year and 1-based day of year (1..=366).
    pub fn year_and_day(date: &NaiveDate) -> (i32, u32) {
        (date.year(), date.ordinal())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_parse_short_year() {
            let parsed = parse_source_date("1/22/20").unwrap();
            assert_eq!(parsed, NaiveDate::from_ymd_opt(2020, 1, 22).unwrap());
        }

        #[test]
        fn test_parse_long_year() {
            let parsed = parse_source_date("01/01/2006").unwrap();
            assert_eq!(parsed, NaiveDate::from_ymd_opt(2006, 1, 1).unwrap());

            let parsed = parse_source_date("12/31/2021").unwrap();
            assert_eq!(parsed, NaiveDate::from_ymd_opt(2021, 12, 31).unwrap());
        }

        #[test]
        fn test_parse_rejects_non_dates() {
            assert!(parse_source_date("Lat").is_err());
            assert!(parse_source_date("Province/State").is_err());
            assert!(parse_source_date("2020-01-22").is_err());
            assert!(parse_source_date("13/01/20").is_err());
            assert!(parse_source_date("1/22/020").is_err());
        }

        #[test]
        fn test_ordinal_date() {
            let jan1 = NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
            assert_eq!(ordinal_date(&jan1), 1);

            let a = NaiveDate::from_ymd_opt(2020, 2, 28).unwrap();
            let b = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
            assert_eq!(ordinal_date(&b) - ordinal_date(&a), 2);
        }

        #[test]
        fn test_year_and_day() {
            let jan1 = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
            assert_eq!(year_and_day(&jan1), (2021, 1));

            let dec31_leap = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
            assert_eq!(year_and_day(&dec31_leap), (2020, 366));
        }
    }
}

/// Error types
pub mod error {
    use std::fmt;

    #[derive(Debug, Clone, PartialEq)]
    pub struct DateError(pub String);

    impl fmt::Display for DateError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Date error: {}", self.0)
        }
    }

    impl std::error::Error for DateError {}
}
