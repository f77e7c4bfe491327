//! Numeric stages of the tidy time-series pipeline.
//!
//! Joined records from `tidyts-core` are grouped and summed, differenced into
//! daily increments, smoothed, fitted with trend lines, and normalized per
//! calendar year. [`pipeline::Pipeline`] runs the stages in order.

pub mod aggregate;
pub mod pipeline;
pub mod rates;
pub mod smoothing;
pub mod trend;
pub mod yearly;
