//! Core types for the tidy time-series pipeline.
//!
//! Raw tables come in two shapes: wide dated-column tables (one column per
//! calendar date) and incident logs (one event per row). This crate turns them
//! into typed observations and joins several sources into combined records.
//! Numeric analysis lives in `tidyts-data`.

pub mod derived;
pub mod error;
pub mod incident;
pub mod join;
pub mod lookup;
pub mod observation;
pub mod reshape;
pub mod wide_table;

pub use derived::Derived;
pub use error::{Result, TidyError};
pub use observation::{Identity, MetricSeries, Observation};
