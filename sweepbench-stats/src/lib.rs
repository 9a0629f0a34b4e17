#![warn(missing_docs)]
//! SweepBench Statistics
//!
//! Summarises repeated measurements of one configuration point:
//! - Mean, median and sample standard deviation
//! - Min/max extremes
//! - Percentiles by linear interpolation
//!
//! Absent measurements are filtered out by the caller; statistics are only
//! ever computed over values that were actually observed.

mod percentiles;
mod summary;

pub use percentiles::compute_percentile;
pub use summary::{SummaryStatistics, compute_summary, mean_of};
