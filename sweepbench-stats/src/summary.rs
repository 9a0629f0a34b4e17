//! Summary Statistics
//!
//! Repetition counts in a sweep are small (usually 1-10 runs per point), so
//! no outlier rejection is applied: every observed value contributes.

use crate::percentiles::compute_percentile;
use serde::{Deserialize, Serialize};

/// Summary of the observed values for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Arithmetic mean
    pub mean: f64,
    /// Median (interpolated)
    pub median: f64,
    /// Sample standard deviation (0 for fewer than two values)
    pub std_dev: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Number of values
    pub count: usize,
}

/// Compute summary statistics, or `None` when nothing was observed
pub fn compute_summary(samples: &[f64]) -> Option<SummaryStatistics> {
    let mean = mean_of(samples)?;
    let median = compute_percentile(samples, 50.0)?;

    let std_dev = if samples.len() < 2 {
        0.0
    } else {
        let variance =
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (samples.len() - 1) as f64;
        variance.sqrt()
    };

    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(SummaryStatistics {
        mean,
        median,
        std_dev,
        min,
        max,
        count: samples.len(),
    })
}

/// Arithmetic mean, or `None` for an empty slice
pub fn mean_of(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}
