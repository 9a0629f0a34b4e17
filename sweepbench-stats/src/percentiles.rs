//! Percentile Computation

/// Compute a single percentile from samples
///
/// Uses linear interpolation between nearest ranks. Returns `None` for an
/// empty slice.
pub fn compute_percentile(samples: &[f64], percentile: f64) -> Option<f64> {
    match samples {
        [] => None,
        [only] => Some(*only),
        _ => {
            let mut sorted = samples.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let n = sorted.len();
            let p = (percentile / 100.0).clamp(0.0, 1.0);

            // Linear interpolation between nearest ranks
            let rank = p * (n - 1) as f64;
            let lower_idx = rank.floor() as usize;
            let upper_idx = (lower_idx + 1).min(n - 1);
            let fraction = rank - lower_idx as f64;

            Some(sorted[lower_idx] + fraction * (sorted[upper_idx] - sorted[lower_idx]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let p50 = compute_percentile(&samples, 50.0).unwrap();
        assert!((p50 - 3.0).abs() < 0.01);
    }

    #[test]
    fn test_even_median_interpolates() {
        let samples = vec![4.0, 1.0, 3.0, 2.0];
        let p50 = compute_percentile(&samples, 50.0).unwrap();
        assert!((p50 - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quartiles() {
        let samples: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let p25 = compute_percentile(&samples, 25.0).unwrap();
        let p75 = compute_percentile(&samples, 75.0).unwrap();

        assert!((p25 - 25.75).abs() < 1.0);
        assert!((p75 - 75.25).abs() < 1.0);
    }

    #[test]
    fn test_single_sample() {
        let p50 = compute_percentile(&[42.0], 50.0).unwrap();
        assert!((p50 - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_samples() {
        assert_eq!(compute_percentile(&[], 50.0), None);
    }
}
