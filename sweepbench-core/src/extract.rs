//! Metric Extraction
//!
//! Turns the unstructured text printed by a benchmark run into typed metrics.
//!
//! Extraction is table driven. An [`ExtractionProfile`] holds one
//! [`MetricRule`] per metric, and each rule says how repeated matches combine:
//!
//! - [`MatchMode::FirstMatch`]: the first line that yields a value wins. Later
//!   lines (periodic progress reports, repeated summaries) never overwrite it.
//! - [`MatchMode::Accumulate`]: every matching line adds to a running total.
//!
//! Lines are scanned independently and each rule is tried at most once per
//! line. The numeric value is read from the last capture group of the pattern.
//! A missing match is not an error: scalar metrics stay `None` and the error
//! count stays at zero.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `tps = 1234.5 (without initial connection time)`
pub const THROUGHPUT_PATTERN: &str = r"tps\s*=\s*([0-9]+(?:\.[0-9]+)?)";
/// `latency average = 3.241 ms`
pub const LATENCY_MEAN_PATTERN: &str = r"latency average\s*=\s*([0-9]+(?:\.[0-9]+)?)\s*ms";
/// `latency stddev = 1.027 ms`
pub const LATENCY_STDDEV_PATTERN: &str = r"latency stddev\s*=\s*([0-9]+(?:\.[0-9]+)?)\s*ms";
/// `number of serialization failures: 3`, `deadlocks: 1`, `errors: 2`
pub const ERRORS_PATTERN: &str =
    r"(?i)\b(errors|serialization failures|deadlocks)\b.*?:\s*([0-9]+)";

/// Errors raised while building an extraction profile
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid pattern for {metric}: {source}")]
    InvalidPattern {
        metric: MetricKind,
        #[source]
        source: regex::Error,
    },

    #[error("Pattern for {metric} has no capture group: {pattern}")]
    MissingCapture { metric: MetricKind, pattern: String },
}

/// Metrics a profile can extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Transactions per second
    Throughput,
    /// Mean latency in milliseconds
    LatencyMean,
    /// Latency standard deviation in milliseconds
    LatencyStddev,
    /// Failed transactions (errors, serialization failures, deadlocks)
    Errors,
}

impl MetricKind {
    /// All metrics in extraction order
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Throughput,
        MetricKind::LatencyMean,
        MetricKind::LatencyStddev,
        MetricKind::Errors,
    ];

    /// Stable identifier used in configuration and logs
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Throughput => "throughput",
            MetricKind::LatencyMean => "latency_mean",
            MetricKind::LatencyStddev => "latency_stddev",
            MetricKind::Errors => "errors",
        }
    }

    /// Combination rule used by the default profile
    pub fn default_mode(self) -> MatchMode {
        match self {
            MetricKind::Errors => MatchMode::Accumulate,
            _ => MatchMode::FirstMatch,
        }
    }

    /// Pattern used by the default (pgbench) profile
    pub fn default_pattern(self) -> &'static str {
        match self {
            MetricKind::Throughput => THROUGHPUT_PATTERN,
            MetricKind::LatencyMean => LATENCY_MEAN_PATTERN,
            MetricKind::LatencyStddev => LATENCY_STDDEV_PATTERN,
            MetricKind::Errors => ERRORS_PATTERN,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How repeated matches of one rule combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Keep the first value found, ignore the rest
    FirstMatch,
    /// Sum every value found
    Accumulate,
}

/// Metrics extracted from one run's output.
///
/// Scalar metrics are present-or-absent: a missing match is `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Transactions per second
    pub throughput: Option<f64>,
    /// Mean latency (ms)
    pub latency_mean_ms: Option<f64>,
    /// Latency standard deviation (ms)
    pub latency_stddev_ms: Option<f64>,
    /// Cumulative count of failure-indicator lines
    pub errors: u64,
}

impl Metrics {
    fn scalar_mut(&mut self, metric: MetricKind) -> Option<&mut Option<f64>> {
        match metric {
            MetricKind::Throughput => Some(&mut self.throughput),
            MetricKind::LatencyMean => Some(&mut self.latency_mean_ms),
            MetricKind::LatencyStddev => Some(&mut self.latency_stddev_ms),
            MetricKind::Errors => None,
        }
    }
}

/// A named pattern and its combination rule
#[derive(Debug, Clone)]
pub struct MetricRule {
    metric: MetricKind,
    pattern: Regex,
    mode: MatchMode,
}

impl MetricRule {
    /// Compile a rule. The pattern must contain at least one capture group.
    pub fn new(metric: MetricKind, pattern: &str, mode: MatchMode) -> Result<Self, ExtractError> {
        let pattern =
            Regex::new(pattern).map_err(|source| ExtractError::InvalidPattern { metric, source })?;

        // captures_len counts the implicit whole-match group
        if pattern.captures_len() < 2 {
            return Err(ExtractError::MissingCapture {
                metric,
                pattern: pattern.as_str().to_string(),
            });
        }

        Ok(Self {
            metric,
            pattern,
            mode,
        })
    }

    /// Metric this rule fills
    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    /// Combination rule
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Source text of the pattern
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Numeric text captured from `line`, if the pattern matches
    fn capture<'a>(&self, line: &'a str) -> Option<&'a str> {
        let caps = self.pattern.captures(line)?;
        caps.get(caps.len() - 1).map(|m| m.as_str())
    }

    /// Apply this rule to one line. Returns `true` when a value was taken.
    fn apply(&self, line: &str, metrics: &mut Metrics, seen: bool) -> bool {
        if seen && self.mode == MatchMode::FirstMatch {
            return false;
        }
        let Some(text) = self.capture(line) else {
            return false;
        };

        match metrics.scalar_mut(self.metric) {
            Some(slot) => {
                let Ok(value) = text.parse::<f64>() else {
                    return false;
                };
                *slot = match (self.mode, *slot) {
                    (MatchMode::Accumulate, Some(total)) => Some(total + value),
                    _ => Some(value),
                };
            }
            None => {
                // Overflowing counts are malformed and skipped
                let Ok(value) = text.parse::<u64>() else {
                    return false;
                };
                metrics.errors = match self.mode {
                    MatchMode::Accumulate => metrics.errors.saturating_add(value),
                    MatchMode::FirstMatch => value,
                };
            }
        }
        true
    }
}

/// Pattern overrides loaded from configuration. `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOverrides {
    /// Throughput pattern
    #[serde(default)]
    pub throughput: Option<String>,
    /// Mean latency pattern
    #[serde(default)]
    pub latency_mean: Option<String>,
    /// Latency stddev pattern
    #[serde(default)]
    pub latency_stddev: Option<String>,
    /// Failure-indicator pattern
    #[serde(default)]
    pub errors: Option<String>,
}

impl ExtractOverrides {
    fn get(&self, metric: MetricKind) -> Option<&str> {
        match metric {
            MetricKind::Throughput => self.throughput.as_deref(),
            MetricKind::LatencyMean => self.latency_mean.as_deref(),
            MetricKind::LatencyStddev => self.latency_stddev.as_deref(),
            MetricKind::Errors => self.errors.as_deref(),
        }
    }
}

/// Table of extraction rules applied to benchmark output
#[derive(Debug, Clone)]
pub struct ExtractionProfile {
    rules: Vec<MetricRule>,
}

impl ExtractionProfile {
    /// Build a profile from an explicit rule table
    pub fn new(rules: Vec<MetricRule>) -> Self {
        Self { rules }
    }

    /// Default profile for pgbench output
    pub fn pgbench() -> Result<Self, ExtractError> {
        Self::with_overrides(&ExtractOverrides::default())
    }

    /// Default profile with individual patterns replaced
    pub fn with_overrides(overrides: &ExtractOverrides) -> Result<Self, ExtractError> {
        let rules = MetricKind::ALL
            .iter()
            .map(|&metric| {
                let pattern = overrides
                    .get(metric)
                    .unwrap_or_else(|| metric.default_pattern());
                MetricRule::new(metric, pattern, metric.default_mode())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Rules in application order
    pub fn rules(&self) -> &[MetricRule] {
        &self.rules
    }

    /// Extract metrics from a run's output. Pure: identical text always
    /// yields identical metrics.
    pub fn extract(&self, text: &str) -> Metrics {
        let mut metrics = Metrics::default();
        let mut seen = [false; MetricKind::ALL.len()];

        for line in text.lines() {
            for rule in &self.rules {
                let idx = rule.metric.index();
                if rule.apply(line, &mut metrics, seen[idx]) {
                    seen[idx] = true;
                }
            }
        }

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PGBENCH_OUTPUT: &str = "\
pgbench (16.2)
progress: 5.0 s, 812.4 tps, lat 9.812 ms stddev 2.101, 0 failed
progress: 10.0 s, 845.0 tps, lat 9.450 ms stddev 1.998, 0 failed
transaction type: timeline.sql
scaling factor: 1
query mode: prepared
number of clients: 8
number of threads: 1
duration: 10 s
number of transactions actually processed: 8290
number of failed transactions: 0 (0.000%)
latency average = 9.631 ms
latency stddev = 2.050 ms
initial connection time = 12.114 ms
tps = 828.776215 (without initial connection time)
";

    fn profile() -> ExtractionProfile {
        ExtractionProfile::pgbench().unwrap()
    }

    #[test]
    fn test_full_pgbench_summary() {
        let metrics = profile().extract(PGBENCH_OUTPUT);
        assert_eq!(metrics.throughput, Some(828.776215));
        assert_eq!(metrics.latency_mean_ms, Some(9.631));
        assert_eq!(metrics.latency_stddev_ms, Some(2.050));
        assert_eq!(metrics.errors, 0);
    }

    #[test]
    fn test_throughput_exact_value() {
        let metrics = profile().extract("tps = 1234.5 (without initial connection time)");
        assert_eq!(metrics.throughput, Some(1234.5));
    }

    #[test]
    fn test_integer_throughput() {
        let metrics = profile().extract("tps = 77");
        assert_eq!(metrics.throughput, Some(77.0));
    }

    #[test]
    fn test_missing_latency_is_absent() {
        let metrics = profile().extract("tps = 10.0\nsomething else entirely\n");
        assert_eq!(metrics.latency_mean_ms, None);
        assert_eq!(metrics.latency_stddev_ms, None);
    }

    #[test]
    fn test_first_match_wins() {
        let metrics = profile().extract("tps = 10.0\nlatency average = 1.5 ms\ntps = 999.0\n");
        assert_eq!(metrics.throughput, Some(10.0));
    }

    #[test]
    fn test_errors_accumulate_across_lines() {
        let text = "errors: 3\ndeadlocks: 2\n";
        assert_eq!(profile().extract(text).errors, 5);
    }

    #[test]
    fn test_errors_case_insensitive_categories() {
        let text = "\
number of serialization failures: 4 (0.1%)
Deadlocks: 1
ERRORS: 2
";
        assert_eq!(profile().extract(text).errors, 7);
    }

    #[test]
    fn test_errors_default_to_zero() {
        let metrics = profile().extract("tps = 5.0\n");
        assert_eq!(metrics.errors, 0);
    }

    #[test]
    fn test_malformed_error_count_skipped() {
        // Does not fit in u64, skipped without aborting the scan
        let text = "errors: 99999999999999999999999\ndeadlocks: 2\ntps = 3.0\n";
        let metrics = profile().extract(text);
        assert_eq!(metrics.errors, 2);
        assert_eq!(metrics.throughput, Some(3.0));
    }

    #[test]
    fn test_progress_lines_do_not_match_throughput() {
        let text = "progress: 5.0 s, 812.4 tps, lat 9.812 ms stddev 2.101\n";
        assert_eq!(profile().extract(text).throughput, None);
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(profile().extract(""), Metrics::default());
    }

    #[test]
    fn test_extract_is_idempotent() {
        let p = profile();
        assert_eq!(p.extract(PGBENCH_OUTPUT), p.extract(PGBENCH_OUTPUT));
    }

    #[test]
    fn test_default_rule_table() {
        let p = profile();
        let table: Vec<_> = p.rules().iter().map(|r| (r.metric(), r.mode())).collect();
        assert_eq!(
            table,
            vec![
                (MetricKind::Throughput, MatchMode::FirstMatch),
                (MetricKind::LatencyMean, MatchMode::FirstMatch),
                (MetricKind::LatencyStddev, MatchMode::FirstMatch),
                (MetricKind::Errors, MatchMode::Accumulate),
            ]
        );
        assert_eq!(p.rules()[0].pattern(), THROUGHPUT_PATTERN);
        assert_eq!(p.rules()[3].pattern(), ERRORS_PATTERN);
    }

    #[test]
    fn test_override_pattern() {
        let overrides = ExtractOverrides {
            throughput: Some(r"throughput:\s*([0-9.]+)".to_string()),
            ..Default::default()
        };
        let p = ExtractionProfile::with_overrides(&overrides).unwrap();
        assert_eq!(p.rules()[0].pattern(), r"throughput:\s*([0-9.]+)");
        assert_eq!(p.rules()[1].pattern(), LATENCY_MEAN_PATTERN);
        let metrics = p.extract("tps = 1.0\nthroughput: 42.5\n");
        assert_eq!(metrics.throughput, Some(42.5));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let overrides = ExtractOverrides {
            latency_mean: Some("latency (".to_string()),
            ..Default::default()
        };
        let err = ExtractionProfile::with_overrides(&overrides).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::InvalidPattern {
                metric: MetricKind::LatencyMean,
                ..
            }
        ));
    }

    #[test]
    fn test_pattern_without_capture_rejected() {
        let err = MetricRule::new(MetricKind::Throughput, "tps", MatchMode::FirstMatch).unwrap_err();
        assert!(matches!(err, ExtractError::MissingCapture { .. }));
    }

    #[test]
    fn test_accumulating_scalar_rule() {
        let rule =
            MetricRule::new(MetricKind::Throughput, r"batch tps=([0-9.]+)", MatchMode::Accumulate)
                .unwrap();
        let p = ExtractionProfile::new(vec![rule]);
        let metrics = p.extract("batch tps=1.5\nbatch tps=2.5\n");
        assert_eq!(metrics.throughput, Some(4.0));
    }

    #[test]
    fn test_first_match_skips_unparseable_capture() {
        // Capture "1.2.3" is not a float, the next line supplies the value
        let rule =
            MetricRule::new(MetricKind::LatencyMean, r"lat=([0-9.]+)", MatchMode::FirstMatch)
                .unwrap();
        let p = ExtractionProfile::new(vec![rule]);
        let metrics = p.extract("lat=1.2.3\nlat=4.5\n");
        assert_eq!(metrics.latency_mean_ms, Some(4.5));
    }
}
