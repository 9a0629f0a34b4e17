//! JSON Output

use crate::aggregate::AggregateReport;

/// Generate a prettified JSON aggregate report.
pub fn generate_json_report(report: &AggregateReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
