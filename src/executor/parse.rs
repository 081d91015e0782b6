//! Runner report parsing
//!
//! The test runner endpoint has emitted two JSON shapes over its life: a
//! flat `results` array, and the nested `bundleStats` tree. Engines that
//! return neither may still carry top-level totals. All three map onto
//! the same canonical result set; anything else is a schema error the
//! executor turns into a terminal Error run.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::models::{RunSummary, TestError, TestResult, TestStatus};

/// Report parsing errors
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Response body is not JSON: {0}")]
    NotJson(String),

    #[error("Response JSON matches no known report shape")]
    UnrecognizedShape,
}

/// Canonical view of one runner report
#[derive(Clone, Debug)]
pub struct ParsedReport {
    pub results: Vec<TestResult>,
    pub summary: RunSummary,
}

/// Parse a runner response body.
///
/// Shapes are tried in order: flat `results[]`, nested
/// `bundleStats[].suiteStats[].specStats[]`, then summary-only totals.
pub fn parse_report(body: &str) -> Result<ParsedReport, ReportError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ReportError::NotJson(e.to_string()))?;

    let obj = value.as_object().ok_or(ReportError::UnrecognizedShape)?;

    if let Some(results) = obj.get("results").and_then(Value::as_array) {
        let results = parse_flat_results(results);
        let summary = summary_for(&results, &value);
        return Ok(ParsedReport { results, summary });
    }

    if let Some(bundles) = obj.get("bundleStats").and_then(Value::as_array) {
        let results = parse_bundle_stats(bundles);
        let summary = summary_for(&results, &value);
        return Ok(ParsedReport { results, summary });
    }

    if let Some(summary) = extract_summary(&value) {
        return Ok(ParsedReport {
            results: Vec::new(),
            summary,
        });
    }

    Err(ReportError::UnrecognizedShape)
}

/// Summary for a parsed result set: tally when results exist, otherwise
/// fall back to the report's own totals.
fn summary_for(results: &[TestResult], report: &Value) -> RunSummary {
    if results.is_empty() {
        extract_summary(report).unwrap_or_default()
    } else {
        RunSummary::from_results(results)
    }
}

/// Legacy flat shape: `{"results": [{id, name, status, duration, ...}]}`
fn parse_flat_results(entries: &[Value]) -> Vec<TestResult> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let id = string_field(entry, &["id"]).unwrap_or_else(|| format!("test_{i}"));
            let name = string_field(entry, &["name"]).unwrap_or_else(|| id.clone());
            let status = entry
                .get("status")
                .and_then(Value::as_str)
                .map(TestStatus::from_report)
                .unwrap_or(TestStatus::Unknown);
            let duration = number_field(entry, &["duration"]).unwrap_or(0.0);

            let mut result = TestResult::new(id, name, status, duration);
            if let Some(ts) = timestamp_field(entry) {
                result.timestamp = ts;
            }
            if let Some(error) = parse_error(entry) {
                result = result.with_error(error);
            }
            result
        })
        .collect()
}

/// Modern nested shape: `bundleStats[].suiteStats[].specStats[]`
fn parse_bundle_stats(bundles: &[Value]) -> Vec<TestResult> {
    let mut results = Vec::new();

    for bundle in bundles {
        let suites = match bundle.get("suiteStats").and_then(Value::as_array) {
            Some(suites) => suites,
            None => continue,
        };

        for suite in suites {
            let specs = match suite.get("specStats").and_then(Value::as_array) {
                Some(specs) => specs,
                None => continue,
            };

            for spec in specs {
                let name = string_field(spec, &["displayName", "name"])
                    .unwrap_or_else(|| format!("spec_{}", results.len()));
                let id = string_field(spec, &["id"]).unwrap_or_else(|| name.clone());
                let status = spec
                    .get("status")
                    .and_then(Value::as_str)
                    .map(TestStatus::from_report)
                    .unwrap_or(TestStatus::Unknown);

                // totalDuration is reported in milliseconds
                let duration = number_field(spec, &["totalDuration"])
                    .map(|ms| ms / 1000.0)
                    .or_else(|| number_field(spec, &["duration"]))
                    .unwrap_or(0.0);

                let mut result = TestResult::new(id, name, status, duration);
                if let Some(error) = parse_error(spec) {
                    result = result.with_error(error);
                }
                results.push(result);
            }
        }
    }

    results
}

/// Map the heterogeneous top-level count fields onto one canonical
/// summary. `passed` is computed from the other counts when no explicit
/// passed field exists.
fn extract_summary(report: &Value) -> Option<RunSummary> {
    let total = count_field(report, &["totalSpecs", "totalExecuted", "total"])?;
    let failed = count_field(report, &["totalFail", "totalFailed", "failed"]).unwrap_or(0);
    let errors = count_field(report, &["totalError", "totalErrors", "errors"]).unwrap_or(0);
    let skipped = count_field(report, &["totalSkipped", "totalSkip", "skipped"]).unwrap_or(0);

    let passed = count_field(report, &["totalPass", "totalPassed", "passed"])
        .unwrap_or_else(|| total.saturating_sub(failed + errors + skipped));

    Some(RunSummary::new(total, passed, failed, errors, skipped))
}

fn parse_error(entry: &Value) -> Option<TestError> {
    // Nested error object first, then the flat failMessage pair
    if let Some(error) = entry.get("error").and_then(Value::as_object) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        let detail = error
            .get("detail")
            .and_then(Value::as_str)
            .map(str::to_string);
        let mut err = TestError::new(message);
        err.detail = detail;
        return Some(err);
    }

    let message = string_field(entry, &["failMessage"])?;
    if message.is_empty() {
        return None;
    }
    let detail = string_field(entry, &["failDetail", "failStacktrace"]);
    let mut err = TestError::new(message);
    err.detail = detail;
    Some(err)
}

fn string_field(entry: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match entry.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn number_field(entry: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| entry.get(key).and_then(Value::as_f64))
}

fn count_field(entry: &Value, keys: &[&str]) -> Option<usize> {
    keys.iter()
        .find_map(|key| entry.get(key).and_then(Value::as_u64))
        .map(|n| n as usize)
}

fn timestamp_field(entry: &Value) -> Option<DateTime<Utc>> {
    entry
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
