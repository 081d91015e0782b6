//! Test run models
//!
//! Defines run status, individual test results, and the per-run record
//! with its aggregate summary.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::bundle::{TestBundle, TestSpec};
use super::database::Database;
use super::engine::CfmlEngine;

/// Status of a queue item, a run, or a single test
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Error,
    Skipped,
    /// Reported by the runner with a status string we do not recognize.
    /// Kept distinct: never coerced to Error or Passed.
    Unknown,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Pending => "·",
            TestStatus::Running => "»",
            TestStatus::Passed => "✓",
            TestStatus::Failed => "✗",
            TestStatus::Error => "!",
            TestStatus::Skipped => "○",
            TestStatus::Unknown => "?",
        }
    }

    /// Terminal statuses are final; no item re-enters Pending
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TestStatus::Pending | TestStatus::Running)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Passed)
    }

    /// Map a status string from a runner report onto the canonical enum.
    ///
    /// The comparison is case-sensitive on purpose: both historical report
    /// schemas emit capitalized statuses, and anything else is Unknown.
    pub fn from_report(s: &str) -> TestStatus {
        match s {
            "Passed" => TestStatus::Passed,
            "Failed" => TestStatus::Failed,
            "Error" => TestStatus::Error,
            "Skipped" => TestStatus::Skipped,
            _ => TestStatus::Unknown,
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pending => write!(f, "PENDING"),
            TestStatus::Running => write!(f, "RUNNING"),
            TestStatus::Passed => write!(f, "PASSED"),
            TestStatus::Failed => write!(f, "FAILED"),
            TestStatus::Error => write!(f, "ERROR"),
            TestStatus::Skipped => write!(f, "SKIPPED"),
            TestStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Failure detail attached to a failed or errored test
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestError {
    pub message: String,
    pub detail: Option<String>,
}

impl TestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Result of a single test within a run. Immutable once appended.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub name: String,
    pub status: TestStatus,
    pub duration_secs: f64,
    pub timestamp: DateTime<Utc>,
    pub error: Option<TestError>,
}

impl TestResult {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        status: TestStatus,
        duration_secs: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            duration_secs,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: TestError) -> Self {
        self.error = Some(error);
        self
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{:.3}s]", self.status.symbol(), self.name, self.duration_secs)?;
        if let Some(err) = &self.error {
            write!(f, " - {}", err.message)?;
        }
        Ok(())
    }
}

/// Aggregate counts for a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn new(total: usize, passed: usize, failed: usize, errors: usize, skipped: usize) -> Self {
        Self {
            total,
            passed,
            failed,
            errors,
            skipped,
        }
    }

    /// Count one result into the summary
    pub fn record(&mut self, status: TestStatus) {
        self.total += 1;
        match status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Error => self.errors += 1,
            TestStatus::Skipped => self.skipped += 1,
            _ => {}
        }
    }

    /// Tally a whole result set
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.record(result.status);
        }
        summary
    }

    /// Fold another summary into this one
    pub fn merge(&mut self, other: &RunSummary) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.errors += other.errors;
        self.skipped += other.skipped;
    }

    /// Counts must never exceed the total, and should equal it once the
    /// run has ended
    pub fn is_consistent(&self) -> bool {
        self.passed + self.failed + self.errors + self.skipped <= self.total
    }

    /// Run-level status derived from the counts
    pub fn run_status(&self) -> TestStatus {
        if self.failed > 0 || self.errors > 0 {
            TestStatus::Failed
        } else {
            TestStatus::Passed
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Error: {} | Skip: {}",
            self.total, self.passed, self.failed, self.errors, self.skipped
        )
    }
}

/// Record of executing one queue item, including all individual results
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestRun {
    pub id: String,
    pub engine: CfmlEngine,
    pub database: Database,
    pub bundle: TestBundle,
    pub spec: Option<TestSpec>,
    pub status: TestStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
    pub results: Vec<TestResult>,
    pub summary: RunSummary,
}

impl TestRun {
    /// Create a run in the Running state
    pub fn start(
        id: impl Into<String>,
        engine: CfmlEngine,
        database: Database,
        bundle: TestBundle,
        spec: Option<TestSpec>,
    ) -> Self {
        Self {
            id: id.into(),
            engine,
            database,
            bundle,
            spec,
            status: TestStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            duration_secs: None,
            results: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    /// Finish the run with a full result set; status derives from the counts
    pub fn complete(&mut self, results: Vec<TestResult>, summary: RunSummary) {
        self.results = results;
        self.summary = summary;
        self.status = summary.run_status();
        self.finish_clock();
    }

    /// Terminate the run with an execution-level failure: a single
    /// synthetic result carries the message, and the summary counts it as
    /// the run's one error.
    pub fn fail_with(&mut self, message: impl Into<String>, detail: Option<String>) {
        let message = message.into();
        let mut error = TestError::new(message);
        error.detail = detail;

        self.results = vec![
            TestResult::new("error", "Test execution failed", TestStatus::Error, 0.0)
                .with_error(error),
        ];
        self.summary = RunSummary::new(1, 0, 0, 1, 0);
        self.status = TestStatus::Error;
        self.finish_clock();
    }

    /// Mark the run skipped (queue stopped mid-run)
    pub fn mark_skipped(&mut self) {
        self.status = TestStatus::Skipped;
        self.finish_clock();
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn finish_clock(&mut self) {
        let end = Utc::now();
        self.end_time = Some(end);
        self.duration_secs = Some((end - self.start_time).num_milliseconds() as f64 / 1000.0);
    }
}

impl fmt::Display for TestRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} / {} / {} - {}",
            self.status.symbol(),
            self.engine.kind,
            self.database.kind,
            self.bundle,
            self.summary
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatabaseKind, EngineKind};

    fn sample_run() -> TestRun {
        TestRun::start(
            "lucee5_mysql_core_1",
            CfmlEngine::new(EngineKind::Lucee5),
            Database::new(DatabaseKind::MySql),
            TestBundle::Core,
            None,
        )
    }

    #[test]
    fn test_status_from_report_is_case_sensitive() {
        assert_eq!(TestStatus::from_report("Passed"), TestStatus::Passed);
        assert_eq!(TestStatus::from_report("Skipped"), TestStatus::Skipped);
        assert_eq!(TestStatus::from_report("passed"), TestStatus::Unknown);
        assert_eq!(TestStatus::from_report("OK"), TestStatus::Unknown);
    }

    #[test]
    fn test_unknown_is_terminal_but_not_success() {
        assert!(TestStatus::Unknown.is_terminal());
        assert!(!TestStatus::Unknown.is_success());
    }

    #[test]
    fn test_summary_tally() {
        let results = vec![
            TestResult::new("t1", "a", TestStatus::Passed, 0.1),
            TestResult::new("t2", "b", TestStatus::Failed, 0.2),
            TestResult::new("t3", "c", TestStatus::Skipped, 0.0),
        ];
        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(summary.is_consistent());
        assert_eq!(summary.run_status(), TestStatus::Failed);
    }

    #[test]
    fn test_complete_derives_status_and_clock() {
        let mut run = sample_run();
        let results = vec![TestResult::new("t1", "a", TestStatus::Passed, 0.1)];
        let summary = RunSummary::from_results(&results);
        run.complete(results, summary);

        assert_eq!(run.status, TestStatus::Passed);
        assert!(run.end_time.is_some());
        assert!(run.duration_secs.is_some());
        assert!(run.is_terminal());
    }

    #[test]
    fn test_fail_with_produces_single_error_result() {
        let mut run = sample_run();
        run.fail_with("Connection refused", Some("no route to host".to_string()));

        assert_eq!(run.status, TestStatus::Error);
        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].id, "error");
        assert_eq!(run.summary, RunSummary::new(1, 0, 0, 1, 0));
        assert!(run.end_time.is_some());
    }

    #[test]
    fn test_mark_skipped_sets_end_time() {
        let mut run = sample_run();
        run.mark_skipped();
        assert_eq!(run.status, TestStatus::Skipped);
        assert!(run.end_time.is_some());
    }
}
