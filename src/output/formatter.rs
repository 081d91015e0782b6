//! Output formatters for test runs
//!
//! Provides JSON, table, CSV, and summary output formats.

#![allow(dead_code)]

use std::io::Write;

use crate::models::{RunSummary, TestResult, TestRun, TestStatus};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Run formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
    /// Table output lists at most this many individual results; the
    /// full suite can run into the thousands
    max_rows: usize,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
            max_rows: 40,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Format one completed run
    pub fn format_run(&self, run: &TestRun) -> String {
        match self.format {
            OutputFormat::Table => self.format_run_table(run),
            OutputFormat::Json => serde_json::to_string(run).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(run).unwrap_or_default(),
            OutputFormat::Csv => self.format_run_csv(run),
            OutputFormat::Summary => self.format_run_brief(run),
        }
    }

    fn status_str(&self, status: TestStatus) -> String {
        let plain = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return plain;
        }
        match status {
            TestStatus::Passed => format!("\x1b[32m{plain}\x1b[0m"),
            TestStatus::Failed | TestStatus::Error => format!("\x1b[31m{plain}\x1b[0m"),
            TestStatus::Skipped => format!("\x1b[33m{plain}\x1b[0m"),
            _ => plain,
        }
    }

    fn format_result_row(&self, result: &TestResult) -> String {
        let mut row = format!(
            "{:9} {:50} [{:>7.3}s]",
            self.status_str(result.status),
            clip(&result.name, 50),
            result.duration_secs
        );
        if let Some(error) = &result.error {
            row.push_str(&format!("\n            {}", clip(&error.message, 60)));
        }
        row
    }

    fn format_run_table(&self, run: &TestRun) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!(
            "║  {:68} ║\n",
            format!("{} / {} / {}", run.engine.kind, run.database.kind, run.bundle)
        ));
        output.push_str(&format!("║  Run: {:63} ║\n", clip(&run.id, 63)));
        output.push_str("╠══════════════════════════════════════════════════════════════════════╣\n");

        for result in run.results.iter().take(self.max_rows) {
            for line in self.format_result_row(result).lines() {
                output.push_str(&format!("║  {:68} ║\n", line));
            }
        }
        if run.results.len() > self.max_rows {
            output.push_str(&format!(
                "║  … {:66} ║\n",
                format!("{} more results", run.results.len() - self.max_rows)
            ));
        }

        output.push_str("╠══════════════════════════════════════════════════════════════════════╣\n");
        output.push_str(&format!("║  {:68} ║\n", run.summary.to_string()));
        output.push_str(&format!(
            "║  {:68} ║\n",
            format!(
                "Status: {} | Pass Rate: {:.1}% | Duration: {:.1}s",
                run.status,
                run.summary.pass_rate(),
                run.duration_secs.unwrap_or(0.0)
            )
        ));
        output.push_str("╚══════════════════════════════════════════════════════════════════════╝\n");

        output
    }

    fn format_run_csv(&self, run: &TestRun) -> String {
        let mut output = String::new();
        output.push_str("test_id,test_name,status,duration_secs,error\n");
        for result in &run.results {
            output.push_str(&format!(
                "{},\"{}\",{},{:.3},\"{}\"\n",
                result.id,
                result.name.replace('"', "\"\""),
                result.status,
                result.duration_secs,
                result
                    .error
                    .as_ref()
                    .map(|e| e.message.replace('"', "\"\""))
                    .unwrap_or_default()
            ));
        }
        output
    }

    fn format_run_brief(&self, run: &TestRun) -> String {
        format!(
            "{} {} / {} / {}: {}/{} passed ({:.1}%) in {:.1}s",
            run.status.symbol(),
            run.engine.kind,
            run.database.kind,
            run.bundle,
            run.summary.passed,
            run.summary.total,
            run.summary.pass_rate(),
            run.duration_secs.unwrap_or(0.0)
        )
    }

    /// Format the aggregate summary across a set of runs
    pub fn format_aggregate(&self, runs: &[TestRun]) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                let mut summary = RunSummary::default();
                for run in runs {
                    summary.merge(&run.summary);
                }
                if self.format == OutputFormat::JsonPretty {
                    serde_json::to_string_pretty(&summary).unwrap_or_default()
                } else {
                    serde_json::to_string(&summary).unwrap_or_default()
                }
            }
            _ => self.format_aggregate_table(runs),
        }
    }

    fn format_aggregate_table(&self, runs: &[TestRun]) -> String {
        let mut output = String::new();

        output.push_str(
            "\n┌────────────────────────────────────────────────────────────────────────┐\n",
        );
        output.push_str(
            "│ Engine          │ Database    │ Bundle      │ Status   │ Pass Rate    │\n",
        );
        output.push_str(
            "├────────────────────────────────────────────────────────────────────────┤\n",
        );

        let mut total = RunSummary::default();
        for run in runs {
            total.merge(&run.summary);
            output.push_str(&format!(
                "│ {:15} │ {:11} │ {:11} │ {:8} │ {:>11.1}% │\n",
                run.engine.kind.to_string(),
                run.database.kind.to_string(),
                run.bundle.id(),
                run.status.to_string(),
                run.summary.pass_rate()
            ));
        }

        output.push_str(
            "├────────────────────────────────────────────────────────────────────────┤\n",
        );
        output.push_str(&format!("│ {:70} │\n", total.to_string()));
        output.push_str(
            "└────────────────────────────────────────────────────────────────────────┘\n",
        );

        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let clipped: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{clipped}…")
    }
}

/// Write a formatted run to a file
pub fn write_run_to_file(path: &str, run: &TestRun, format: OutputFormat) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_run(run);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CfmlEngine, Database, DatabaseKind, EngineKind, TestBundle, TestError,
    };

    fn sample_run() -> TestRun {
        let mut run = TestRun::start(
            "lucee5_mysql_core_1",
            CfmlEngine::new(EngineKind::Lucee5),
            Database::new(DatabaseKind::MySql),
            TestBundle::Core,
            None,
        );
        let results = vec![
            TestResult::new("t1", "save() should persist the object", TestStatus::Passed, 0.12),
            TestResult::new("t2", "update() should modify existing record", TestStatus::Failed, 0.3)
                .with_error(TestError::new("Expected [1] but got [0]")),
        ];
        let summary = RunSummary::from_results(&results);
        run.complete(results, summary);
        run
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TABLE"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("unknown"), None);
    }

    #[test]
    fn test_table_contains_results_and_counts() {
        let formatter = ResultFormatter::new(OutputFormat::Table).no_color();
        let output = formatter.format_run(&sample_run());

        assert!(output.contains("save() should persist the object"));
        assert!(output.contains("Expected [1] but got [0]"));
        assert!(output.contains("Total: 2"));
    }

    #[test]
    fn test_table_clips_long_result_lists() {
        let formatter = ResultFormatter::new(OutputFormat::Table).no_color().with_max_rows(1);
        let output = formatter.format_run(&sample_run());

        assert!(output.contains("1 more results"));
    }

    #[test]
    fn test_csv_escapes_quotes() {
        let mut run = sample_run();
        run.results[0].name = "handles \"quoted\" text".to_string();

        let formatter = ResultFormatter::new(OutputFormat::Csv);
        let output = formatter.format_run(&run);
        assert!(output.contains("\"handles \"\"quoted\"\" text\""));
    }

    #[test]
    fn test_brief_line() {
        let formatter = ResultFormatter::new(OutputFormat::Summary).no_color();
        let output = formatter.format_run(&sample_run());
        assert!(output.contains("1/2 passed"));
    }

    #[test]
    fn test_json_round_trips() {
        let formatter = ResultFormatter::new(OutputFormat::Json);
        let output = formatter.format_run(&sample_run());
        let parsed: TestRun = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.id, "lucee5_mysql_core_1");
    }

    #[test]
    fn test_aggregate_table_totals() {
        let formatter = ResultFormatter::new(OutputFormat::Table).no_color();
        let runs = vec![sample_run(), sample_run()];
        let output = formatter.format_aggregate(&runs);

        assert!(output.contains("Total: 4"));
    }
}
