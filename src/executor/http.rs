//! HTTP executor
//!
//! Runs one combination against the engine's test runner endpoint and
//! maps the response onto a completed run. Every failure mode — network,
//! timeout, malformed body, unknown report shape — ends in a terminal
//! Error-status run; the queue is never aborted by an executor.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::parse::parse_report;
use super::{CancelFlag, TestExecutor};
use crate::http::HttpClient;
use crate::models::TestRun;

/// Runner endpoint configuration
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Path of the test runner on the engine
    pub runner_path: String,

    /// Execution order passed to the runner
    pub sort: String,

    /// Server-side runner budget in seconds, also the `timeout` query
    /// parameter
    pub timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            runner_path: "/wheels/testbox".to_string(),
            sort: "directory asc".to_string(),
            timeout_secs: 1800,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }
}

/// Executor backed by the engine's HTTP test runner
pub struct HttpExecutor {
    config: RunnerConfig,
    client: HttpClient,
}

impl HttpExecutor {
    pub fn new(config: RunnerConfig) -> Result<Self> {
        // The client timeout trails the runner budget so the runner can
        // report its own timeout instead of the socket closing first.
        let client = HttpClient::with_timeout(config.timeout_secs + 10)?;
        Ok(Self { config, client })
    }

    /// Runner URL for a combination
    fn runner_url(&self, run: &TestRun) -> String {
        format!("{}{}", run.engine.base_url(), self.config.runner_path)
    }

    /// Query parameters for a combination
    fn query_params(&self, run: &TestRun) -> Vec<(String, String)> {
        let mut params = vec![
            ("format".to_string(), "json".to_string()),
            ("sort".to_string(), self.config.sort.clone()),
            ("db".to_string(), run.database.runner_param()),
            ("timeout".to_string(), self.config.timeout_secs.to_string()),
        ];

        if run.bundle.is_subset() {
            params.push(("testBundles".to_string(), run.bundle.id().to_string()));
        }
        if let Some(spec) = &run.spec {
            params.push(("testSpecs".to_string(), spec.id.clone()));
        }

        params
    }
}

#[async_trait]
impl TestExecutor for HttpExecutor {
    async fn execute(&self, mut run: TestRun, cancel: &CancelFlag) -> TestRun {
        if cancel.is_cancelled() {
            run.mark_skipped();
            return run;
        }

        let url = self.runner_url(&run);
        let params = self.query_params(&run);

        info!(
            "Running {} on {} against {}",
            run.bundle,
            run.engine.kind,
            run.database.kind
        );
        debug!("Runner URL: {url}");

        let response = match self.client.get_with_query(&url, &params).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Runner request failed: {e:#}");
                run.fail_with(e.to_string(), Some(format!("{e:#}")));
                return run;
            }
        };

        if cancel.is_cancelled() {
            run.mark_skipped();
            return run;
        }

        if !response.is_success() {
            warn!("Runner returned HTTP {}", response.status_code);
            run.fail_with(
                format!("Test runner returned HTTP {}", response.status_code),
                Some(truncate(&response.body, 2000)),
            );
            return run;
        }

        match parse_report(&response.body) {
            Ok(report) => {
                run.complete(report.results, report.summary);
            }
            Err(e) => {
                warn!("Unusable runner report: {e}");
                run.fail_with(e.to_string(), Some(truncate(&response.body, 2000)));
            }
        }

        run
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CfmlEngine, Database, DatabaseKind, EngineKind, TestBundle, TestSpec};

    fn running(bundle: TestBundle, spec: Option<TestSpec>) -> TestRun {
        TestRun::start(
            "lucee5_mysql_core_1",
            CfmlEngine::new(EngineKind::Lucee5),
            Database::new(DatabaseKind::MySql),
            bundle,
            spec,
        )
    }

    #[test]
    fn test_runner_url_and_params() {
        let executor = HttpExecutor::new(RunnerConfig::default()).unwrap();
        let run = running(TestBundle::Core, None);

        assert_eq!(
            executor.runner_url(&run),
            "http://localhost:60005/wheels/testbox"
        );

        let params = executor.query_params(&run);
        assert!(params.contains(&("format".to_string(), "json".to_string())));
        assert!(params.contains(&("db".to_string(), "mysql".to_string())));
        assert!(params.contains(&("timeout".to_string(), "1800".to_string())));
        assert!(params.contains(&("testBundles".to_string(), "core".to_string())));
    }

    #[test]
    fn test_all_bundle_omits_bundles_param() {
        let executor = HttpExecutor::new(RunnerConfig::default()).unwrap();
        let run = running(TestBundle::All, None);

        let params = executor.query_params(&run);
        assert!(!params.iter().any(|(k, _)| k == "testBundles"));
    }

    #[test]
    fn test_spec_param_included() {
        let executor = HttpExecutor::new(RunnerConfig::default()).unwrap();
        let spec = TestSpec::new("validation", "Validation", TestBundle::Model);
        let run = running(TestBundle::Model, Some(spec));

        let params = executor.query_params(&run);
        assert!(params.contains(&("testSpecs".to_string(), "validation".to_string())));
    }

    #[tokio::test]
    async fn test_cancelled_before_request_skips() {
        let executor = HttpExecutor::new(RunnerConfig::default()).unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let done = executor.execute(running(TestBundle::Core, None), &cancel).await;
        assert_eq!(done.status, crate::models::TestStatus::Skipped);
        assert!(done.end_time.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_engine_yields_error_run() {
        // Nothing listens on this port; the connect fails fast.
        let config = RunnerConfig::default().with_timeout(1);
        let executor = HttpExecutor::new(config).unwrap();
        let mut run = running(TestBundle::Core, None);
        run.engine = CfmlEngine::new(EngineKind::Lucee5).with_host("127.0.0.1").with_port(1);

        let done = executor.execute(run, &CancelFlag::new()).await;
        assert_eq!(done.status, crate::models::TestStatus::Error);
        assert_eq!(done.results.len(), 1);
        assert_eq!(done.results[0].id, "error");
        assert_eq!(done.summary.total, 1);
        assert_eq!(done.summary.errors, 1);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "ab✓cd";
        let t = truncate(s, 3);
        assert!(t.starts_with("ab"));
    }

    /// One-shot HTTP stub returning a canned body on any request
    async fn stub_runner(body: &'static str) -> u16 {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });

        port
    }

    #[tokio::test]
    async fn test_valid_report_completes_the_run() {
        let port = stub_runner(r#"{"totalSpecs": 4, "totalPass": 4}"#).await;

        let executor = HttpExecutor::new(RunnerConfig::default().with_timeout(5)).unwrap();
        let mut run = running(TestBundle::Core, None);
        run.engine = CfmlEngine::new(EngineKind::Lucee5).with_host("127.0.0.1").with_port(port);

        let done = executor.execute(run, &CancelFlag::new()).await;
        assert_eq!(done.status, crate::models::TestStatus::Passed);
        assert_eq!(done.summary.total, 4);
        assert_eq!(done.summary.passed, 4);
        assert!(done.end_time.is_some());
    }

    #[tokio::test]
    async fn test_malformed_body_yields_error_run() {
        let port = stub_runner("this is not a report").await;

        let executor = HttpExecutor::new(RunnerConfig::default().with_timeout(5)).unwrap();
        let mut run = running(TestBundle::Core, None);
        run.engine = CfmlEngine::new(EngineKind::Lucee5).with_host("127.0.0.1").with_port(port);

        let done = executor.execute(run, &CancelFlag::new()).await;
        assert_eq!(done.status, crate::models::TestStatus::Error);
        assert_eq!(done.results.len(), 1);
        assert_eq!(done.results[0].id, "error");
        assert_eq!(done.summary.total, 1);
        assert_eq!(done.summary.errors, 1);
    }
}
