//! Pre-flight checks
//!
//! Verifies that an engine (and, where applicable, its database) is
//! reachable before a run is attempted. Container state is purely
//! informational here: a failed check aborts the run with a clear
//! message, nothing is started or restarted.

#![allow(dead_code)]

use anyhow::Result;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::http::HttpClient;
use crate::models::{CfmlEngine, Database};

/// Pre-flight configuration
#[derive(Clone, Debug)]
pub struct PreflightConfig {
    /// Timeout for the engine HTTP probe
    pub http_timeout_secs: u64,

    /// Timeout for the database TCP probe
    pub tcp_timeout_secs: u64,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 10,
            tcp_timeout_secs: 5,
        }
    }
}

/// One named check with its outcome
#[derive(Clone, Debug)]
pub struct PreflightCheck {
    pub name: &'static str,
    pub passed: bool,
    pub message: String,
}

impl PreflightCheck {
    fn pass(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            message: message.into(),
        }
    }

    fn fail(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            message: message.into(),
        }
    }
}

/// Outcome of a pre-flight pass
#[derive(Clone, Debug)]
pub struct PreflightResult {
    pub passed: bool,
    pub checks: Vec<PreflightCheck>,
}

impl PreflightResult {
    pub fn format_table(&self) -> String {
        let mut out = String::new();
        out.push_str("\nPre-flight checks\n");
        out.push_str("──────────────────────────────────────────────\n");
        for check in &self.checks {
            let icon = if check.passed { "✓" } else { "✗" };
            out.push_str(&format!("  {} {:24} {}\n", icon, check.name, check.message));
        }
        out.push_str("──────────────────────────────────────────────\n");
        out.push_str(if self.passed {
            "All checks passed\n"
        } else {
            "Pre-flight failed\n"
        });
        out
    }
}

/// Pre-flight checker
pub struct PreflightChecker {
    config: PreflightConfig,
    client: HttpClient,
}

impl PreflightChecker {
    pub fn new(config: PreflightConfig) -> Result<Self> {
        let client = HttpClient::with_timeout(config.http_timeout_secs)?;
        Ok(Self { config, client })
    }

    /// Run all checks for a combination
    pub async fn run(&self, engine: &CfmlEngine, database: &Database) -> PreflightResult {
        info!("Pre-flight for {} with {}", engine.kind, database.kind);

        let mut checks = Vec::new();
        checks.push(self.check_engine(engine).await);
        checks.push(self.check_database(database).await);

        let passed = checks.iter().all(|c| c.passed);
        PreflightResult { passed, checks }
    }

    /// The engine container answers HTTP. Any response counts: only
    /// connectivity matters here, not the status code.
    async fn check_engine(&self, engine: &CfmlEngine) -> PreflightCheck {
        let name = "Engine reachable";
        let url = engine.base_url();

        match self.client.get(&url).await {
            Ok(response) => {
                debug!("Engine probe: HTTP {}", response.status_code);
                PreflightCheck::pass(name, format!("{} answered HTTP {}", url, response.status_code))
            }
            Err(e) => PreflightCheck::fail(name, format!("{url}: {e}")),
        }
    }

    /// The database port accepts TCP connections (skipped for embedded
    /// databases, which live inside the engine process)
    async fn check_database(&self, database: &Database) -> PreflightCheck {
        let name = "Database reachable";

        if database.kind.is_embedded() {
            return PreflightCheck::pass(name, format!("{} is embedded", database.kind));
        }

        let address = format!("{}:{}", database.connection.host, database.connection.port);
        let budget = Duration::from_secs(self.config.tcp_timeout_secs);

        match timeout(budget, TcpStream::connect(&address)).await {
            Ok(Ok(_)) => PreflightCheck::pass(name, format!("{address} accepts connections")),
            Ok(Err(e)) => PreflightCheck::fail(name, format!("{address}: {e}")),
            Err(_) => PreflightCheck::fail(
                name,
                format!("{address}: no answer within {}s", self.config.tcp_timeout_secs),
            ),
        }
    }
}
