//! Test run execution
//!
//! Executors turn one (engine, database, bundle) combination into a
//! completed run. The queue drives them through the [`TestExecutor`]
//! trait so the HTTP runner and the simulator are interchangeable.

mod http;
mod parse;
mod sim;

pub use http::{HttpExecutor, RunnerConfig};
pub use parse::{parse_report, ParsedReport, ReportError};
pub use sim::SimExecutor;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::models::TestRun;

/// Cooperative cancellation flag shared between the queue and executors.
///
/// Observed between queue items and between an executor's
/// result-processing steps. An in-flight socket read is bounded by the
/// request timeout, not interrupted.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Capability: run one combination to completion.
///
/// Implementations receive a run already in the Running state and must
/// return it terminal — Passed, Failed, Error, or Skipped (when the
/// cancel flag was observed). Execution failures are absorbed into an
/// Error-status run, never propagated.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    async fn execute(&self, run: TestRun, cancel: &CancelFlag) -> TestRun;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());

        let handle = flag.clone();
        handle.cancel();
        assert!(flag.is_cancelled());

        flag.reset();
        assert!(!flag.is_cancelled());
    }
}
