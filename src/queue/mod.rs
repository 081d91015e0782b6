//! Test queue orchestration
//!
//! The core of the tool. A queue owns the ordered list of
//! (engine, database, bundle) combinations and the run history, and
//! drives items to completion one at a time through an injected
//! executor. Items execute in strict insertion order; there is no
//! parallelism, so concurrent runs never compete for the same database.

#![allow(dead_code)]

use thiserror::Error;
use tracing::{info, warn};

use crate::executor::{CancelFlag, TestExecutor};
use crate::models::{
    CfmlEngine, Database, DatabaseRegistry, EngineRegistry, RunSummary, TestBundle, TestRun,
    TestSpec, TestStatus,
};

/// Queue operation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    #[error("Unknown engine id: {0}")]
    EngineNotFound(String),

    #[error("Unknown database id: {0}")]
    DatabaseNotFound(String),

    #[error("Unknown bundle id: {0}")]
    BundleNotFound(String),

    #[error("Spec '{spec}' does not belong to bundle '{bundle}'")]
    SpecMismatch { spec: String, bundle: String },

    #[error("{0} is not allowed while the queue is running")]
    Busy(&'static str),

    #[error("Index {index} is out of range for a queue of {len} items")]
    IndexOutOfRange { index: usize, len: usize },
}

/// One queued combination
#[derive(Clone, Debug, PartialEq)]
pub struct QueueItem {
    pub id: String,
    pub engine: CfmlEngine,
    pub database: Database,
    pub bundle: TestBundle,
    pub spec: Option<TestSpec>,
    pub status: TestStatus,
}

/// Sequential test queue with run history
pub struct TestQueue {
    engines: EngineRegistry,
    databases: DatabaseRegistry,
    items: Vec<QueueItem>,
    history: Vec<TestRun>,
    running: bool,
    current_index: Option<usize>,
    next_seq: u64,
    cancel: CancelFlag,
    fail_fast: bool,
}

impl TestQueue {
    pub fn new(engines: EngineRegistry, databases: DatabaseRegistry) -> Self {
        Self {
            engines,
            databases,
            items: Vec::new(),
            history: Vec::new(),
            running: false,
            current_index: None,
            next_seq: 0,
            cancel: CancelFlag::new(),
            fail_fast: false,
        }
    }

    /// Queue over the stock registries
    pub fn with_defaults() -> Self {
        Self::new(EngineRegistry::defaults(), DatabaseRegistry::defaults())
    }

    /// Halt the drain after the first failed or errored run
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Add one combination to the queue.
    ///
    /// All three ids must resolve in their registries; a failed lookup
    /// returns the offending id and leaves the queue untouched.
    pub fn enqueue(
        &mut self,
        engine_id: &str,
        database_id: &str,
        bundle_id: &str,
    ) -> Result<String, QueueError> {
        self.enqueue_with_spec(engine_id, database_id, bundle_id, None)
    }

    /// Add one combination restricted to a single spec
    pub fn enqueue_with_spec(
        &mut self,
        engine_id: &str,
        database_id: &str,
        bundle_id: &str,
        spec: Option<TestSpec>,
    ) -> Result<String, QueueError> {
        let engine = self
            .engines
            .get(engine_id)
            .cloned()
            .ok_or_else(|| QueueError::EngineNotFound(engine_id.to_string()))?;
        let database = self
            .databases
            .get(database_id)
            .cloned()
            .ok_or_else(|| QueueError::DatabaseNotFound(database_id.to_string()))?;
        let bundle = TestBundle::from_str(bundle_id)
            .ok_or_else(|| QueueError::BundleNotFound(bundle_id.to_string()))?;

        if let Some(spec) = &spec {
            if spec.bundle != bundle {
                return Err(QueueError::SpecMismatch {
                    spec: spec.id.clone(),
                    bundle: bundle.id().to_string(),
                });
            }
        }

        // Monotonic sequence keeps ids unique under rapid enqueue
        self.next_seq += 1;
        let id = format!(
            "{}_{}_{}_{}",
            engine.id(),
            database.id(),
            bundle.id(),
            self.next_seq
        );

        self.items.push(QueueItem {
            id: id.clone(),
            engine,
            database,
            bundle,
            spec,
            status: TestStatus::Pending,
        });

        Ok(id)
    }

    /// Empty the queue. Rejected while running.
    pub fn clear(&mut self) -> Result<(), QueueError> {
        if self.running {
            return Err(QueueError::Busy("clear"));
        }
        self.items.clear();
        self.current_index = None;
        Ok(())
    }

    /// Remove a single item by position. Rejected while running.
    pub fn remove_at(&mut self, index: usize) -> Result<QueueItem, QueueError> {
        if self.running {
            return Err(QueueError::Busy("remove"));
        }
        if index >= self.items.len() {
            return Err(QueueError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    /// Empty the run history. Rejected while running: the in-flight run
    /// has already been appended and clearing would orphan it.
    pub fn clear_results(&mut self) -> Result<(), QueueError> {
        if self.running {
            return Err(QueueError::Busy("clearing results"));
        }
        self.history.clear();
        Ok(())
    }

    /// Drain the queue sequentially. A no-op returning 0 when already
    /// running or empty. Returns the number of items driven to a
    /// terminal status.
    pub async fn start(&mut self, executor: &dyn TestExecutor) -> usize {
        if self.running || self.items.is_empty() {
            return 0;
        }

        info!("Starting test queue ({} items)", self.items.len());
        self.running = true;
        self.current_index = Some(0);
        self.cancel.reset();

        let mut executed = 0;
        while self.running {
            executed += usize::from(self.advance(executor).await);
        }

        info!("Queue drained: {} run(s) executed", executed);
        executed
    }

    /// Execute the item at the cursor and move it forward; ends the
    /// drain once the cursor passes the last item or a stop lands.
    async fn advance(&mut self, executor: &dyn TestExecutor) -> bool {
        let index = match self.current_index {
            Some(index) if index < self.items.len() => index,
            _ => {
                self.finish_drain();
                return false;
            }
        };

        if self.cancel.is_cancelled() {
            self.finish_drain();
            return false;
        }

        // Terminal states are final: a restarted queue passes them over
        if self.items[index].status != TestStatus::Pending {
            self.current_index = Some(index + 1);
            return false;
        }

        let run = {
            let item = &mut self.items[index];
            item.status = TestStatus::Running;
            TestRun::start(
                item.id.clone(),
                item.engine.clone(),
                item.database.clone(),
                item.bundle,
                item.spec.clone(),
            )
        };

        info!("[{}/{}] {}", index + 1, self.items.len(), run.id);
        self.history.push(run.clone());

        let mut done = executor.execute(run, &self.cancel).await;
        if !done.is_terminal() {
            done.fail_with("Executor returned a non-terminal run", None);
        }

        let status = done.status;
        self.items[index].status = status;
        self.replace_history_entry(done);

        if status == TestStatus::Skipped {
            info!("Queue stopped during {}", self.items[index].id);
            self.finish_drain();
            return true;
        }

        if self.fail_fast && matches!(status, TestStatus::Failed | TestStatus::Error) {
            warn!("Fail-fast: halting queue after {}", self.items[index].id);
            self.finish_drain();
            return true;
        }

        self.current_index = Some(index + 1);
        true
    }

    /// Stop the queue.
    ///
    /// The current item and its run are marked Skipped with an end time,
    /// and the cancel flag is raised for any executor still between
    /// result-processing steps. An in-flight socket read is not
    /// interrupted; it runs out its own timeout. Stopping an idle queue
    /// changes nothing.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }

        self.cancel.cancel();

        if let Some(index) = self.current_index {
            if let Some(item) = self.items.get_mut(index) {
                if item.status == TestStatus::Running {
                    item.status = TestStatus::Skipped;
                    if let Some(run) = self.history.iter_mut().find(|r| r.id == item.id) {
                        if !run.is_terminal() {
                            run.mark_skipped();
                        }
                    }
                }
            }
        }

        self.running = false;
        self.current_index = None;
    }

    /// Handle for signalling a stop from outside the queue (a ctrl-c
    /// handler, another task)
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn history(&self) -> &[TestRun] {
        &self.history
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// The run belonging to the item at the cursor, if any
    pub fn current_run(&self) -> Option<&TestRun> {
        let index = self.current_index?;
        let item = self.items.get(index)?;
        self.history.iter().find(|run| run.id == item.id)
    }

    /// Aggregate counts across the whole history
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for run in &self.history {
            summary.merge(&run.summary);
        }
        summary
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn finish_drain(&mut self) {
        self.running = false;
        self.current_index = None;
    }

    fn replace_history_entry(&mut self, done: TestRun) {
        match self.history.iter_mut().find(|r| r.id == done.id) {
            Some(entry) => *entry = done,
            None => self.history.push(done),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RunSummary, TestResult};
    use async_trait::async_trait;

    /// Completes every run with a single result of the given status
    struct StaticExecutor(TestStatus);

    #[async_trait]
    impl TestExecutor for StaticExecutor {
        async fn execute(&self, mut run: TestRun, _cancel: &CancelFlag) -> TestRun {
            match self.0 {
                TestStatus::Error => run.fail_with("boom", None),
                status => {
                    let results = vec![TestResult::new("t1", "one test", status, 0.01)];
                    let summary = RunSummary::from_results(&results);
                    run.complete(results, summary);
                }
            }
            run
        }
    }

    /// Simulates a stop signal arriving while the run executes
    struct CancellingExecutor;

    #[async_trait]
    impl TestExecutor for CancellingExecutor {
        async fn execute(&self, mut run: TestRun, cancel: &CancelFlag) -> TestRun {
            cancel.cancel();
            run.mark_skipped();
            run
        }
    }

    fn queue() -> TestQueue {
        TestQueue::with_defaults()
    }

    #[test]
    fn test_enqueue_generates_prefixed_unique_ids() {
        let mut queue = queue();
        let a = queue.enqueue("lucee5", "mysql", "core").unwrap();
        let b = queue.enqueue("lucee5", "mysql", "core").unwrap();

        assert!(a.starts_with("lucee5_mysql_core_"));
        assert_ne!(a, b);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.items()[0].status, TestStatus::Pending);
    }

    #[test]
    fn test_enqueue_rejects_unknown_ids_without_mutating() {
        let mut queue = queue();

        assert_eq!(
            queue.enqueue("railo", "mysql", "core"),
            Err(QueueError::EngineNotFound("railo".to_string()))
        );
        assert_eq!(
            queue.enqueue("lucee5", "mongodb", "core"),
            Err(QueueError::DatabaseNotFound("mongodb".to_string()))
        );
        assert_eq!(
            queue.enqueue("lucee5", "mysql", "integration"),
            Err(QueueError::BundleNotFound("integration".to_string()))
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_rejects_spec_from_other_bundle() {
        let mut queue = queue();
        let spec = TestSpec::new("validation", "Validation", TestBundle::Model);

        let err = queue
            .enqueue_with_spec("lucee5", "mysql", "core", Some(spec))
            .unwrap_err();
        assert!(matches!(err, QueueError::SpecMismatch { .. }));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_mutation_rejected_while_running() {
        let mut queue = queue();
        queue.enqueue("lucee5", "mysql", "core").unwrap();
        queue.enqueue("lucee6", "postgres", "model").unwrap();
        queue.running = true;

        assert_eq!(queue.clear(), Err(QueueError::Busy("clear")));
        assert!(matches!(queue.remove_at(0), Err(QueueError::Busy(_))));
        assert!(matches!(queue.clear_results(), Err(QueueError::Busy(_))));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove_at_checks_bounds() {
        let mut queue = queue();
        queue.enqueue("lucee5", "mysql", "core").unwrap();

        assert_eq!(
            queue.remove_at(5),
            Err(QueueError::IndexOutOfRange { index: 5, len: 1 })
        );

        let removed = queue.remove_at(0).unwrap();
        assert!(removed.id.starts_with("lucee5_mysql_core_"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_start_on_empty_queue_is_a_noop() {
        let mut queue = queue();
        let executed = tokio_test::block_on(queue.start(&StaticExecutor(TestStatus::Passed)));

        assert_eq!(executed, 0);
        assert!(!queue.is_running());
        assert!(queue.history().is_empty());
    }

    #[tokio::test]
    async fn test_single_item_drain() {
        let mut queue = queue();
        let id = queue.enqueue("lucee5", "mysql", "core").unwrap();

        let executed = queue.start(&StaticExecutor(TestStatus::Passed)).await;

        assert_eq!(executed, 1);
        assert!(!queue.is_running());
        assert_eq!(queue.current_index(), None);
        assert_eq!(queue.history().len(), 1);

        let run = &queue.history()[0];
        assert_eq!(run.id, id);
        assert_eq!(run.bundle.id(), "core");
        assert!(run.is_terminal());
        assert_eq!(queue.items()[0].status, TestStatus::Passed);
    }

    #[tokio::test]
    async fn test_failures_do_not_halt_the_drain() {
        let mut queue = queue();
        queue.enqueue("lucee5", "mysql", "core").unwrap();
        queue.enqueue("lucee6", "postgres", "model").unwrap();

        let executed = queue.start(&StaticExecutor(TestStatus::Error)).await;

        assert_eq!(executed, 2);
        assert_eq!(queue.history().len(), 2);
        for run in queue.history() {
            assert_eq!(run.status, TestStatus::Error);
            assert_eq!(run.summary, RunSummary::new(1, 0, 0, 1, 0));
        }
    }

    #[tokio::test]
    async fn test_fail_fast_leaves_rest_pending() {
        let mut queue = queue().with_fail_fast(true);
        queue.enqueue("lucee5", "mysql", "core").unwrap();
        queue.enqueue("lucee6", "postgres", "model").unwrap();

        let executed = queue.start(&StaticExecutor(TestStatus::Error)).await;

        assert_eq!(executed, 1);
        assert_eq!(queue.items()[0].status, TestStatus::Error);
        assert_eq!(queue.items()[1].status, TestStatus::Pending);
    }

    #[tokio::test]
    async fn test_stop_mid_run_skips_current_and_preserves_rest() {
        let mut queue = queue();
        queue.enqueue("lucee5", "mysql", "core").unwrap();
        queue.enqueue("lucee6", "postgres", "model").unwrap();

        let executed = queue.start(&CancellingExecutor).await;

        assert_eq!(executed, 1);
        assert!(!queue.is_running());
        assert_eq!(queue.items()[0].status, TestStatus::Skipped);
        assert_eq!(queue.items()[1].status, TestStatus::Pending);

        let run = &queue.history()[0];
        assert_eq!(run.status, TestStatus::Skipped);
        assert!(run.end_time.is_some());
    }

    #[test]
    fn test_stop_when_idle_is_a_noop() {
        let mut queue = queue();
        queue.enqueue("lucee5", "mysql", "core").unwrap();

        queue.stop();

        assert!(!queue.is_running());
        assert_eq!(queue.items()[0].status, TestStatus::Pending);
        assert!(!queue.cancel_handle().is_cancelled());
    }

    #[test]
    fn test_stop_during_forged_active_state() {
        // Drives the bookkeeping stop() performs when a drain is
        // interrupted between advances.
        let mut queue = queue();
        let id = queue.enqueue("lucee5", "mysql", "core").unwrap();

        queue.items[0].status = TestStatus::Running;
        queue.history.push(TestRun::start(
            id,
            queue.items[0].engine.clone(),
            queue.items[0].database.clone(),
            queue.items[0].bundle,
            None,
        ));
        queue.running = true;
        queue.current_index = Some(0);

        queue.stop();

        assert!(!queue.is_running());
        assert_eq!(queue.current_index(), None);
        assert_eq!(queue.items()[0].status, TestStatus::Skipped);
        let run = &queue.history()[0];
        assert_eq!(run.status, TestStatus::Skipped);
        assert!(run.end_time.is_some());
    }

    #[tokio::test]
    async fn test_restart_passes_over_terminal_items() {
        let mut queue = queue();
        queue.enqueue("lucee5", "mysql", "core").unwrap();
        assert_eq!(queue.start(&StaticExecutor(TestStatus::Passed)).await, 1);

        // Nothing pending: the drain walks through and executes nothing
        assert_eq!(queue.start(&StaticExecutor(TestStatus::Passed)).await, 0);
        assert_eq!(queue.history().len(), 1);

        // A freshly queued item still runs
        queue.enqueue("lucee6", "h2", "view").unwrap();
        assert_eq!(queue.start(&StaticExecutor(TestStatus::Passed)).await, 1);
        assert_eq!(queue.history().len(), 2);
    }

    #[tokio::test]
    async fn test_summary_aggregates_history() {
        let mut queue = queue();
        queue.enqueue("lucee5", "mysql", "core").unwrap();
        queue.enqueue("lucee6", "postgres", "model").unwrap();
        queue.start(&StaticExecutor(TestStatus::Passed)).await;

        let summary = queue.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 2);
    }

    #[tokio::test]
    async fn test_clear_results_when_idle() {
        let mut queue = queue();
        queue.enqueue("lucee5", "mysql", "core").unwrap();
        queue.start(&StaticExecutor(TestStatus::Passed)).await;
        assert_eq!(queue.history().len(), 1);

        queue.clear_results().unwrap();
        assert!(queue.history().is_empty());
    }
}
