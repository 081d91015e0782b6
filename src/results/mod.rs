//! Results storage module
//!
//! Provides persistent storage and export for completed test runs.

mod storage;

pub use storage::{ExportFormat, ResultsStorage, RunInfo};
