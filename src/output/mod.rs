//! Output formatting module
//!
//! Provides table, JSON, CSV, and summary output formats.

mod formatter;

pub use formatter::{write_run_to_file, OutputFormat, ResultFormatter};
