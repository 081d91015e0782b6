//! Configuration module
//!
//! Handles loading and managing configuration.

mod file;

pub use file::{ConfigFile, EndpointOverride};

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default engine id for single runs
    pub default_engine: String,

    /// Default database id for single runs
    pub default_database: String,

    /// Default bundle id for single runs
    pub default_bundle: String,

    /// Server-side runner budget in seconds
    pub runner_timeout_secs: u64,

    /// Execution order passed to the runner
    pub sort: String,

    /// Halt a queue drain after the first failed or errored run
    pub fail_fast: bool,

    /// Run pre-flight checks before each run
    pub preflight: bool,

    /// Fabricate results instead of calling engine containers
    pub simulate: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_engine: "lucee5".to_string(),
            default_database: "h2".to_string(),
            default_bundle: "core".to_string(),
            runner_timeout_secs: 1800,
            sort: "directory asc".to_string(),
            fail_fast: false,
            preflight: true,
            simulate: false,
        }
    }
}
