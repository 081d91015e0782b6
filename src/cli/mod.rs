//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// CFWheels test suite runner for CFML engine/database combinations
#[derive(Parser, Debug)]
#[command(name = "wheels-testlab")]
#[command(version)]
#[command(about = "Run the framework test suite against CFML engine/database combinations")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one engine/database/bundle combination
    Run(RunArgs),

    /// Run a matrix of combinations through the queue
    Matrix(MatrixArgs),

    /// List engines, databases, and bundles
    List(ListArgs),

    /// View stored run results
    Results(ResultsArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Engine id (lucee5, lucee6, adobe2018, adobe2021, adobe2023)
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Database id (h2, mysql, postgres, sqlserver, oracle)
    #[arg(short, long)]
    pub database: Option<String>,

    /// Bundle id (all, core, model, controller, view, plugin)
    #[arg(short, long)]
    pub bundle: Option<String>,

    /// Restrict the run to a single spec within the bundle
    #[arg(short, long)]
    pub spec: Option<String>,

    /// Runner budget in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Fabricate results instead of calling the engine
    #[arg(long)]
    pub simulate: bool,

    /// Skip pre-flight checks
    #[arg(long)]
    pub no_preflight: bool,

    /// Persist the completed run to the results store
    #[arg(long)]
    pub save: bool,

    /// Write the formatted run to a file
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for matrix command
#[derive(Parser, Debug)]
pub struct MatrixArgs {
    /// Comma-separated engine ids, or "all"
    #[arg(short, long, default_value = "all")]
    pub engines: String,

    /// Comma-separated database ids, or "all"
    #[arg(short, long, default_value = "all")]
    pub databases: String,

    /// Comma-separated bundle ids
    #[arg(short, long, default_value = "core")]
    pub bundles: String,

    /// Runner budget in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Halt the queue after the first failed or errored run
    #[arg(long)]
    pub fail_fast: bool,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "summary")]
    pub format: String,

    /// Fabricate results instead of calling the engines
    #[arg(long)]
    pub simulate: bool,

    /// Persist completed runs to the results store
    #[arg(long)]
    pub save: bool,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show engines only
    #[arg(long)]
    pub engines: bool,

    /// Show databases only
    #[arg(long)]
    pub databases: bool,

    /// Show bundles only
    #[arg(long)]
    pub bundles: bool,

    /// Show connection details
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for results command
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    /// Engine id to show runs for
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Specific run id to display
    #[arg(short, long)]
    pub run: Option<String>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Export the selected run to a file (.json or .csv)
    #[arg(long)]
    pub export: Option<String>,

    /// Delete stored runs for the given engine
    #[arg(long)]
    pub clear: bool,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create an example configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./wheels-testlab.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the active configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the file (defaults to the standard locations)
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Read one configuration value
    Get {
        /// Key, e.g. app.default_engine
        key: String,

        /// Path to the file (defaults to the standard locations)
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Set one configuration value
    Set {
        /// Key, e.g. app.default_engine
        key: String,

        /// New value
        value: String,

        /// Path to the file
        #[arg(short, long, default_value = "./wheels-testlab.yaml")]
        file: String,
    },
}
