//! wheels-testlab - CFWheels test suite runner
//!
//! A CLI tool for running the framework test suite against multiple
//! CFML engine / database combinations.
//!
//! ## Features
//!
//! - Sequential test queue across engine/database/bundle combinations
//! - Tolerant result parsing across both historical runner report shapes
//! - Pre-flight reachability checks before runs
//! - Multiple output formats (Table, JSON, CSV)
//! - JSON result storage with CSV export
//!
//! ## Usage
//!
//! ```bash
//! # Run one combination
//! wheels-testlab run --engine lucee5 --database mysql --bundle core
//!
//! # Run the full matrix of engines and databases
//! wheels-testlab matrix --engines all --databases mysql,postgres --bundles core,model
//!
//! # List what is configured
//! wheels-testlab list --detailed
//!
//! # Inspect stored results
//! wheels-testlab results --engine lucee5
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod cli;
mod config;
mod executor;
mod http;
mod models;
mod output;
mod preflight;
mod queue;
mod results;
mod utils;

use cli::Args;
use config::ConfigFile;
use executor::{HttpExecutor, RunnerConfig, SimExecutor, TestExecutor};
use models::{TestBundle, TestSpec};
use output::{write_run_to_file, OutputFormat, ResultFormatter};
use preflight::{PreflightChecker, PreflightConfig};
use queue::TestQueue;
use results::{ExportFormat, ResultsStorage};
use utils::{init_logger, LogLevel, Timer};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });

    match args.command {
        cli::Command::Run(run_args) => {
            run_single(run_args).await?;
        }
        cli::Command::Matrix(matrix_args) => {
            run_matrix(matrix_args).await?;
        }
        cli::Command::List(list_args) => {
            list_catalog(list_args);
        }
        cli::Command::Results(results_args) => {
            show_results(results_args)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args)?;
        }
    }

    Ok(())
}

fn build_executor(config: &ConfigFile, simulate: bool, timeout: Option<u64>) -> Result<Box<dyn TestExecutor>> {
    if simulate || config.app.simulate {
        return Ok(Box::new(SimExecutor::new()));
    }

    let runner = RunnerConfig::new()
        .with_timeout(timeout.unwrap_or(config.app.runner_timeout_secs))
        .with_sort(config.app.sort.clone());
    Ok(Box::new(HttpExecutor::new(runner)?))
}

async fn run_single(args: cli::RunArgs) -> Result<()> {
    let config = ConfigFile::load_default()?;

    let engine_id = args.engine.unwrap_or_else(|| config.app.default_engine.clone());
    let database_id = args
        .database
        .unwrap_or_else(|| config.app.default_database.clone());
    let bundle_id = args.bundle.unwrap_or_else(|| config.app.default_bundle.clone());

    let engines = config.engine_registry();
    let databases = config.database_registry();

    let simulate = args.simulate || config.app.simulate;

    // Pre-flight before touching the queue
    if config.app.preflight && !args.no_preflight && !simulate {
        let engine = engines
            .get(&engine_id)
            .ok_or_else(|| anyhow::anyhow!("Unknown engine: {engine_id}"))?;
        let database = databases
            .get(&database_id)
            .ok_or_else(|| anyhow::anyhow!("Unknown database: {database_id}"))?;

        let checker = PreflightChecker::new(PreflightConfig::default())?;
        let result = checker.run(engine, database).await;
        println!("{}", result.format_table());

        if !result.passed {
            std::process::exit(1);
        }
    }

    let spec = match &args.spec {
        Some(spec_id) => {
            let bundle = TestBundle::from_str(&bundle_id)
                .ok_or_else(|| anyhow::anyhow!("Unknown bundle: {bundle_id}"))?;
            Some(TestSpec::new(spec_id.clone(), spec_id.clone(), bundle))
        }
        None => None,
    };

    let mut queue = TestQueue::new(engines, databases);
    queue.enqueue_with_spec(&engine_id, &database_id, &bundle_id, spec)?;

    let executor = build_executor(&config, simulate, args.timeout)?;
    queue.start(executor.as_ref()).await;

    let run = queue
        .history()
        .last()
        .ok_or_else(|| anyhow::anyhow!("Queue produced no run"))?;

    let formatter =
        ResultFormatter::new(OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Table));
    println!("{}", formatter.format_run(run));

    if let Some(path) = &args.output {
        let format = OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Table);
        write_run_to_file(path, run, format)?;
        println!("Run written to: {path}");
    }

    if args.save {
        let storage = ResultsStorage::default_dir()?;
        let path = storage.save(run)?;
        println!("Run saved to: {}", path.display());
    }

    if !run.status.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

async fn run_matrix(args: cli::MatrixArgs) -> Result<()> {
    let config = ConfigFile::load_default()?;

    let engines = config.engine_registry();
    let databases = config.database_registry();

    let engine_ids = expand_list(&args.engines, &engines.all().iter().map(|e| e.id().to_string()).collect::<Vec<_>>());
    let database_ids = expand_list(
        &args.databases,
        &databases.all().iter().map(|d| d.id().to_string()).collect::<Vec<_>>(),
    );
    let bundle_ids = expand_list(
        &args.bundles,
        &TestBundle::all().iter().map(|b| b.id().to_string()).collect::<Vec<_>>(),
    );

    let mut queue = TestQueue::new(engines, databases)
        .with_fail_fast(args.fail_fast || config.app.fail_fast);

    for engine_id in &engine_ids {
        for database_id in &database_ids {
            for bundle_id in &bundle_ids {
                queue.enqueue(engine_id, database_id, bundle_id)?;
            }
        }
    }

    info!(
        "Matrix: {} engine(s) x {} database(s) x {} bundle(s) = {} run(s)",
        engine_ids.len(),
        database_ids.len(),
        bundle_ids.len(),
        queue.len()
    );

    let executor = build_executor(&config, args.simulate, args.timeout)?;

    let timer = Timer::start("matrix");
    let executed = queue.start(executor.as_ref()).await;
    let elapsed = timer.stop();

    let formatter =
        ResultFormatter::new(OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Summary));

    for run in queue.history() {
        println!("{}", formatter.format_run(run));
    }
    println!("{}", ResultFormatter::default().no_color().format_aggregate(queue.history()));
    println!(
        "{} run(s) executed in {:.1}s",
        executed,
        elapsed.as_secs_f64()
    );

    if args.save {
        let storage = ResultsStorage::default_dir()?;
        for run in queue.history() {
            storage.save(run)?;
        }
        println!("{} run(s) saved", queue.history().len());
    }

    let summary = queue.summary();
    if summary.failed > 0 || summary.errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn expand_list(arg: &str, all: &[String]) -> Vec<String> {
    if arg.trim().eq_ignore_ascii_case("all") {
        all.to_vec()
    } else {
        arg.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn list_catalog(args: cli::ListArgs) {
    let config = ConfigFile::load_default().unwrap_or_default();
    let show_all = !args.engines && !args.databases && !args.bundles;

    if show_all || args.engines {
        println!("\nCFML Engines:");
        println!("──────────────────────────────────────────────────────────────");
        for engine in config.engine_registry().all() {
            if args.detailed {
                println!(
                    "  {:10} {:22} {}:{}  admin: {}",
                    engine.id(),
                    engine.kind.to_string(),
                    engine.host,
                    engine.port,
                    engine.admin_url()
                );
            } else {
                println!("  {:10} {:22} {}:{}", engine.id(), engine.kind.to_string(), engine.host, engine.port);
            }
        }
    }

    if show_all || args.databases {
        println!("\nDatabases:");
        println!("──────────────────────────────────────────────────────────────");
        for database in config.database_registry().all() {
            if args.detailed {
                let conn = &database.connection;
                println!(
                    "  {:10} {:22} dsn={} {}:{} user={}",
                    database.id(),
                    database.to_string(),
                    conn.dsn,
                    conn.host,
                    conn.port,
                    conn.username
                );
            } else {
                println!("  {:10} {}", database.id(), database);
            }
        }
    }

    if show_all || args.bundles {
        println!("\nTest Bundles:");
        println!("──────────────────────────────────────────────────────────────");
        for bundle in TestBundle::all() {
            if args.detailed {
                println!(
                    "  {:12} {:18} {:14} {}",
                    bundle.id(),
                    bundle.name(),
                    bundle.path(),
                    bundle.description()
                );
            } else {
                println!("  {:12} {:18} {}", bundle.id(), bundle.name(), bundle.path());
            }
        }
    }

    println!();
}

fn show_results(args: cli::ResultsArgs) -> Result<()> {
    let storage = ResultsStorage::default_dir()?;

    if args.clear {
        let engine = args
            .engine
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--clear requires --engine"))?;
        storage.delete_engine(engine)?;
        println!("Cleared stored runs for {engine}");
        return Ok(());
    }

    // No engine requested: list everything that has runs
    let Some(engine_id) = &args.engine else {
        let engines = storage.list_engines()?;

        if engines.is_empty() {
            println!("\nNo stored results found.");
            println!("Run tests with: wheels-testlab run --save");
            return Ok(());
        }

        println!("\nStored Results:");
        println!("──────────────────────────────────────────────────────────────");
        for engine in &engines {
            let runs = storage.list_runs(engine)?;
            if let Some(latest) = runs.first() {
                println!(
                    "  {:10} {:3} run(s)   latest: {} {:.1}%",
                    engine,
                    runs.len(),
                    latest.status.symbol(),
                    latest.pass_rate
                );
            }
        }
        println!("\nUse --engine <id> to view details.\n");
        return Ok(());
    };

    let run = match &args.run {
        Some(run_id) => storage.load(engine_id, run_id)?,
        None => storage
            .latest(engine_id)?
            .ok_or_else(|| anyhow::anyhow!("No stored runs for engine: {engine_id}"))?,
    };

    if args.run.is_none() {
        // Show the run listing above the latest run
        let runs = storage.list_runs(engine_id)?;
        println!("\nRuns for {engine_id} ({}):", runs.len());
        for info in runs.iter().take(10) {
            println!(
                "  {} {:40} {:8} {:.1}%",
                info.status.symbol(),
                info.id,
                info.status.to_string(),
                info.pass_rate
            );
        }
    }

    let formatter =
        ResultFormatter::new(OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Table));
    println!("{}", formatter.format_run(&run));

    if let Some(export_path) = &args.export {
        let path = std::path::PathBuf::from(export_path);
        let format = ExportFormat::from_extension(&path).unwrap_or(ExportFormat::Json);
        storage.export(&run, &path, format)?;
        println!("Exported to: {}", path.display());
    }

    Ok(())
}

fn manage_config(args: cli::ConfigArgs) -> Result<()> {
    use std::path::Path;

    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            let config = ConfigFile::example();
            config.save(path)?;
            println!("Configuration file created: {output}");
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { format } => {
            let config = ConfigFile::load_default()?;
            let output = if format == "json" {
                serde_json::to_string_pretty(&config)?
            } else {
                serde_yaml::to_string(&config)?
            };
            println!("{output}");
        }

        cli::ConfigAction::Validate { file } => {
            let path = file.unwrap_or_else(|| {
                ConfigFile::find()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_else(|| "./wheels-testlab.yaml".to_string())
            });

            match ConfigFile::load(&path) {
                Ok(_) => {
                    println!("Configuration file is valid: {path}");
                }
                Err(e) => {
                    println!("Configuration file is invalid: {path}");
                    println!("  Error: {e}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Get { key, file } => {
            let config = if let Some(path) = file {
                ConfigFile::load(&path)?
            } else {
                ConfigFile::load_default()?
            };

            let value = match key.as_str() {
                "app.default_engine" => config.app.default_engine.clone(),
                "app.default_database" => config.app.default_database.clone(),
                "app.default_bundle" => config.app.default_bundle.clone(),
                "app.runner_timeout_secs" => config.app.runner_timeout_secs.to_string(),
                "app.sort" => config.app.sort.clone(),
                "app.fail_fast" => config.app.fail_fast.to_string(),
                "app.preflight" => config.app.preflight.to_string(),
                "app.simulate" => config.app.simulate.to_string(),
                _ => {
                    anyhow::bail!("Unknown configuration key: {key}");
                }
            };

            println!("{value}");
        }

        cli::ConfigAction::Set { key, value, file } => {
            let mut config = if Path::new(&file).exists() {
                ConfigFile::load(&file)?
            } else {
                ConfigFile::default()
            };

            let value_display = value.clone();

            match key.as_str() {
                "app.default_engine" => config.app.default_engine = value,
                "app.default_database" => config.app.default_database = value,
                "app.default_bundle" => config.app.default_bundle = value,
                "app.runner_timeout_secs" => config.app.runner_timeout_secs = value.parse()?,
                "app.sort" => config.app.sort = value,
                "app.fail_fast" => config.app.fail_fast = value.parse()?,
                "app.preflight" => config.app.preflight = value.parse()?,
                "app.simulate" => config.app.simulate = value.parse()?,
                _ => {
                    anyhow::bail!("Unknown configuration key: {key}");
                }
            }

            config.validate()?;
            config.save(&file)?;
            println!("Set {key} = {value_display} in {file}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_list_all_keyword() {
        let all = vec!["a".to_string(), "b".to_string()];
        assert_eq!(expand_list("all", &all), all);
        assert_eq!(expand_list("ALL", &all), all);
    }

    #[test]
    fn test_expand_list_splits_and_trims() {
        let all = vec!["a".to_string()];
        assert_eq!(
            expand_list("lucee5, lucee6 ,", &all),
            vec!["lucee5".to_string(), "lucee6".to_string()]
        );
    }
}
