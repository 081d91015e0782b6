//! Results storage and retrieval
//!
//! Persists completed runs as JSON, one file per run, grouped by engine.
//! The queue itself stays in-memory; storage is a CLI-level concern.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::{TestRun, TestStatus};

/// Brief run information for listings
#[derive(Clone, Debug)]
pub struct RunInfo {
    pub id: String,
    pub engine: String,
    pub database: String,
    pub bundle: String,
    pub status: TestStatus,
    pub pass_rate: f64,
}

/// Export format
#[derive(Clone, Copy, Debug)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}

/// Results storage manager
pub struct ResultsStorage {
    base_dir: PathBuf,
}

impl ResultsStorage {
    /// Create a new results storage rooted at the given directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Storage under the platform data directory
    pub fn default_dir() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wheels-testlab")
            .join("results");
        Ok(Self::new(base_dir))
    }

    fn engine_dir(&self, engine_id: &str) -> PathBuf {
        self.base_dir.join(engine_id.to_lowercase())
    }

    fn run_path(&self, engine_id: &str, run_id: &str) -> PathBuf {
        self.engine_dir(engine_id).join(format!("{run_id}.json"))
    }

    /// Save a completed run
    pub fn save(&self, run: &TestRun) -> Result<PathBuf> {
        let engine_dir = self.engine_dir(run.engine.id());
        fs::create_dir_all(&engine_dir)?;

        let path = self.run_path(run.engine.id(), &run.id);
        let file = File::create(&path).context("Failed to create results file")?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, run).context("Failed to write results")?;

        info!("Saved run to {}", path.display());
        Ok(path)
    }

    /// Load a single run
    pub fn load(&self, engine_id: &str, run_id: &str) -> Result<TestRun> {
        self.load_from_path(&self.run_path(engine_id, run_id))
    }

    fn load_from_path(&self, path: &Path) -> Result<TestRun> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open results file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context("Failed to parse results")
    }

    /// Load all runs for an engine, newest first
    pub fn load_engine(&self, engine_id: &str) -> Result<Vec<TestRun>> {
        let engine_dir = self.engine_dir(engine_id);
        if !engine_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&engine_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match self.load_from_path(&path) {
                    Ok(run) => runs.push(run),
                    Err(e) => debug!("Skipping {}: {}", path.display(), e),
                }
            }
        }

        runs.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(runs)
    }

    /// List engine ids with stored runs
    pub fn list_engines(&self) -> Result<Vec<String>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut engines = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    engines.push(name.to_string());
                }
            }
        }

        engines.sort();
        Ok(engines)
    }

    /// List brief info for an engine's runs, newest first
    pub fn list_runs(&self, engine_id: &str) -> Result<Vec<RunInfo>> {
        let runs = self.load_engine(engine_id)?;
        Ok(runs
            .into_iter()
            .map(|run| RunInfo {
                id: run.id.clone(),
                engine: run.engine.id().to_string(),
                database: run.database.id().to_string(),
                bundle: run.bundle.id().to_string(),
                status: run.status,
                pass_rate: run.summary.pass_rate(),
            })
            .collect())
    }

    /// Most recent run for an engine
    pub fn latest(&self, engine_id: &str) -> Result<Option<TestRun>> {
        let runs = self.load_engine(engine_id)?;
        Ok(runs.into_iter().next())
    }

    /// Delete a single run
    pub fn delete(&self, engine_id: &str, run_id: &str) -> Result<()> {
        let path = self.run_path(engine_id, run_id);
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Deleted run: {}", path.display());
        }
        Ok(())
    }

    /// Delete all runs for an engine
    pub fn delete_engine(&self, engine_id: &str) -> Result<()> {
        let engine_dir = self.engine_dir(engine_id);
        if engine_dir.exists() {
            fs::remove_dir_all(&engine_dir)?;
            info!("Deleted all runs for engine: {engine_id}");
        }
        Ok(())
    }

    /// Export a run to a file
    pub fn export(&self, run: &TestRun, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => {
                let file = File::create(path)?;
                let writer = BufWriter::new(file);
                serde_json::to_writer_pretty(writer, run)?;
            }
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_path(path)?;

                writer.write_record([
                    "run_id", "engine", "database", "bundle", "test_id", "test_name", "status",
                    "duration_secs", "error",
                ])?;

                for result in &run.results {
                    writer.write_record([
                        run.id.clone(),
                        run.engine.id().to_string(),
                        run.database.id().to_string(),
                        run.bundle.id().to_string(),
                        result.id.clone(),
                        result.name.clone(),
                        result.status.to_string(),
                        format!("{:.3}", result.duration_secs),
                        result
                            .error
                            .as_ref()
                            .map(|e| e.message.clone())
                            .unwrap_or_default(),
                    ])?;
                }
                writer.flush()?;
            }
        }

        info!("Exported run to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CfmlEngine, Database, DatabaseKind, EngineKind, RunSummary, TestBundle, TestResult,
    };

    fn completed_run(seq: u64) -> TestRun {
        let mut run = TestRun::start(
            format!("lucee5_mysql_core_{seq}"),
            CfmlEngine::new(EngineKind::Lucee5),
            Database::new(DatabaseKind::MySql),
            TestBundle::Core,
            None,
        );
        let results = vec![TestResult::new("t1", "one test", TestStatus::Passed, 0.01)];
        let summary = RunSummary::from_results(&results);
        run.complete(results, summary);
        run
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ResultsStorage::new(dir.path());

        let run = completed_run(1);
        storage.save(&run).unwrap();

        let loaded = storage.load("lucee5", &run.id).unwrap();
        assert_eq!(loaded.id, run.id);
        assert_eq!(loaded.status, TestStatus::Passed);
        assert_eq!(loaded.summary, run.summary);
    }

    #[test]
    fn test_list_engines_and_runs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ResultsStorage::new(dir.path());

        storage.save(&completed_run(1)).unwrap();
        storage.save(&completed_run(2)).unwrap();

        assert_eq!(storage.list_engines().unwrap(), vec!["lucee5".to_string()]);
        let runs = storage.list_runs("lucee5").unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].engine, "lucee5");
    }

    #[test]
    fn test_missing_engine_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ResultsStorage::new(dir.path());

        assert!(storage.load_engine("adobe2023").unwrap().is_empty());
        assert!(storage.latest("adobe2023").unwrap().is_none());
    }

    #[test]
    fn test_delete_run() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ResultsStorage::new(dir.path());

        let run = completed_run(1);
        storage.save(&run).unwrap();
        storage.delete("lucee5", &run.id).unwrap();

        assert!(storage.load_engine("lucee5").unwrap().is_empty());
    }

    #[test]
    fn test_csv_export_contains_results() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ResultsStorage::new(dir.path());

        let run = completed_run(1);
        let path = dir.path().join("export.csv");
        storage.export(&run, &path, ExportFormat::Csv).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("one test"));
        assert!(content.contains("PASSED"));
    }
}
