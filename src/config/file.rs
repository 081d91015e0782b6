//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::AppConfig;
use crate::models::{
    ConnectionInfo, Database, DatabaseKind, DatabaseRegistry, CfmlEngine, EngineKind,
    EngineRegistry,
};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./wheels-testlab.yaml",
    "./wheels-testlab.yml",
    "./.wheels-testlab.yaml",
    "~/.config/wheels-testlab/config.yaml",
    "~/.wheels-testlab.yaml",
];

/// Host/port override for one registry entry
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EndpointOverride {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Full configuration file structure
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Application settings
    #[serde(default)]
    pub app: AppConfig,

    /// Engine host/port overrides
    #[serde(default)]
    pub engines: Vec<EndpointOverride>,

    /// Database host/port overrides
    #[serde(default)]
    pub databases: Vec<EndpointOverride>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            engines: Vec::new(),
            databases: Vec::new(),
        }
    }
}

impl ConfigFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        for location in CONFIG_LOCATIONS {
            let path = expand_path(location);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    /// Load configuration from the first standard location, or defaults
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::find() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        if self.app.runner_timeout_secs == 0 {
            anyhow::bail!("runner_timeout_secs must be greater than zero");
        }

        for entry in &self.engines {
            if EngineKind::from_str(&entry.id).is_none() {
                anyhow::bail!("Unknown engine id in config: {}", entry.id);
            }
        }
        for entry in &self.databases {
            if DatabaseKind::from_str(&entry.id).is_none() {
                anyhow::bail!("Unknown database id in config: {}", entry.id);
            }
        }

        Ok(())
    }

    /// Engine registry with this file's overrides applied
    pub fn engine_registry(&self) -> EngineRegistry {
        let engines = EngineKind::all()
            .into_iter()
            .map(|kind| {
                let mut engine = CfmlEngine::new(kind);
                if let Some(entry) = self.engines.iter().find(|e| {
                    EngineKind::from_str(&e.id) == Some(kind)
                }) {
                    if let Some(host) = &entry.host {
                        engine = engine.with_host(host.clone());
                    }
                    if let Some(port) = entry.port {
                        engine = engine.with_port(port);
                    }
                }
                engine
            })
            .collect();
        EngineRegistry::new(engines)
    }

    /// Database registry with this file's overrides applied
    pub fn database_registry(&self) -> DatabaseRegistry {
        let databases = DatabaseKind::all()
            .into_iter()
            .map(|kind| {
                let mut database = Database::new(kind);
                if let Some(entry) = self.databases.iter().find(|d| {
                    DatabaseKind::from_str(&d.id) == Some(kind)
                }) {
                    let mut connection: ConnectionInfo = database.connection.clone();
                    if let Some(host) = &entry.host {
                        connection.host = host.clone();
                    }
                    if let Some(port) = entry.port {
                        connection.port = port;
                    }
                    database = database.with_connection(connection);
                }
                database
            })
            .collect();
        DatabaseRegistry::new(databases)
    }

    /// Generate example configuration
    pub fn example() -> Self {
        Self {
            version: "1.0".to_string(),
            app: AppConfig {
                default_engine: "lucee5".to_string(),
                default_database: "mysql".to_string(),
                default_bundle: "core".to_string(),
                ..AppConfig::default()
            },
            engines: vec![EndpointOverride {
                id: "lucee5".to_string(),
                host: Some("127.0.0.1".to_string()),
                port: Some(60005),
            }],
            databases: vec![EndpointOverride {
                id: "mysql".to_string(),
                host: Some("127.0.0.1".to_string()),
                port: Some(3306),
            }],
        }
    }
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(true)
}

fn expand_path(location: &str) -> PathBuf {
    if let Some(rest) = location.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(location)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigFile::default().validate().is_ok());
        assert!(ConfigFile::example().validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_override_ids() {
        let mut config = ConfigFile::default();
        config.engines.push(EndpointOverride {
            id: "railo".to_string(),
            host: None,
            port: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = ConfigFile::default();
        config.app.runner_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_apply_to_registries() {
        let config = ConfigFile::example();

        let engines = config.engine_registry();
        assert_eq!(engines.get("lucee5").unwrap().host, "127.0.0.1");
        // untouched entries keep their defaults
        assert_eq!(engines.get("lucee6").unwrap().port, 60006);

        let databases = config.database_registry();
        assert_eq!(databases.get("mysql").unwrap().connection.host, "127.0.0.1");
        assert_eq!(databases.get("postgres").unwrap().connection.host, "postgres");
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let config = ConfigFile::example();
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.app.default_database, "mysql");
        assert_eq!(loaded.engines.len(), 1);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        ConfigFile::example().save(&path).unwrap();
        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.version, "1.0");
    }
}
