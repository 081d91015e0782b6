//! CFML engine models
//!
//! Defines the 5 CFML engines the test suite runs against.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported CFML engines
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Lucee5,
    Lucee6,
    Adobe2018,
    Adobe2021,
    Adobe2023,
}

impl EngineKind {
    /// Registry id
    pub fn id(&self) -> &'static str {
        match self {
            EngineKind::Lucee5 => "lucee5",
            EngineKind::Lucee6 => "lucee6",
            EngineKind::Adobe2018 => "adobe2018",
            EngineKind::Adobe2021 => "adobe2021",
            EngineKind::Adobe2023 => "adobe2023",
        }
    }

    /// Engine product name
    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::Lucee5 | EngineKind::Lucee6 => "Lucee",
            _ => "Adobe ColdFusion",
        }
    }

    /// Engine version string
    pub fn version(&self) -> &'static str {
        match self {
            EngineKind::Lucee5 => "5",
            EngineKind::Lucee6 => "6",
            EngineKind::Adobe2018 => "2018",
            EngineKind::Adobe2021 => "2021",
            EngineKind::Adobe2023 => "2023",
        }
    }

    /// Default published port for the engine container
    pub fn default_port(&self) -> u16 {
        match self {
            EngineKind::Lucee5 => 60005,
            EngineKind::Lucee6 => 60006,
            EngineKind::Adobe2018 => 62018,
            EngineKind::Adobe2021 => 62021,
            EngineKind::Adobe2023 => 62023,
        }
    }

    /// Path of the engine's admin console
    pub fn admin_path(&self) -> &'static str {
        match self {
            EngineKind::Lucee5 | EngineKind::Lucee6 => "/lucee/admin/",
            _ => "/CFIDE/administrator/",
        }
    }

    /// Get all engine kinds
    pub fn all() -> Vec<EngineKind> {
        vec![
            EngineKind::Lucee5,
            EngineKind::Lucee6,
            EngineKind::Adobe2018,
            EngineKind::Adobe2021,
            EngineKind::Adobe2023,
        ]
    }

    /// Parse from registry id
    pub fn from_str(s: &str) -> Option<EngineKind> {
        match s.to_lowercase().as_str() {
            "lucee5" | "lucee-5" => Some(EngineKind::Lucee5),
            "lucee6" | "lucee-6" => Some(EngineKind::Lucee6),
            "adobe2018" | "acf2018" => Some(EngineKind::Adobe2018),
            "adobe2021" | "acf2021" => Some(EngineKind::Adobe2021),
            "adobe2023" | "acf2023" => Some(EngineKind::Adobe2023),
            _ => None,
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.version())
    }
}

/// One engine entry in the registry: a kind plus where it is reachable
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CfmlEngine {
    pub kind: EngineKind,
    pub host: String,
    pub port: u16,
}

impl CfmlEngine {
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            host: "localhost".to_string(),
            port: kind.default_port(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn id(&self) -> &'static str {
        self.kind.id()
    }

    /// Base URL of the engine container
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// URL of the engine's admin console
    pub fn admin_url(&self) -> String {
        format!("{}{}", self.base_url(), self.kind.admin_path())
    }
}

impl fmt::Display for CfmlEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.kind, self.host, self.port)
    }
}

/// Read-only lookup table of configured engines, keyed by id
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineRegistry {
    engines: Vec<CfmlEngine>,
}

impl EngineRegistry {
    /// Registry with the stock engine set on default ports
    pub fn defaults() -> Self {
        Self {
            engines: EngineKind::all().into_iter().map(CfmlEngine::new).collect(),
        }
    }

    /// Build from an explicit engine list
    pub fn new(engines: Vec<CfmlEngine>) -> Self {
        Self { engines }
    }

    /// Look up an engine by registry id
    pub fn get(&self, id: &str) -> Option<&CfmlEngine> {
        self.engines.iter().find(|e| e.id() == id)
    }

    pub fn all(&self) -> &[CfmlEngine] {
        &self.engines
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}
