//! Database models
//!
//! Defines the databases the test suite can run against, with the
//! connection parameters the test runner datasource expects.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported databases
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    H2,
    MySql,
    Postgres,
    SqlServer,
    Oracle,
}

impl DatabaseKind {
    /// Registry id
    pub fn id(&self) -> &'static str {
        match self {
            DatabaseKind::H2 => "h2",
            DatabaseKind::MySql => "mysql",
            DatabaseKind::Postgres => "postgres",
            DatabaseKind::SqlServer => "sqlserver",
            DatabaseKind::Oracle => "oracle",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            DatabaseKind::H2 => "H2",
            DatabaseKind::MySql => "MySQL",
            DatabaseKind::Postgres => "PostgreSQL",
            DatabaseKind::SqlServer => "SQL Server",
            DatabaseKind::Oracle => "Oracle",
        }
    }

    /// Datasource type string the test runner expects
    pub fn database_type(&self) -> &'static str {
        match self {
            DatabaseKind::H2 => "h2",
            DatabaseKind::MySql => "mysql",
            DatabaseKind::Postgres => "postgresql",
            DatabaseKind::SqlServer => "sqlserver",
            DatabaseKind::Oracle => "oracle",
        }
    }

    /// Default published port (0 for the embedded H2)
    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseKind::H2 => 0,
            DatabaseKind::MySql => 3306,
            DatabaseKind::Postgres => 5432,
            DatabaseKind::SqlServer => 1433,
            DatabaseKind::Oracle => 1521,
        }
    }

    /// Whether the database runs embedded in the engine process
    pub fn is_embedded(&self) -> bool {
        matches!(self, DatabaseKind::H2)
    }

    /// Get all database kinds
    pub fn all() -> Vec<DatabaseKind> {
        vec![
            DatabaseKind::H2,
            DatabaseKind::MySql,
            DatabaseKind::Postgres,
            DatabaseKind::SqlServer,
            DatabaseKind::Oracle,
        ]
    }

    /// Parse from registry id
    pub fn from_str(s: &str) -> Option<DatabaseKind> {
        match s.to_lowercase().as_str() {
            "h2" => Some(DatabaseKind::H2),
            "mysql" => Some(DatabaseKind::MySql),
            "postgres" | "postgresql" => Some(DatabaseKind::Postgres),
            "sqlserver" | "mssql" | "sql-server" => Some(DatabaseKind::SqlServer),
            "oracle" => Some(DatabaseKind::Oracle),
            _ => None,
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Datasource connection parameters handed to the test runner
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub dsn: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// H2 runs in-memory inside the engine container
    pub in_memory: bool,
}

impl ConnectionInfo {
    fn stock(kind: DatabaseKind) -> Self {
        let dsn = "wheelstestdb".to_string();
        match kind {
            DatabaseKind::H2 => Self {
                dsn,
                host: "localhost".to_string(),
                port: 0,
                username: "sa".to_string(),
                password: String::new(),
                in_memory: true,
            },
            DatabaseKind::MySql => Self {
                dsn,
                host: "mysql".to_string(),
                port: 3306,
                username: "wheelstestdb".to_string(),
                password: "wheelstestdb".to_string(),
                in_memory: false,
            },
            DatabaseKind::Postgres => Self {
                dsn,
                host: "postgres".to_string(),
                port: 5432,
                username: "wheelstestdb".to_string(),
                password: "wheelstestdb".to_string(),
                in_memory: false,
            },
            DatabaseKind::SqlServer => Self {
                dsn,
                host: "sqlserver".to_string(),
                port: 1433,
                username: "sa".to_string(),
                password: "wheelstestdb".to_string(),
                in_memory: false,
            },
            DatabaseKind::Oracle => Self {
                dsn,
                host: "oracle".to_string(),
                port: 1521,
                username: "system".to_string(),
                password: "oracle".to_string(),
                in_memory: false,
            },
        }
    }
}

/// One database entry in the registry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub kind: DatabaseKind,
    pub version: String,
    pub connection: ConnectionInfo,
}

impl Database {
    pub fn new(kind: DatabaseKind) -> Self {
        let version = match kind {
            DatabaseKind::H2 => "Embedded",
            DatabaseKind::MySql => "8.0",
            DatabaseKind::Postgres => "13",
            DatabaseKind::SqlServer => "2019",
            DatabaseKind::Oracle => "19.3.0",
        };
        Self {
            kind,
            version: version.to_string(),
            connection: ConnectionInfo::stock(kind),
        }
    }

    pub fn with_connection(mut self, connection: ConnectionInfo) -> Self {
        self.connection = connection;
        self
    }

    pub fn id(&self) -> &'static str {
        self.kind.id()
    }

    /// Value for the runner's `db` query parameter
    pub fn runner_param(&self) -> String {
        self.kind.name().to_lowercase()
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.version)
    }
}

/// Read-only lookup table of configured databases, keyed by id
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseRegistry {
    databases: Vec<Database>,
}

impl DatabaseRegistry {
    /// Registry with the stock database set
    pub fn defaults() -> Self {
        Self {
            databases: DatabaseKind::all().into_iter().map(Database::new).collect(),
        }
    }

    pub fn new(databases: Vec<Database>) -> Self {
        Self { databases }
    }

    /// Look up a database by registry id
    pub fn get(&self, id: &str) -> Option<&Database> {
        self.databases.iter().find(|d| d.id() == id)
    }

    pub fn all(&self) -> &[Database] {
        &self.databases
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}

impl Default for DatabaseRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}
