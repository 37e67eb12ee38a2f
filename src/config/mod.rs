//! Configuration for the system database layer.

use crate::models::Backend;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default physical table prefix.
pub const DEFAULT_TABLE_PREFIX: &str = "zf101_";

/// Logical table names the facade resolves.
const SYSTEM_TABLES: &[&str] = &[
    "configuration",
    "registry",
    "message",
    "log_system",
    "log_error",
    "log_server",
    "log_sql",
];

/// Connection parameters for the networked backend.
#[derive(Clone)]
pub struct NetworkDsn {
    /// Hostname or IP of the server.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password; cleared by the engine once connected.
    pub password: Option<String>,
    /// Database to open.
    pub database: String,
}

impl Default for NetworkDsn {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: String::new(),
            password: None,
            database: String::new(),
        }
    }
}

impl fmt::Debug for NetworkDsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkDsn")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .finish()
    }
}

/// Settings for the embedded-file backend.
#[derive(Debug, Clone)]
pub struct SqliteSettings {
    /// Path to the database file.
    pub path: PathBuf,
    /// When set, a missing file is a connect-time failure instead of
    /// being created empty.
    pub required: bool,
}

impl Default for SqliteSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./system.db"),
            required: true,
        }
    }
}

/// Main configuration for the system database layer.
#[derive(Debug, Clone)]
pub struct SysDbConfig {
    /// Which backend the facade binds on `connect()`.
    pub backend: Backend,
    /// Physical prefix applied to every logical table name.
    pub table_prefix: String,
    /// Logical name → physical suffix.
    pub tables: HashMap<String, String>,
    /// Embedded backend settings.
    pub sqlite: SqliteSettings,
    /// Networked backend settings.
    pub postgres: NetworkDsn,
    /// Whether executed statements are mirrored into the SQL-audit log.
    pub log_queries: bool,
}

impl Default for SysDbConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            tables: SYSTEM_TABLES
                .iter()
                .map(|t| ((*t).to_string(), (*t).to_string()))
                .collect(),
            sqlite: SqliteSettings::default(),
            postgres: NetworkDsn::default(),
            log_queries: true,
        }
    }
}

/// Configuration file structure (for TOML parsing).
///
/// Every field is optional; absent fields keep their defaults.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Backend name: `sqlite` or `postgres`.
    pub backend: Option<String>,
    /// Table prefix.
    pub table_prefix: Option<String>,
    /// Extra or overridden logical table mappings.
    pub tables: Option<HashMap<String, String>>,
    /// Embedded backend section.
    pub sqlite: Option<ConfigFileSqlite>,
    /// Networked backend section.
    pub postgres: Option<ConfigFilePostgres>,
    /// SQL-audit toggle.
    pub log_queries: Option<bool>,
}

/// `[sqlite]` section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileSqlite {
    /// Database file path.
    pub path: Option<String>,
    /// Required-file flag.
    pub required: Option<bool>,
}

/// `[postgres]` section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFilePostgres {
    /// Hostname or IP.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<u16>,
    /// Login user.
    pub user: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// Database name.
    pub database: Option<String>,
}

impl SysDbConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file, overlaying it on the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
            cause: format!("{}: {e}", path.as_ref().display()),
        })?;
        let file: ConfigFile = toml::from_str(&text).map_err(|e| Error::Config {
            cause: e.to_string(),
        })?;
        Ok(Self::default().merged(file))
    }

    /// Overlays a parsed config file onto `self`.
    #[must_use]
    pub fn merged(mut self, file: ConfigFile) -> Self {
        if let Some(backend) = file.backend.as_deref().and_then(Backend::parse) {
            self.backend = backend;
        }
        if let Some(prefix) = file.table_prefix {
            self.table_prefix = prefix;
        }
        if let Some(tables) = file.tables {
            self.tables.extend(tables);
        }
        if let Some(sqlite) = file.sqlite {
            if let Some(path) = sqlite.path {
                self.sqlite.path = PathBuf::from(path);
            }
            if let Some(required) = sqlite.required {
                self.sqlite.required = required;
            }
        }
        if let Some(pg) = file.postgres {
            if let Some(host) = pg.host {
                self.postgres.host = host;
            }
            if let Some(port) = pg.port {
                self.postgres.port = port;
            }
            if let Some(user) = pg.user {
                self.postgres.user = user;
            }
            if pg.password.is_some() {
                self.postgres.password = pg.password;
            }
            if let Some(database) = pg.database {
                self.postgres.database = database;
            }
        }
        if let Some(log_queries) = file.log_queries {
            self.log_queries = log_queries;
        }
        self
    }
}
