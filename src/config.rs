//! Configuration management for the SQL connector.
//!
//! Handles loading configuration from a TOML file, with support for named
//! connections, a base directory for relative SQLite paths and pagination
//! batch sizes.

use crate::db::{BackendKind, MEMORY_LOCATOR};
use crate::error::{ConnectorError, Result};
use crate::model::Pagination;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the connection used when none is selected.
pub const DEFAULT_CONNECTION: &str = "default";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Directory that relative SQLite locators are resolved against.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Batch sizes for result paging.
    #[serde(default)]
    pub pagination: Pagination,

    /// Named database connections.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
}

/// A database connection as written in the config file or on the command line.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Backend name, e.g. "sqlite" or "postgres".
    pub backend: Option<String>,

    /// Backend-specific locator: a file path or a DSN.
    pub locator: Option<String>,
}

impl ConnectionConfig {
    /// Creates a connection config from optional parts.
    pub fn new(backend: Option<String>, locator: Option<String>) -> Self {
        Self { backend, locator }
    }

    /// Returns true if neither field is set.
    pub fn is_empty(&self) -> bool {
        self.backend.is_none() && self.locator.is_none()
    }

    /// Merges another config into this one, with the other taking precedence.
    ///
    /// A non-empty locator given without a backend also sets the backend:
    /// from its URL scheme, or SQLite when it has none (a plain path). So
    /// `-l postgres://...` over a SQLite default means Postgres, and
    /// `-l data.db` over a Postgres default means SQLite.
    pub fn merge(&mut self, other: &ConnectionConfig) {
        if other.backend.is_some() {
            self.backend = other.backend.clone();
        }
        if let Some(locator) = &other.locator {
            if other.backend.is_none() && !locator.trim().is_empty() {
                let inferred = BackendKind::from_locator(locator).unwrap_or(BackendKind::Sqlite);
                self.backend = Some(inferred.as_str().to_string());
            }
            self.locator = Some(locator.clone());
        }
    }

    /// Fills a missing locator from a `DATABASE_URL` value.
    ///
    /// Ignored when a locator is already set or SQLite was chosen explicitly.
    pub fn apply_database_url(&mut self, url: Option<String>) {
        if self.locator.is_some() {
            return;
        }
        let Some(url) = url.filter(|url| !url.trim().is_empty()) else {
            return;
        };
        if self.backend.as_deref().and_then(BackendKind::parse) == Some(BackendKind::Sqlite) {
            return;
        }
        self.merge(&ConnectionConfig::new(None, Some(url)));
    }

    /// Returns the backend, inferring it from the locator's scheme and
    /// falling back to SQLite.
    pub fn backend_or_default(&self) -> String {
        if let Some(backend) = &self.backend {
            return backend.clone();
        }
        self.locator
            .as_deref()
            .and_then(BackendKind::from_locator)
            .unwrap_or_default()
            .as_str()
            .to_string()
    }

    /// Returns the locator, or the in-memory database for SQLite and an
    /// empty DSN (environment defaults) otherwise.
    pub fn locator_or_default(&self) -> String {
        if let Some(locator) = &self.locator {
            return locator.clone();
        }
        match BackendKind::parse(&self.backend_or_default()) {
            Some(BackendKind::Sqlite) | None => MEMORY_LOCATOR.to_string(),
            Some(BackendKind::Postgres) => String::new(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sql-connector")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConnectorError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            ConnectorError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;

        config.pagination.validate().map_err(|e| {
            ConnectorError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e.message()
            ))
        })?;

        Ok(config)
    }

    /// Gets a named connection, or the default connection if name is None.
    pub fn get_connection(&self, name: Option<&str>) -> Option<&ConnectionConfig> {
        let key = name.unwrap_or(DEFAULT_CONNECTION);
        self.connections.get(key)
    }

    /// Builds the effective connection.
    ///
    /// Precedence: `overrides` (command line), then the named connection,
    /// then the `default` connection. Naming a connection that does not
    /// exist is a configuration error.
    pub fn resolve_connection(
        &self,
        name: Option<&str>,
        overrides: &ConnectionConfig,
    ) -> Result<ConnectionConfig> {
        let mut connection = match name {
            Some(name) => self.get_connection(Some(name)).cloned().ok_or_else(|| {
                ConnectorError::config(format!("Connection '{name}' not found in config file"))
            })?,
            None => self.get_connection(None).cloned().unwrap_or_default(),
        };

        connection.merge(overrides);
        Ok(connection)
    }

    /// Returns the base directory, defaulting to the current directory.
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
