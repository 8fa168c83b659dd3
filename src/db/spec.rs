//! Connection specs and locator resolution.

use super::BackendKind;
use crate::error::{ConnectorError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Locator that selects a transient in-memory SQLite database.
pub const MEMORY_LOCATOR: &str = ":memory:";

/// A resolved, immutable description of which database to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    backend: BackendKind,
    locator: String,
}

impl ConnectionSpec {
    /// Returns the backend this spec targets.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Returns the normalized locator (absolute path, sentinel or DSN).
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Returns true if this spec selects an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.backend.is_file_based() && self.locator == MEMORY_LOCATOR
    }

    /// Returns a log-safe rendering of the locator with any password removed.
    pub fn display_locator(&self) -> String {
        if self.locator.is_empty() {
            return "(environment defaults)".to_string();
        }

        match Url::parse(&self.locator) {
            Ok(mut url) if url.password().is_some() => {
                // Only fails for URLs that cannot carry credentials at all.
                let _ = url.set_password(Some("***"));
                url.to_string()
            }
            _ => self.locator.clone(),
        }
    }
}

/// Normalizes user-supplied locators into [`ConnectionSpec`]s.
///
/// Relative SQLite paths are resolved against `base_dir`, which is explicit
/// configuration rather than process-wide state.
#[derive(Debug, Clone)]
pub struct SpecResolver {
    base_dir: PathBuf,
}

impl SpecResolver {
    /// Creates a resolver that joins relative file locators onto `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolves a symbolic backend name and locator into a spec.
    ///
    /// Fails with a configuration error for unknown backends and with a
    /// connection error when a SQLite file does not exist.
    pub fn resolve(&self, backend: &str, locator: &str) -> Result<ConnectionSpec> {
        let backend = BackendKind::lookup(backend)?;
        let locator = match backend {
            BackendKind::Sqlite => self.resolve_file(locator)?,
            BackendKind::Postgres => locator.trim().to_string(),
        };

        let spec = ConnectionSpec { backend, locator };
        debug!(
            "Resolved {} locator to {}",
            spec.backend,
            spec.display_locator()
        );
        Ok(spec)
    }

    /// Resolves a SQLite locator to the in-memory sentinel or an existing file.
    fn resolve_file(&self, locator: &str) -> Result<String> {
        let trimmed = locator.trim();
        let path = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed);

        if path.is_empty() || path == MEMORY_LOCATOR {
            return Ok(MEMORY_LOCATOR.to_string());
        }

        let path = Path::new(path);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };

        if !resolved.is_file() {
            return Err(ConnectorError::connection(format!(
                "Database file not found: {}",
                resolved.display()
            )));
        }

        Ok(resolved.to_string_lossy().into_owned())
    }
}
