//! Database abstraction layer.
//!
//! Backends are a closed set ([`BackendKind`]). Each one implements
//! [`SessionBackend`] over a single sqlx connection, and every session runs
//! inside its own task (see [`session`]) so an open cursor can outlive the
//! call that created it.

mod postgres;
pub mod session;
mod spec;
mod sqlite;
mod statement;
mod types;

pub use session::SessionHandle;
pub use spec::{ConnectionSpec, SpecResolver, MEMORY_LOCATOR};
pub(crate) use statement::count_statements;
pub use types::{ExecuteOutcome, ResultPage, Row, Value};

use crate::error::{ConnectorError, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use std::fmt;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded, file-based SQLite.
    #[default]
    Sqlite,
    /// Networked PostgreSQL server.
    Postgres,
}

impl BackendKind {
    /// Every registered backend.
    pub const ALL: [BackendKind; 2] = [BackendKind::Sqlite, BackendKind::Postgres];

    /// Returns the backend as its canonical symbolic name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    /// Parses a backend from its symbolic name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }

    /// Looks up a backend by name, failing with a configuration error.
    pub fn lookup(name: &str) -> Result<Self> {
        Self::parse(name).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|kind| kind.as_str()).collect();
            ConnectorError::config(format!(
                "Unknown backend '{name}'. Expected one of: {}",
                known.join(", ")
            ))
        })
    }

    /// Guesses the backend from a locator's URL scheme, if it has one.
    pub fn from_locator(locator: &str) -> Option<Self> {
        let (scheme, _) = locator.split_once(':')?;
        match scheme.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns true if locators for this backend are filesystem paths.
    pub fn is_file_based(&self) -> bool {
        matches!(self, Self::Sqlite)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One backend connection, driven by a session task.
///
/// Implementations only speak sqlx; classification into
/// [`ConnectorError`] happens in the session task.
#[async_trait]
pub trait SessionBackend: Send + 'static {
    /// The backend this implementation serves.
    const KIND: BackendKind;

    /// Returns the column names the statement would produce.
    ///
    /// An empty list means the statement has no result set.
    async fn describe(&mut self, sql: &str) -> std::result::Result<Vec<String>, sqlx::Error>;

    /// Runs a statement that produces no rows, returning the rows affected.
    async fn execute(&mut self, sql: &str) -> std::result::Result<u64, sqlx::Error>;

    /// Opens a cursor over the statement's rows.
    fn rows<'a>(&'a mut self, sql: &'a str) -> BoxStream<'a, std::result::Result<Row, sqlx::Error>>;

    /// Closes the underlying connection.
    async fn close(self) -> std::result::Result<(), sqlx::Error>;
}

/// Driver connect options for a resolved [`ConnectionSpec`].
#[derive(Debug, Clone)]
pub(crate) enum SessionOptions {
    Sqlite(SqliteConnectOptions),
    Postgres(PgConnectOptions),
}

impl SessionOptions {
    /// Builds the driver options for a spec without connecting.
    pub(crate) fn from_spec(spec: &ConnectionSpec) -> Result<Self> {
        match spec.backend() {
            BackendKind::Sqlite => sqlite::connect_options(spec.locator()).map(Self::Sqlite),
            BackendKind::Postgres => postgres::connect_options(spec.locator()).map(Self::Postgres),
        }
    }

    /// Opens a session and starts its task.
    pub(crate) async fn connect(&self) -> Result<SessionHandle> {
        match self {
            Self::Sqlite(options) => sqlite::SqliteSession::connect(options)
                .await
                .map(SessionHandle::spawn),
            Self::Postgres(options) => postgres::PostgresSession::connect(options)
                .await
                .map(SessionHandle::spawn),
        }
    }
}
