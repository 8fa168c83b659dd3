//! SQLite session backend.

use super::{BackendKind, Row, SessionBackend, Value, MEMORY_LOCATOR};
use crate::classifier::classify_connect;
use crate::error::{ConnectorError, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// How long a statement waits on a locked database file before failing.
const BUSY_TIMEOUT_SECS: u64 = 5;

/// Builds connect options for a resolved SQLite locator.
pub(crate) fn connect_options(locator: &str) -> Result<SqliteConnectOptions> {
    let options = if locator == MEMORY_LOCATOR {
        SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| ConnectorError::config(format!("Invalid SQLite locator: {e}")))?
    } else {
        SqliteConnectOptions::new()
            .filename(locator)
            .create_if_missing(false)
    };

    Ok(options.busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS)))
}

/// A single SQLite connection.
#[derive(Debug)]
pub(crate) struct SqliteSession {
    conn: SqliteConnection,
}

impl SqliteSession {
    /// Opens the database described by `options`.
    pub(crate) async fn connect(options: &SqliteConnectOptions) -> Result<Self> {
        let conn = SqliteConnection::connect_with(options)
            .await
            .map_err(|e| classify_connect(BackendKind::Sqlite, e))?;
        debug!("Opened SQLite connection");
        Ok(Self { conn })
    }
}

#[async_trait]
impl SessionBackend for SqliteSession {
    const KIND: BackendKind = BackendKind::Sqlite;

    async fn describe(&mut self, sql: &str) -> std::result::Result<Vec<String>, sqlx::Error> {
        let described = (&mut self.conn).describe(sql).await?;
        Ok(described
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect())
    }

    async fn execute(&mut self, sql: &str) -> std::result::Result<u64, sqlx::Error> {
        let result = (&mut self.conn).execute(sqlx::raw_sql(sql)).await?;
        Ok(result.rows_affected())
    }

    fn rows<'a>(&'a mut self, sql: &'a str) -> BoxStream<'a, std::result::Result<Row, sqlx::Error>> {
        sqlx::raw_sql(sql)
            .fetch(&mut self.conn)
            .map_ok(|row| convert_row(&row))
            .boxed()
    }

    async fn close(self) -> std::result::Result<(), sqlx::Error> {
        self.conn.close().await
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a single column value by its runtime storage class.
///
/// SQLite columns are dynamically typed, so the declared column type is
/// only a hint; the value itself decides how it is decoded.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    let decoded = match storage_class.as_str() {
        "INTEGER" => row.try_get::<i64, _>(index).map(Value::Int),
        "REAL" => row.try_get::<f64, _>(index).map(Value::Float),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes),
        "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::Bool),
        _ => row.try_get::<String, _>(index).map(Value::Text),
    };

    decoded.unwrap_or(Value::Null)
}
