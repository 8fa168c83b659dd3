//! PostgreSQL session backend.
//!
//! Statements are sent with the simple query protocol, so every value
//! arrives in text format and types without a native mapping can still be
//! shown as strings.

use super::{BackendKind, Row, SessionBackend, Value};
use crate::classifier::classify_connect;
use crate::error::{ConnectorError, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Executor, Row as SqlxRow, TypeInfo};
use std::str::FromStr;
use tracing::debug;

/// Builds connect options from a DSN.
///
/// An empty DSN takes host, port, user, password and database from the
/// standard `PG*` environment variables.
pub(crate) fn connect_options(locator: &str) -> Result<PgConnectOptions> {
    if locator.is_empty() {
        return Ok(PgConnectOptions::new());
    }

    PgConnectOptions::from_str(locator)
        .map_err(|e| ConnectorError::config(format!("Invalid PostgreSQL connection string: {e}")))
}

/// A single PostgreSQL connection.
#[derive(Debug)]
pub(crate) struct PostgresSession {
    conn: PgConnection,
}

impl PostgresSession {
    /// Connects to the server described by `options`.
    pub(crate) async fn connect(options: &PgConnectOptions) -> Result<Self> {
        match PgConnection::connect_with(options).await {
            Ok(conn) => {
                debug!(
                    "Connected to PostgreSQL at {}:{}",
                    options.get_host(),
                    options.get_port()
                );
                Ok(Self { conn })
            }
            Err(e) => {
                let hint = connection_hint(&e, options);
                let err = classify_connect(BackendKind::Postgres, e);
                match hint {
                    Some(hint) if matches!(err, ConnectorError::Connection(_)) => {
                        Err(ConnectorError::connection(hint))
                    }
                    _ => Err(err),
                }
            }
        }
    }
}

#[async_trait]
impl SessionBackend for PostgresSession {
    const KIND: BackendKind = BackendKind::Postgres;

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

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // Text format: any other type reads back as its textual form.
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}

/// Builds a user-friendly message for common connection failures.
fn connection_hint(error: &sqlx::Error, options: &PgConnectOptions) -> Option<String> {
    let host = options.get_host();
    let port = options.get_port();
    let user = options.get_username();
    let database = options.get_database().unwrap_or(user);

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        Some(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        Some(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        Some(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        Some("Server requires SSL. Add '?sslmode=require' to the connection string.".to_string())
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        Some(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        None
    }
}
