//! Maps raw driver failures onto [`ConnectorError`].
//!
//! SQLite and PostgreSQL report equivalent failures in very different ways,
//! so classification looks at the SQLSTATE class or SQLite primary result
//! code rather than at which driver raised the error.

use crate::db::BackendKind;
use crate::error::ConnectorError;
use tracing::error;

/// SQLSTATE classes that mean the statement itself is at fault.
const PG_STATEMENT_CLASSES: &[&str] = &["42", "0A", "26", "34"];

/// SQLSTATE classes that mean the session is unusable.
const PG_SESSION_CLASSES: &[&str] = &["08", "28", "3D", "53", "57", "58"];

/// SQLite primary result codes that mean the session is unusable:
/// BUSY, LOCKED, READONLY, IOERR, CORRUPT, CANTOPEN, AUTH, NOTADB.
const SQLITE_SESSION_CODES: &[i64] = &[5, 6, 8, 10, 11, 14, 23, 26];

/// SQLITE_ERROR, used by SQLite for syntax errors and unknown objects.
const SQLITE_GENERIC_ERROR: i64 = 1;

/// Classifies a driver error, logging the original message.
pub fn classify(backend: BackendKind, err: sqlx::Error) -> ConnectorError {
    let classified = classify_error(backend, &err);
    log_failure(backend, &classified, &err);
    classified
}

/// Classifies a failure to open a session.
///
/// Anything other than a configuration problem means the session could not
/// be established, whatever the driver reported.
pub fn classify_connect(backend: BackendKind, err: sqlx::Error) -> ConnectorError {
    let classified = match classify_error(backend, &err) {
        config @ ConnectorError::Config(_) => config,
        other => ConnectorError::connection(other.message()),
    };
    log_failure(backend, &classified, &err);
    classified
}

/// Classifies a failure raised while a statement was running.
///
/// The statement was already accepted by the backend, so SQLite's generic
/// SQLITE_ERROR here is a runtime failure (overflow, bad function argument)
/// and not a problem with the statement text. PostgreSQL reports those under
/// their own SQLSTATE classes and is classified as usual.
pub fn classify_runtime(backend: BackendKind, err: sqlx::Error) -> ConnectorError {
    let classified = match (backend, classify_error(backend, &err)) {
        (BackendKind::Sqlite, ConnectorError::QuerySyntax(message)) => {
            ConnectorError::unexpected(message)
        }
        (_, other) => other,
    };
    log_failure(backend, &classified, &err);
    classified
}

fn log_failure(backend: BackendKind, classified: &ConnectorError, original: &sqlx::Error) {
    error!(
        backend = backend.as_str(),
        category = classified.category(),
        "{original}"
    );
}

fn classify_error(backend: BackendKind, err: &sqlx::Error) -> ConnectorError {
    match err {
        sqlx::Error::Configuration(inner) => {
            ConnectorError::config(normalize_message(&inner.to_string()))
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            ConnectorError::connection(normalize_message(&err.to_string()))
        }
        sqlx::Error::Database(db_err) => {
            let message = database_message(&**db_err);
            match db_err.code() {
                Some(code) => classify_database_code(backend, &code, message),
                None => ConnectorError::unexpected(message),
            }
        }
        _ => ConnectorError::unexpected(normalize_message(&err.to_string())),
    }
}

/// Formats a database error message, with PostgreSQL detail and hint lines.
fn database_message(db_err: &(dyn sqlx::error::DatabaseError + 'static)) -> String {
    let mut message = normalize_message(db_err.message());

    if let Some(pg_error) = db_err.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            message.push_str("\n  DETAIL: ");
            message.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            message.push_str("\n  HINT: ");
            message.push_str(hint);
        }
    }

    message
}

/// Classifies a database error from its backend-specific code.
fn classify_database_code(backend: BackendKind, code: &str, message: String) -> ConnectorError {
    match backend {
        BackendKind::Postgres => {
            let class = code.get(..2).unwrap_or(code);
            if PG_STATEMENT_CLASSES.contains(&class) {
                ConnectorError::query_syntax(message)
            } else if PG_SESSION_CLASSES.contains(&class) {
                ConnectorError::connection(message)
            } else {
                ConnectorError::unexpected(message)
            }
        }
        BackendKind::Sqlite => {
            // sqlx reports extended result codes; the low byte is the primary code.
            match code.parse::<i64>().map(|c| c & 0xff) {
                Ok(SQLITE_GENERIC_ERROR) => ConnectorError::query_syntax(message),
                Ok(primary) if SQLITE_SESSION_CODES.contains(&primary) => {
                    ConnectorError::connection(message)
                }
                _ => ConnectorError::unexpected(message),
            }
        }
    }
}

/// Normalizes a driver message for display: trimmed, first letter upper-cased.
pub fn normalize_message(message: &str) -> String {
    let trimmed = message.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Unknown error".to_string(),
    }
}
