//! Error types for the SQL connector.
//!
//! Every backend failure is classified into one of a handful of kinds before
//! it leaves the core. The variant carries the display message; the original
//! driver message is logged by the classifier (see [`crate::classifier`]).

use thiserror::Error;

/// Classification of a connector outcome, shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown backend, unparsable locator, or API misuse. Not retryable.
    Config,
    /// Session-level failure (auth, unreachable host, locked or missing file).
    Connection,
    /// The statement itself was rejected by the backend.
    QuerySyntax,
    /// The statement succeeded but produced no result set. Informational.
    NoResultSet,
    /// Anything the classifier could not place.
    Unexpected,
}

impl ErrorKind {
    /// Short label for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config => "Configuration Error",
            Self::Connection => "Connection Error",
            Self::QuerySyntax => "Query Error",
            Self::NoResultSet => "No Result",
            Self::Unexpected => "Unexpected Error",
        }
    }

    /// Fixed, user-facing hint for this kind of outcome.
    pub fn user_hint(&self) -> &'static str {
        match self {
            Self::Config => "Error! Try to check your configuration.",
            Self::Connection => "Error! Try to check your connection settings.",
            Self::QuerySyntax => "Error! Try to check your sql query.",
            Self::NoResultSet => "There is no result for your query.",
            Self::Unexpected => "Error! Something went wrong while running your query.",
        }
    }
}

/// Main error type for connector operations.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Configuration errors (unknown backend, bad locator, misuse of the API).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session errors (host unreachable, auth failed, database file missing, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement errors (syntax errors, unknown tables or columns, etc.)
    #[error("Query error: {0}")]
    QuerySyntax(String),

    /// Unclassified backend failures.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ConnectorError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query_syntax(msg: impl Into<String>) -> Self {
        Self::QuerySyntax(msg.into())
    }

    /// Creates an unexpected error with the given message.
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Connection(_) => ErrorKind::Connection,
            Self::QuerySyntax(_) => ErrorKind::QuerySyntax,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        self.kind().category()
    }

    /// Returns the user-facing hint for this error.
    pub fn user_hint(&self) -> &'static str {
        self.kind().user_hint()
    }

    /// Returns the message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Config(msg)
            | Self::Connection(msg)
            | Self::QuerySyntax(msg)
            | Self::Unexpected(msg) => msg,
        }
    }
}

/// Result type alias using ConnectorError.
pub type Result<T> = std::result::Result<T, ConnectorError>;
