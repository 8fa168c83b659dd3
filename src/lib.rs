//! SQL connector - run a statement against SQLite or PostgreSQL and page
//! lazily through its result.
//!
//! The core is [`Connector`] (one backend session, one statement at a time)
//! and [`ResultModel`] (a growable view that fetches in large batches and
//! reveals in small ones).

pub mod classifier;
pub mod cli;
pub mod config;
pub mod connector;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;

pub use connector::Connector;
pub use db::{BackendKind, ConnectionSpec, ExecuteOutcome, ResultPage, Row, SpecResolver, Value};
pub use error::{ConnectorError, ErrorKind, Result};
pub use model::{PageSource, Pagination, ResultModel};
