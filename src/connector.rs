//! The backend-agnostic query connector.
//!
//! A [`Connector`] owns at most one backend session, runs one statement at
//! a time on it and hands out the result set a page at a time.

use crate::db::{
    count_statements, ConnectionSpec, ExecuteOutcome, ResultPage, SessionHandle, SessionOptions,
};
use crate::error::{ConnectorError, Result};
use tracing::{debug, info, warn};

/// Where the connector's current result set stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// No statement with a result set has run.
    None,
    /// Rows may remain.
    Open,
    /// A short page was returned; only empty pages follow.
    Exhausted,
    /// A fetch failed; the cursor cannot be read any further.
    Failed,
}

/// Owns one backend session and executes statements on it.
///
/// The session is opened on the first [`execute`](Self::execute) and
/// released exactly once, either by [`close`](Self::close) or when the
/// connector is dropped.
#[derive(Debug)]
pub struct Connector {
    spec: ConnectionSpec,
    options: SessionOptions,
    session: Option<SessionHandle>,
    headers: Option<Vec<String>>,
    cursor: CursorState,
    closed: bool,
}

impl Connector {
    /// Creates an idle connector for the given spec.
    ///
    /// Validates the locator for its backend but does not connect.
    pub fn open(spec: ConnectionSpec) -> Result<Self> {
        let options = SessionOptions::from_spec(&spec)?;
        debug!(
            "Opened {} connector for {}",
            spec.backend(),
            spec.display_locator()
        );

        Ok(Self {
            spec,
            options,
            session: None,
            headers: None,
            cursor: CursorState::None,
            closed: false,
        })
    }

    /// Returns true while a backend session is held.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Executes a statement, opening the session first if needed.
    ///
    /// Any result set from a previous statement is discarded. Statements run
    /// in autocommit mode.
    pub async fn execute(&mut self, statement: &str) -> Result<ExecuteOutcome> {
        if self.closed {
            return Err(ConnectorError::config("Connector has already been closed"));
        }

        self.headers = None;
        self.cursor = CursorState::None;

        let count = count_statements(self.spec.backend(), statement).unwrap_or(1);
        if count > 1 {
            warn!("Rejected input holding {count} statements");
            return Err(ConnectorError::query_syntax(
                "You can only execute one statement at a time",
            ));
        }

        let session = match self.session.take() {
            Some(session) => session,
            None => self.options.connect().await?,
        };
        let session = self.session.insert(session);

        info!(
            "Executing statement on {} ({})",
            self.spec.backend(),
            self.spec.display_locator()
        );
        let outcome = match session.execute(statement).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if matches!(e, ConnectorError::Connection(_)) {
                    // The next execute opens a fresh session.
                    self.session = None;
                }
                return Err(e);
            }
        };

        match &outcome {
            ExecuteOutcome::ResultSet { headers } => {
                debug!("Statement opened a result set with {} columns", headers.len());
                self.headers = Some(headers.clone());
                self.cursor = CursorState::Open;
            }
            ExecuteOutcome::NoResultSet { rows_affected } => {
                info!("Statement produced no result set ({rows_affected} rows affected)");
            }
        }

        Ok(outcome)
    }

    /// Returns the column headers of the current result set, if any.
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    /// Returns up to `max_rows` further rows of the current result set.
    ///
    /// A page shorter than `max_rows` means the cursor is exhausted; every
    /// later call returns an empty page.
    pub async fn fetch_page(&mut self, max_rows: usize) -> Result<ResultPage> {
        if max_rows == 0 {
            return Err(ConnectorError::config("Page size must be positive"));
        }

        match self.cursor {
            CursorState::Open => {}
            CursorState::Exhausted => return Ok(Vec::new()),
            CursorState::Failed => {
                return Err(ConnectorError::connection(
                    "The result set is no longer readable; execute the statement again",
                ))
            }
            CursorState::None => {
                warn!("fetch_page called without an open result set");
                return Err(ConnectorError::config(
                    "No result set to fetch from; execute a query first",
                ));
            }
        }

        let session = self
            .session
            .as_ref()
            .ok_or_else(|| ConnectorError::config("No open database session"))?;

        match session.fetch(max_rows).await {
            Ok(page) => {
                if page.len() < max_rows {
                    debug!("Result set exhausted after a page of {} rows", page.len());
                    self.cursor = CursorState::Exhausted;
                }
                Ok(page)
            }
            Err(e) => {
                self.cursor = CursorState::Failed;
                Err(e)
            }
        }
    }

    /// Releases the backend session.
    ///
    /// Idempotent: later calls, or calls on a connector that never
    /// connected, do nothing.
    pub async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.cursor = CursorState::None;

        match self.session.take() {
            Some(session) => {
                debug!("Closing {} session", session.backend());
                session.close().await
            }
            None => Ok(()),
        }
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        if self.session.is_some() {
            // Dropping the handle closes the channel; the session task then
            // closes the connection on its own.
            debug!(
                "Connector for {} dropped with an open session",
                self.spec.backend()
            );
        }
    }
}
