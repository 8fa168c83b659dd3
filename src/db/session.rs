//! Session tasks.
//!
//! sqlx row streams borrow their connection, so a cursor cannot be stored
//! next to the connection it reads from. Each session therefore runs as a
//! task that owns the connection and the open cursor, and the
//! [`SessionHandle`] talks to it over a channel. Dropping the handle closes
//! the channel, which makes the task close the connection.

use super::{BackendKind, ExecuteOutcome, ResultPage, Row, SessionBackend};
use crate::classifier::{classify, classify_runtime};
use crate::error::{ConnectorError, Result};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Maximum number of commands waiting for a session task.
const COMMAND_CHANNEL_CAPACITY: usize = 8;

/// Upper bound on the rows preallocated for a single page.
const PAGE_PREALLOC_LIMIT: usize = 1024;

/// Commands sent from a handle to its session task.
#[derive(Debug)]
enum SessionCommand {
    /// Run a statement, replacing any open cursor.
    Execute {
        sql: String,
        reply: oneshot::Sender<Result<ExecuteOutcome>>,
    },
    /// Pull up to `max_rows` rows from the open cursor.
    Fetch {
        max_rows: usize,
        reply: oneshot::Sender<Result<ResultPage>>,
    },
    /// Close the connection and stop the task.
    Close { reply: oneshot::Sender<Result<()>> },
}

/// Handle for communicating with a session task.
///
/// Not cloneable: exactly one owner may drive a session.
#[derive(Debug)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    backend: BackendKind,
}

impl SessionHandle {
    /// Starts a task that owns `backend` and returns its handle.
    pub(crate) fn spawn<B: SessionBackend>(backend: B) -> Self {
        let (sender, receiver) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        tokio::spawn(run_session(backend, receiver));
        debug!("Started {} session task", B::KIND);

        Self {
            sender,
            backend: B::KIND,
        }
    }

    /// Returns the backend this session is connected to.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Runs a statement on the session.
    pub async fn execute(&self, sql: &str) -> Result<ExecuteOutcome> {
        self.request(|reply| SessionCommand::Execute {
            sql: sql.to_string(),
            reply,
        })
        .await
    }

    /// Pulls the next page from the open cursor.
    pub async fn fetch(&self, max_rows: usize) -> Result<ResultPage> {
        self.request(|reply| SessionCommand::Fetch { max_rows, reply })
            .await
    }

    /// Closes the connection and waits for the task to finish.
    pub async fn close(self) -> Result<()> {
        self.request(|reply| SessionCommand::Close { reply }).await
    }

    /// Sends a command and waits for its reply.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T>>) -> SessionCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(command(reply))
            .await
            .map_err(|_| ConnectorError::connection("Database session has ended"))?;
        response
            .await
            .map_err(|_| ConnectorError::connection("Database session ended before replying"))?
    }
}

/// Main loop of a session task.
async fn run_session<B: SessionBackend>(
    mut backend: B,
    mut commands: mpsc::Receiver<SessionCommand>,
) {
    let mut next = commands.recv().await;

    while let Some(command) = next.take() {
        next = match command {
            SessionCommand::Execute { sql, reply } => {
                run_statement(&mut backend, &sql, reply, &mut commands).await
            }
            SessionCommand::Fetch { reply, .. } => {
                let _ = reply.send(Err(ConnectorError::config(
                    "No open result set to fetch from",
                )));
                commands.recv().await
            }
            SessionCommand::Close { reply } => {
                let _ = reply.send(backend.close().await.map_err(|e| classify(B::KIND, e)));
                debug!("{} session closed", B::KIND);
                return;
            }
        };
    }

    debug!("{} session handle dropped, closing connection", B::KIND);
    if let Err(e) = backend.close().await {
        warn!("Failed to close {} session cleanly: {e}", B::KIND);
    }
}

/// Runs one statement, then serves fetches from its cursor until a command
/// arrives that the cursor cannot handle. Returns that command.
async fn run_statement<B: SessionBackend>(
    backend: &mut B,
    sql: &str,
    reply: oneshot::Sender<Result<ExecuteOutcome>>,
    commands: &mut mpsc::Receiver<SessionCommand>,
) -> Option<SessionCommand> {
    let headers = match backend.describe(sql).await {
        Ok(headers) => headers,
        Err(e) => {
            let _ = reply.send(Err(classify(B::KIND, e)));
            return commands.recv().await;
        }
    };

    if headers.is_empty() {
        let outcome = backend
            .execute(sql)
            .await
            .map(|rows_affected| ExecuteOutcome::NoResultSet { rows_affected })
            .map_err(|e| classify_runtime(B::KIND, e));
        let _ = reply.send(outcome);
        return commands.recv().await;
    }

    let mut cursor = Cursor::new(B::KIND, headers.len(), backend.rows(sql));
    // Pull the first row now so runtime failures are reported by execute.
    if let Err(e) = cursor.prime().await {
        let _ = reply.send(Err(e));
        return commands.recv().await;
    }
    let _ = reply.send(Ok(ExecuteOutcome::ResultSet { headers }));

    loop {
        match commands.recv().await? {
            SessionCommand::Fetch { max_rows, reply } => {
                let _ = reply.send(cursor.next_page(max_rows).await);
            }
            other => return Some(other),
        }
    }
}

/// An open row stream with one row of lookahead.
struct Cursor<'a> {
    backend: BackendKind,
    width: usize,
    rows: BoxStream<'a, std::result::Result<Row, sqlx::Error>>,
    peeked: Option<Row>,
    done: bool,
}

impl<'a> Cursor<'a> {
    fn new(
        backend: BackendKind,
        width: usize,
        rows: BoxStream<'a, std::result::Result<Row, sqlx::Error>>,
    ) -> Self {
        Self {
            backend,
            width,
            rows,
            peeked: None,
            done: false,
        }
    }

    /// Pulls the first row into the lookahead slot.
    async fn prime(&mut self) -> Result<()> {
        self.peeked = self.pull().await?;
        Ok(())
    }

    /// Returns up to `max_rows` rows; fewer only once the stream has ended.
    async fn next_page(&mut self, max_rows: usize) -> Result<ResultPage> {
        let mut page = Vec::with_capacity(max_rows.min(PAGE_PREALLOC_LIMIT));

        if max_rows > 0 {
            if let Some(row) = self.peeked.take() {
                page.push(row);
            }
        }

        while page.len() < max_rows {
            match self.pull().await? {
                Some(row) => page.push(row),
                None => break,
            }
        }

        Ok(page)
    }

    async fn pull(&mut self) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }

        match self.rows.try_next().await {
            // Every row must match the described headers.
            Ok(Some(row)) if row.len() != self.width => {
                self.done = true;
                Err(ConnectorError::unexpected(format!(
                    "Row has {} columns but the result set has {}",
                    row.len(),
                    self.width
                )))
            }
            Ok(Some(row)) => Ok(Some(row)),
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(classify_runtime(self.backend, e))
            }
        }
    }
}
