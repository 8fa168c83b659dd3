//! Incremental, two-tier paginated view of a result set.
//!
//! Rows are pulled from the backend in large batches (`fetch_batch`) and
//! revealed to the display layer in small ones (`display_batch`). The model
//! only fetches once every materialized row has been revealed, so it never
//! runs more than one fetch batch ahead of the display.

use crate::connector::Connector;
use crate::db::{ResultPage, Row, Value};
use crate::error::{ConnectorError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default number of rows revealed per growth step.
pub const DEFAULT_DISPLAY_BATCH: usize = 25;

/// Default number of rows pulled from the backend per round trip.
pub const DEFAULT_FETCH_BATCH: usize = 1000;

/// Batch sizes for a [`ResultModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Rows pulled from the backend per round trip.
    #[serde(default = "default_fetch_batch")]
    pub fetch_batch: usize,

    /// Rows revealed to the display layer per growth step.
    #[serde(default = "default_display_batch")]
    pub display_batch: usize,
}

fn default_fetch_batch() -> usize {
    DEFAULT_FETCH_BATCH
}

fn default_display_batch() -> usize {
    DEFAULT_DISPLAY_BATCH
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            fetch_batch: DEFAULT_FETCH_BATCH,
            display_batch: DEFAULT_DISPLAY_BATCH,
        }
    }
}

impl Pagination {
    /// Creates pagination settings, rejecting zero-sized batches.
    pub fn new(fetch_batch: usize, display_batch: usize) -> Result<Self> {
        let pagination = Self {
            fetch_batch,
            display_batch,
        };
        pagination.validate()?;
        Ok(pagination)
    }

    /// Checks that both batch sizes are positive.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_batch == 0 {
            return Err(ConnectorError::config("fetch_batch must be at least 1"));
        }
        if self.display_batch == 0 {
            return Err(ConnectorError::config("display_batch must be at least 1"));
        }
        Ok(())
    }
}

/// Anything a [`ResultModel`] can pull pages from.
#[async_trait]
pub trait PageSource: Send {
    /// Returns up to `max_rows` further rows; fewer means exhausted.
    async fn fetch_page(&mut self, max_rows: usize) -> Result<ResultPage>;
}

#[async_trait]
impl PageSource for Connector {
    async fn fetch_page(&mut self, max_rows: usize) -> Result<ResultPage> {
        Connector::fetch_page(self, max_rows).await
    }
}

/// A virtual, growable table backed by an optional page source.
///
/// Holds the source by mutable borrow, so the source (usually a
/// [`Connector`]) must outlive the model's growth phase.
pub struct ResultModel<'s> {
    headers: Vec<String>,
    materialized: Vec<Row>,
    revealed: usize,
    source: Option<&'s mut dyn PageSource>,
    exhausted: bool,
    pagination: Pagination,
}

impl<'s> ResultModel<'s> {
    /// Creates a model from headers, an already-fetched first page and an
    /// optional source for further pages.
    ///
    /// Fails with a configuration error if either batch size is zero.
    pub fn new(
        headers: Vec<String>,
        initial: ResultPage,
        source: Option<&'s mut dyn PageSource>,
        pagination: Pagination,
    ) -> Result<Self> {
        pagination.validate()?;

        let exhausted = source.is_none() || initial.len() < pagination.fetch_batch;
        let revealed = initial.len().min(pagination.display_batch);

        Ok(Self {
            headers,
            materialized: initial,
            revealed,
            source,
            exhausted,
            pagination,
        })
    }

    /// Creates a static model over rows that are already in memory.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Row>, pagination: Pagination) -> Result<Self> {
        Self::new(headers, rows, None, pagination)
    }

    /// Builds a model over the connector's current result set.
    ///
    /// Returns `Ok(None)` when the last statement produced no result set;
    /// otherwise fetches the first batch and wraps the connector.
    pub async fn load(connector: &'s mut Connector, pagination: Pagination) -> Result<Option<Self>> {
        pagination.validate()?;

        let Some(headers) = connector.headers().map(<[String]>::to_vec) else {
            return Ok(None);
        };

        let initial = connector.fetch_page(pagination.fetch_batch).await?;
        debug!(
            "Loaded result model with {} columns and {} initial rows",
            headers.len(),
            initial.len()
        );

        Self::new(
            headers,
            initial,
            Some(connector as &mut dyn PageSource),
            pagination,
        )
        .map(Some)
    }

    /// Returns the column headers.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the number of rows the display layer may read.
    pub fn row_count(&self) -> usize {
        self.revealed
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Returns the number of rows held in memory, revealed or not.
    pub fn materialized_count(&self) -> usize {
        self.materialized.len()
    }

    /// Returns the value at a revealed cell, or `None` when out of range.
    ///
    /// Never fetches.
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Value> {
        if row >= self.revealed || col >= self.column_count() {
            return None;
        }
        self.materialized.get(row).and_then(|r| r.get(col))
    }

    /// Returns the revealed rows.
    pub fn revealed_rows(&self) -> &[Row] {
        &self.materialized[..self.revealed]
    }

    /// Reports whether [`grow_by`](Self::grow_by) would reveal more rows.
    ///
    /// When every materialized row is already revealed and the source still
    /// has rows, this fetches one more batch first. A failed fetch is
    /// returned and the model stops growing.
    pub async fn can_grow(&mut self) -> Result<bool> {
        if self.revealed < self.materialized.len() {
            return Ok(true);
        }
        if self.exhausted {
            return Ok(false);
        }

        let Some(source) = self.source.as_deref_mut() else {
            self.exhausted = true;
            return Ok(false);
        };

        let fetch_batch = self.pagination.fetch_batch;
        let page = match source.fetch_page(fetch_batch).await {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        if page.len() < fetch_batch {
            self.exhausted = true;
        }
        debug!(
            "Materialized {} more rows ({} total)",
            page.len(),
            self.materialized.len() + page.len()
        );
        self.materialized.extend(page);

        Ok(self.revealed < self.materialized.len())
    }

    /// Reveals up to one display batch of materialized rows.
    ///
    /// Returns how many rows were revealed. Never fetches.
    pub fn grow_by(&mut self) -> usize {
        let step = self
            .pagination
            .display_batch
            .min(self.materialized.len() - self.revealed);
        self.revealed += step;
        step
    }

    /// Returns true once every row is revealed and the source has no more.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.revealed == self.materialized.len()
    }
}

impl std::fmt::Debug for ResultModel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultModel")
            .field("headers", &self.headers)
            .field("materialized", &self.materialized.len())
            .field("revealed", &self.revealed)
            .field("has_source", &self.source.is_some())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
