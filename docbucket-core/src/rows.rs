//! Query result rows and the lazy, single-pass row sequence.

use std::time::Duration;

use bson::Bson;
use futures::{Stream, StreamExt, stream, stream::BoxStream};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::{
    document::{Content, from_content},
    error::{DocumentStoreError, DocumentStoreResult},
    query::resolve_path,
    timeout::deadline_after,
};

/// The stream of rows a backend produces for one statement.
pub type RowStream = BoxStream<'static, DocumentStoreResult<Row>>;

/// One untyped query result.
///
/// Its shape depends on the statement's projection. Use [`Row::content_as`] to
/// read it into a typed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Content);

impl Row {
    pub fn new(content: Content) -> Self {
        Row(content)
    }

    /// Returns a top-level field of the row.
    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.0.get(field)
    }

    /// Returns a nested field by dotted path, e.g. `default.isbn`.
    pub fn get_path(&self, path: &str) -> Option<&Bson> {
        resolve_path(&self.0, path)
    }

    pub fn as_document(&self) -> &Content {
        &self.0
    }

    pub fn into_document(self) -> Content {
        self.0
    }

    /// Decodes the row into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Decoding`] if the row does not match `T`.
    pub fn content_as<T: DeserializeOwned>(&self) -> DocumentStoreResult<T> {
        from_content(self.0.clone())
    }

    /// Renders the row as a JSON object.
    pub fn to_json(&self) -> DocumentStoreResult<serde_json::Value> {
        serde_json::to_value(&self.0).map_err(|e| DocumentStoreError::Decoding(e.to_string()))
    }
}

impl From<Content> for Row {
    fn from(content: Content) -> Self {
        Row(content)
    }
}

/// Final state of a query request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Running,
    Success,
    Errors,
    Timeout,
}

/// Request-level information about a query, complete once its rows are exhausted.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMetaData {
    pub request_id: uuid::Uuid,
    pub client_context_id: String,
    pub statement: String,
    pub status: QueryStatus,
    pub result_count: u64,
    pub elapsed: Duration,
}

/// The lazy result of a query.
///
/// Rows are pulled one at a time with [`QueryResult::next`]. The sequence can
/// only be walked once: after the last row, an error or a timeout, every
/// further call returns `None`. The query deadline covers the whole walk.
pub struct QueryResult {
    rows: Option<RowStream>,
    started: Instant,
    deadline: Option<Instant>,
    timeout: Duration,
    meta: QueryMetaData,
}

impl std::fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResult")
            .field("finished", &self.rows.is_none())
            .field("meta", &self.meta)
            .finish()
    }
}

impl QueryResult {
    pub(crate) fn new(
        statement: String,
        client_context_id: Option<String>,
        rows: RowStream,
        started: Instant,
        timeout: Duration,
    ) -> Self {
        let request_id = uuid::Uuid::new_v4();

        Self {
            rows: Some(rows),
            started,
            deadline: deadline_after(started, timeout),
            timeout,
            meta: QueryMetaData {
                request_id,
                client_context_id: client_context_id.unwrap_or_else(|| request_id.to_string()),
                statement,
                status: QueryStatus::Running,
                result_count: 0,
                elapsed: Duration::ZERO,
            },
        }
    }

    /// Pulls the next row.
    ///
    /// Returns `None` once the results are exhausted. A failure reported by the
    /// service after some rows were delivered comes back as a
    /// [`DocumentStoreError::Query`]; the sequence then ends.
    pub async fn next(&mut self) -> Option<DocumentStoreResult<Row>> {
        let rows = self.rows.as_mut()?;

        let next = match self.deadline {
            Some(deadline) => timeout_at(deadline, rows.next()).await,
            None => Ok(rows.next().await),
        };

        match next {
            Ok(Some(Ok(row))) => {
                self.meta.result_count += 1;
                Some(Ok(row))
            }
            Ok(Some(Err(e))) => {
                let e = e.into_query_error();
                warn!(
                    request_id = %self.meta.request_id,
                    rows = self.meta.result_count,
                    error = %e,
                    "query failed mid-stream"
                );
                self.finish(QueryStatus::Errors);
                Some(Err(e))
            }
            Ok(None) => {
                self.finish(QueryStatus::Success);
                None
            }
            Err(_) => {
                warn!(
                    request_id = %self.meta.request_id,
                    timeout = ?self.timeout,
                    "query timed out"
                );
                self.finish(QueryStatus::Timeout);
                Some(Err(DocumentStoreError::Timeout("query".to_string(), self.timeout)))
            }
        }
    }

    /// Pulls the next row decoded into `T`.
    pub async fn next_as<T: DeserializeOwned>(&mut self) -> Option<DocumentStoreResult<T>> {
        Some(self.next().await?.and_then(|row| row.content_as()))
    }

    /// Collects every remaining row, failing on the first error.
    pub async fn rows(mut self) -> DocumentStoreResult<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await {
            rows.push(row?);
        }

        Ok(rows)
    }

    /// Collects every remaining row decoded into `T`.
    pub async fn rows_as<T: DeserializeOwned>(mut self) -> DocumentStoreResult<Vec<T>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_as().await {
            rows.push(row?);
        }

        Ok(rows)
    }

    /// Turns the result into a [`Stream`] of rows.
    pub fn into_stream(self) -> impl Stream<Item = DocumentStoreResult<Row>> + Send {
        stream::unfold(self, |mut result| async move {
            let row = result.next().await?;
            Some((row, result))
        })
    }

    /// Request information, available once the sequence has ended.
    pub fn meta_data(&self) -> Option<&QueryMetaData> {
        match self.meta.status {
            QueryStatus::Running => None,
            _ => Some(&self.meta),
        }
    }

    fn finish(&mut self, status: QueryStatus) {
        self.rows = None;
        self.meta.status = status;
        self.meta.elapsed = self.started.elapsed();

        debug!(
            request_id = %self.meta.request_id,
            client_context_id = %self.meta.client_context_id,
            status = ?status,
            rows = self.meta.result_count,
            elapsed = ?self.meta.elapsed,
            "query finished"
        );
    }
}
