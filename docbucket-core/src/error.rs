//! Error types and result types for cluster, bucket and query operations.
//!
//! Every fallible operation in the workspace returns [`DocumentStoreResult<T>`].
//! Callers that need to react differently to "document absent", "network failure"
//! and "malformed query" should match on [`DocumentStoreError::kind`].

use std::time::Duration;

use thiserror::Error;

/// Represents all possible errors that can occur when talking to a document cluster.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentStoreError {
    /// The endpoint is malformed, uses an unsupported scheme, is unreachable,
    /// or the connection broke while an operation was in flight.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The credentials were rejected for the given bucket.
    /// The first argument is the bucket name, the second the reason.
    #[error("Authentication failed for bucket {0}: {1}")]
    Authentication(String, String),
    /// The requested bucket does not exist on the cluster.
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),
    /// No document is stored under the key.
    /// The first argument is the key, the second is the bucket name.
    #[error("Document not found {0} in bucket {1}")]
    DocumentNotFound(String, String),
    /// Stored content could not be mapped onto the requested shape.
    #[error("Decoding error: {0}")]
    Decoding(String),
    /// The value passed to a write does not serialize to a JSON-like object.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The service failed to persist a write.
    #[error("Storage error: {0}")]
    Storage(String),
    /// The statement is invalid, or its execution failed on the service.
    #[error("Query error: {0}")]
    Query(String),
    /// The operation did not complete within its timeout.
    #[error("Operation {0} timed out after {1:?}")]
    Timeout(String, Duration),
}

/// Coarse classification of a [`DocumentStoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Authentication,
    NotFound,
    Decoding,
    Storage,
    Query,
    Timeout,
}

impl DocumentStoreError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentStoreError::Connection(_) => ErrorKind::Connection,
            DocumentStoreError::Authentication(..) => ErrorKind::Authentication,
            DocumentStoreError::BucketNotFound(_) | DocumentStoreError::DocumentNotFound(..) => {
                ErrorKind::NotFound
            }
            DocumentStoreError::Decoding(_) => ErrorKind::Decoding,
            DocumentStoreError::InvalidDocument(_) | DocumentStoreError::Storage(_) => {
                ErrorKind::Storage
            }
            DocumentStoreError::Query(_) => ErrorKind::Query,
            DocumentStoreError::Timeout(..) => ErrorKind::Timeout,
        }
    }

    /// Re-labels an error raised while a query was running as a query error.
    ///
    /// Timeouts and connection failures keep their kind; everything else a
    /// backend produced mid-stream becomes [`DocumentStoreError::Query`].
    pub fn into_query_error(self) -> Self {
        match self {
            err @ (DocumentStoreError::Query(_)
            | DocumentStoreError::Timeout(..)
            | DocumentStoreError::Connection(_)) => err,
            other => DocumentStoreError::Query(other.to_string()),
        }
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;
