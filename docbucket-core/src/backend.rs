//! Cluster backend abstraction.
//!
//! A backend is the client library for one kind of document service. The
//! [`Cluster`](crate::cluster::Cluster) and [`Bucket`](crate::bucket::Bucket)
//! handles turn typed calls into the untyped operations below, and apply
//! timeouts, logging and error classification on top.
//!
//! # Traits
//!
//! - [`ClusterBackend`]: The core trait for backends
//! - [`DynClusterBackend`]: Object-safe form used behind `Box<dyn ...>`
//! - [`ClusterBackendBuilder`]: Factory trait for connecting a backend
//!
//! # Examples
//!
//! ```ignore
//! use docbucket::backend::ClusterBackend;
//! use bson::doc;
//!
//! backend.open_bucket("default", &Credentials::Anonymous).await?;
//! backend.upsert_document("default", "u:book1", doc! { "isbn": "978-1-4919-1889-0" }, None).await?;
//! let stored = backend.get_document("default", "u:book1").await?;
//! ```

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    config::Credentials,
    document::Content,
    error::DocumentStoreResult,
    query::Statement,
    rows::RowStream,
};

/// Abstract interface to a document service.
///
/// Implementations must be thread-safe; independent operations may be issued
/// concurrently through shared references.
#[async_trait]
pub trait ClusterBackend: Send + Sync + Debug {
    /// Checks that `bucket` exists and accepts `credentials`.
    ///
    /// # Errors
    ///
    /// - [`BucketNotFound`](crate::error::DocumentStoreError::BucketNotFound) if there is no such bucket
    /// - [`Authentication`](crate::error::DocumentStoreError::Authentication) if the credentials are rejected
    /// - [`Connection`](crate::error::DocumentStoreError::Connection) if the service is unreachable
    async fn open_bucket(&self, bucket: &str, credentials: &Credentials) -> DocumentStoreResult<()>;

    /// Creates or fully replaces the document stored under `key`.
    ///
    /// `expires_at` is the instant after which the document is no longer visible;
    /// `None` keeps it forever.
    async fn upsert_document(
        &self,
        bucket: &str,
        key: &str,
        content: Content,
        expires_at: Option<DateTime<Utc>>,
    ) -> DocumentStoreResult<()>;

    /// Fetches the document stored under `key`, or `None` when there is none
    /// (or it has expired).
    async fn get_document(&self, bucket: &str, key: &str) -> DocumentStoreResult<Option<Content>>;

    /// Starts executing a parsed statement and returns its rows as a stream.
    ///
    /// Errors returned here happen before the first row. Errors the service
    /// reports later are yielded through the stream.
    async fn execute_query(&self, statement: Statement) -> DocumentStoreResult<RowStream>;

    /// Releases the connection.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait DynClusterBackend: Send + Sync + Debug {
    async fn open_bucket(&self, bucket: &str, credentials: &Credentials) -> DocumentStoreResult<()>;
    async fn upsert_document(
        &self,
        bucket: &str,
        key: &str,
        content: Content,
        expires_at: Option<DateTime<Utc>>,
    ) -> DocumentStoreResult<()>;
    async fn get_document(&self, bucket: &str, key: &str) -> DocumentStoreResult<Option<Content>>;
    async fn execute_query(&self, statement: Statement) -> DocumentStoreResult<RowStream>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B: ClusterBackend + 'static> DynClusterBackend for B {
    async fn open_bucket(&self, bucket: &str, credentials: &Credentials) -> DocumentStoreResult<()> {
        ClusterBackend::open_bucket(self, bucket, credentials).await
    }

    async fn upsert_document(
        &self,
        bucket: &str,
        key: &str,
        content: Content,
        expires_at: Option<DateTime<Utc>>,
    ) -> DocumentStoreResult<()> {
        ClusterBackend::upsert_document(self, bucket, key, content, expires_at).await
    }

    async fn get_document(&self, bucket: &str, key: &str) -> DocumentStoreResult<Option<Content>> {
        ClusterBackend::get_document(self, bucket, key).await
    }

    async fn execute_query(&self, statement: Statement) -> DocumentStoreResult<RowStream> {
        ClusterBackend::execute_query(self, statement).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        (*self).shutdown().await
    }
}

#[async_trait]
impl ClusterBackend for Box<dyn DynClusterBackend> {
    async fn open_bucket(&self, bucket: &str, credentials: &Credentials) -> DocumentStoreResult<()> {
        (**self).open_bucket(bucket, credentials).await
    }

    async fn upsert_document(
        &self,
        bucket: &str,
        key: &str,
        content: Content,
        expires_at: Option<DateTime<Utc>>,
    ) -> DocumentStoreResult<()> {
        (**self)
            .upsert_document(bucket, key, content, expires_at)
            .await
    }

    async fn get_document(&self, bucket: &str, key: &str) -> DocumentStoreResult<Option<Content>> {
        (**self).get_document(bucket, key).await
    }

    async fn execute_query(&self, statement: Statement) -> DocumentStoreResult<RowStream> {
        (**self).execute_query(statement).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown_boxed().await
    }
}

/// Connects a backend.
///
/// # Examples
///
/// ```ignore
/// let backend = MemoryClusterBuilder::new("memory://localhost").build().await?;
/// let cluster = Cluster::new(backend, ClusterOptions::default());
/// ```
#[async_trait]
pub trait ClusterBackendBuilder {
    type Backend: ClusterBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
