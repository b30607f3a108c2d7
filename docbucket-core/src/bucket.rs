use std::{marker::PhantomData, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    backend::ClusterBackend,
    cluster::Cluster,
    document::{Document, from_content, to_content},
    error::{DocumentStoreError, DocumentStoreResult},
    options::{GetOptions, PutOptions, QueryOptions},
    query::{Expr, Projection, Statement},
    rows::{QueryResult, Row},
    timeout::with_timeout,
};

/// An open bucket.
///
/// Obtained from [`Cluster::open_bucket`]. The bucket borrows its cluster and
/// is cheap to copy around by reference.
#[derive(Debug)]
pub struct Bucket<'a, B: ClusterBackend> {
    name: String,
    cluster: &'a Cluster<B>,
}

impl<'a, B: ClusterBackend> Bucket<'a, B> {
    pub(crate) fn new(name: String, cluster: &'a Cluster<B>) -> Self {
        Self { name, cluster }
    }

    /// Returns the name of this bucket.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a view of this bucket fixed to one document type.
    pub fn typed<D: Document>(&self) -> TypedBucket<'a, B, D> {
        TypedBucket {
            bucket: Bucket::new(self.name.clone(), self.cluster),
            _marker: PhantomData,
        }
    }

    /// Stores `document` under `key`, replacing whatever was there.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document does not serialize to an object
    /// or the write fails.
    pub async fn put<D: Document>(&self, key: &str, document: &D) -> DocumentStoreResult<()> {
        self.put_with_options(key, document, PutOptions::default())
            .await
    }

    /// Like [`Bucket::put`], with an expiry and timeout override.
    pub async fn put_with_options<D: Document>(
        &self,
        key: &str,
        document: &D,
        options: PutOptions,
    ) -> DocumentStoreResult<()> {
        let content = to_content(document)?;
        let expires_at = expiry_instant(options.expiry)?;

        debug!(bucket = %self.name, key, expiry = ?options.expiry, "put");

        with_timeout(
            "put",
            options.timeout.unwrap_or(self.cluster.options().kv_timeout),
            self.cluster
                .backend()
                .upsert_document(&self.name, key, content, expires_at),
        )
        .await
        .map_err(into_write_error)
        .inspect_err(|e| warn!(bucket = %self.name, key, error = %e, "put failed"))
    }

    /// Fetches the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if there is no such
    /// document and [`DocumentStoreError::Decoding`] if it does not match `D`.
    pub async fn get<D: Document>(&self, key: &str) -> DocumentStoreResult<D> {
        self.get_with_options(key, GetOptions::default())
            .await
    }

    pub async fn get_with_options<D: Document>(
        &self,
        key: &str,
        options: GetOptions,
    ) -> DocumentStoreResult<D> {
        from_content(self.fetch(key, options).await?)
    }

    /// Fetches the stored object under `key` without decoding it.
    pub async fn get_content(&self, key: &str) -> DocumentStoreResult<Row> {
        Ok(Row::new(self.fetch(key, GetOptions::default()).await?))
    }

    /// Returns whether a document is stored under `key`.
    pub async fn exists(&self, key: &str) -> DocumentStoreResult<bool> {
        Ok(self
            .lookup(key, GetOptions::default())
            .await?
            .is_some())
    }

    /// Runs a statement. Queries are not restricted to this bucket: the
    /// keyspace is whatever the `FROM` clause names.
    pub async fn query(&self, statement: &str) -> DocumentStoreResult<QueryResult> {
        self.cluster.query(statement).await
    }

    pub async fn query_with_options(
        &self,
        statement: &str,
        options: QueryOptions,
    ) -> DocumentStoreResult<QueryResult> {
        self.cluster
            .query_with_options(statement, options)
            .await
    }

    async fn fetch(&self, key: &str, options: GetOptions) -> DocumentStoreResult<bson::Document> {
        self.lookup(key, options)
            .await?
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(key.to_string(), self.name.clone()))
    }

    async fn lookup(
        &self,
        key: &str,
        options: GetOptions,
    ) -> DocumentStoreResult<Option<bson::Document>> {
        debug!(bucket = %self.name, key, "get");

        with_timeout(
            "get",
            options.timeout.unwrap_or(self.cluster.options().kv_timeout),
            self.cluster.backend().get_document(&self.name, key),
        )
        .await
        .inspect_err(|e| warn!(bucket = %self.name, key, error = %e, "get failed"))
    }
}

/// Reports a failed write as a storage error, whatever the backend called it.
/// Timeouts and rejected documents keep their own variants.
fn into_write_error(error: DocumentStoreError) -> DocumentStoreError {
    match error {
        err @ (DocumentStoreError::Storage(_)
        | DocumentStoreError::InvalidDocument(_)
        | DocumentStoreError::Timeout(..)) => err,
        other => DocumentStoreError::Storage(other.to_string()),
    }
}

fn expiry_instant(expiry: Duration) -> DocumentStoreResult<Option<DateTime<Utc>>> {
    if expiry.is_zero() {
        return Ok(None);
    }

    chrono::Duration::from_std(expiry)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .map(Some)
        .ok_or_else(|| DocumentStoreError::Storage(format!("expiry {expiry:?} is out of range")))
}

/// A bucket view bound to one document type.
#[derive(Debug)]
pub struct TypedBucket<'a, B: ClusterBackend, D: Document> {
    bucket: Bucket<'a, B>,
    _marker: PhantomData<D>,
}

impl<'a, B: ClusterBackend, D: Document> TypedBucket<'a, B, D> {
    /// Returns the name of this bucket.
    pub fn name(&self) -> &str {
        self.bucket.name()
    }

    /// Switches to a different document type for the same bucket.
    pub fn with_type<T: Document>(&self) -> TypedBucket<'a, B, T> {
        self.bucket.typed()
    }

    pub async fn put(&self, key: &str, document: &D) -> DocumentStoreResult<()> {
        self.bucket.put(key, document).await
    }

    pub async fn put_with_options(
        &self,
        key: &str,
        document: &D,
        options: PutOptions,
    ) -> DocumentStoreResult<()> {
        self.bucket
            .put_with_options(key, document, options)
            .await
    }

    pub async fn get(&self, key: &str) -> DocumentStoreResult<D> {
        self.bucket.get(key).await
    }

    pub async fn exists(&self, key: &str) -> DocumentStoreResult<bool> {
        self.bucket.exists(key).await
    }

    /// Returns every document of this bucket matching `filter`, decoded as `D`.
    ///
    /// # Errors
    ///
    /// Fails with a decoding error on the first matching document that is not a `D`.
    pub async fn find(&self, filter: Option<Expr>) -> DocumentStoreResult<Vec<D>> {
        let mut statement = Statement::builder(self.name()).projection(Projection::Document);
        if let Some(filter) = filter {
            statement = statement.filter(filter);
        }

        self.bucket
            .cluster
            .execute(statement.build(), QueryOptions::default())
            .await?
            .rows_as()
            .await
    }
}
