use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    backend::{ClusterBackend, DynClusterBackend},
    bucket::Bucket,
    config::Credentials,
    error::DocumentStoreResult,
    options::{ClusterOptions, QueryOptions},
    query::Statement,
    rows::QueryResult,
    timeout::{deadline_after, with_deadline, with_timeout},
};

/// A connected cluster.
///
/// The cluster owns its backend connection. Buckets borrow the cluster, so it
/// cannot be closed while a bucket is still in use. Dropping the cluster
/// releases the connection; [`Cluster::close`] does the same and reports
/// failures.
#[derive(Debug)]
pub struct Cluster<B: ClusterBackend> {
    backend: B,
    options: ClusterOptions,
}

/// A cluster whose backend was chosen at runtime from the connection string.
pub type DynCluster = Cluster<Box<dyn DynClusterBackend>>;

impl<B: ClusterBackend> Cluster<B> {
    pub fn new(backend: B, options: ClusterOptions) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Opens a bucket with the given credentials.
    ///
    /// # Errors
    ///
    /// Fails with an authentication error when the credentials are rejected,
    /// a not-found error when the bucket does not exist and a timeout error
    /// after [`ClusterOptions::kv_timeout`].
    pub async fn open_bucket(
        &self,
        name: &str,
        credentials: Credentials,
    ) -> DocumentStoreResult<Bucket<'_, B>> {
        with_timeout(
            "open_bucket",
            self.options.kv_timeout,
            self.backend.open_bucket(name, &credentials),
        )
        .await
        .inspect_err(|e| warn!(bucket = name, principal = credentials.principal(), error = %e, "failed to open bucket"))?;

        info!(bucket = name, principal = credentials.principal(), "bucket opened");

        Ok(Bucket::new(name.to_string(), self))
    }

    /// Runs a statement with default options.
    pub async fn query(&self, statement: &str) -> DocumentStoreResult<QueryResult> {
        self.query_with_options(statement, QueryOptions::default())
            .await
    }

    /// Parses `statement`, binding the parameters in `options`, and starts running it.
    ///
    /// # Errors
    ///
    /// Fails with a query error when the statement is malformed, names an
    /// unknown bucket or is rejected by the service.
    pub async fn query_with_options(
        &self,
        statement: &str,
        options: QueryOptions,
    ) -> DocumentStoreResult<QueryResult> {
        let parsed = Statement::parse(statement, &options)
            .inspect_err(|e| warn!(statement, error = %e, "rejected query"))?;

        self.execute(parsed, options).await
    }

    /// Runs an already built [`Statement`].
    pub async fn execute(
        &self,
        statement: Statement,
        options: QueryOptions,
    ) -> DocumentStoreResult<QueryResult> {
        let timeout = options.timeout.unwrap_or(self.options.query_timeout);
        let started = Instant::now();
        let text = statement.to_string();

        debug!(statement = %text, keyspace = %statement.keyspace, "executing query");

        let rows = with_deadline(
            "query",
            deadline_after(started, timeout),
            timeout,
            self.backend.execute_query(statement),
        )
        .await
        .map_err(|e| e.into_query_error())
        .inspect_err(|e| warn!(statement = %text, error = %e, "query failed"))?;

        Ok(QueryResult::new(text, options.client_context_id, rows, started, timeout))
    }

    /// Closes the connection.
    pub async fn close(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;
        info!("cluster connection closed");

        Ok(())
    }
}
