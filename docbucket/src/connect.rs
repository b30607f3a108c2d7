//! Connection string dispatch.

use tracing::{info, warn};

use docbucket_core::{
    backend::{ClusterBackendBuilder, DynClusterBackend},
    cluster::{Cluster, DynCluster},
    config::ConnectionString,
    error::{DocumentStoreError, DocumentStoreResult},
    options::ClusterOptions,
    timeout::with_timeout,
};
use docbucket_memory::cluster::{MemoryCluster, SCHEME as MEMORY_SCHEME};

/// Connects to the cluster named by `connection_string`, choosing the backend
/// from its scheme.
///
/// | scheme | backend |
/// |---|---|
/// | `memory` | [`MemoryCluster`] |
/// | `mongodb`, `mongodb+srv` | `MongoCluster` (requires the `mongodb` feature) |
///
/// # Errors
///
/// Fails with [`DocumentStoreError::Connection`] when the string is malformed,
/// the scheme is not supported or the service cannot be reached, and with
/// [`DocumentStoreError::Timeout`] after [`ClusterOptions::connect_timeout`].
///
/// # Example
///
/// ```ignore
/// let cluster = docbucket::connect("memory://localhost", ClusterOptions::default()).await?;
/// let bucket = cluster.open_bucket("default", Credentials::Anonymous).await?;
/// ```
pub async fn connect(connection_string: &str, options: ClusterOptions) -> DocumentStoreResult<DynCluster> {
    let connection = ConnectionString::parse(connection_string)
        .inspect_err(|e| warn!(error = %e, "rejected connection string"))?;

    let backend = with_timeout(
        "connect",
        options.connect_timeout,
        build_backend(&connection, &options),
    )
    .await
    .inspect_err(|e| warn!(scheme = connection.scheme(), error = %e, "failed to connect"))?;

    info!(scheme = connection.scheme(), hosts = connection.hosts().len(), "connected");

    Ok(Cluster::new(backend, options))
}

#[cfg_attr(not(feature = "mongodb"), allow(unused_variables))]
async fn build_backend(
    connection: &ConnectionString,
    options: &ClusterOptions,
) -> DocumentStoreResult<Box<dyn DynClusterBackend>> {
    match connection.scheme() {
        MEMORY_SCHEME => Ok(Box::new(
            MemoryCluster::builder(connection.as_str())
                .build()
                .await?,
        )),
        #[cfg(feature = "mongodb")]
        "mongodb" | "mongodb+srv" => Ok(Box::new(
            docbucket_mongodb::MongoCluster::builder(connection.as_str())
                .connect_timeout(options.connect_timeout)
                .build()
                .await?,
        )),
        other => Err(DocumentStoreError::Connection(format!("unsupported scheme {other:?}"))),
    }
}
