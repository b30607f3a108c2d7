//! [`ClusterBackend`] implementation over an [`InMemoryServer`].

use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use tracing::debug;

use docbucket_core::{
    backend::{ClusterBackend, ClusterBackendBuilder},
    config::{ConnectionString, Credentials},
    document::Content,
    error::{DocumentStoreError, DocumentStoreResult},
    query::Statement,
    rows::RowStream,
};

use crate::{executor, server::InMemoryServer};

/// Connection string scheme served by this backend.
pub const SCHEME: &str = "memory";


#[derive(Clone, Debug)]
pub struct MemoryCluster {
    server: Arc<InMemoryServer>,
}

impl MemoryCluster {
    pub fn new(server: Arc<InMemoryServer>) -> Self {
        Self { server }
    }

    pub fn builder(connection_string: impl Into<String>) -> MemoryClusterBuilder {
        MemoryClusterBuilder::new(connection_string)
    }

    /// The server this connection talks to.
    pub fn server(&self) -> &Arc<InMemoryServer> {
        &self.server
    }
}


#[async_trait]
impl ClusterBackend for MemoryCluster {
    async fn open_bucket(&self, bucket: &str, credentials: &Credentials) -> DocumentStoreResult<()> {
        self.server.round_trip().await?;
        self.server
            .authenticate(bucket, credentials)
            .await
    }

    async fn upsert_document(
        &self,
        bucket: &str,
        key: &str,
        content: Content,
        expires_at: Option<DateTime<Utc>>,
    ) -> DocumentStoreResult<()> {
        self.server.round_trip().await?;
        self.server
            .upsert(bucket, key, content, expires_at)
            .await
    }

    async fn get_document(&self, bucket: &str, key: &str) -> DocumentStoreResult<Option<Content>> {
        self.server.round_trip().await?;
        self.server.get(bucket, key).await
    }

    async fn execute_query(&self, statement: Statement) -> DocumentStoreResult<RowStream> {
        self.server.round_trip().await?;

        let documents = self.server.scan(&statement.keyspace).await?;
        let rows = executor::execute(&statement, documents)?;

        debug!(host = self.server.host(), keyspace = %statement.keyspace, rows = rows.len(), "statement executed");

        let rows = stream::iter(rows.into_iter().map(Ok));

        // An injected fault cuts the stream short with a service-side error
        Ok(match self.server.take_query_fault().await {
            Some(after) => rows
                .take(after)
                .chain(stream::once(async move {
                    Err(DocumentStoreError::Query(format!(
                        "request aborted by the query service after {after} rows"
                    )))
                }))
                .boxed(),
            None => rows.boxed(),
        })
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        debug!(host = self.server.host(), "closing in-memory connection");
        Ok(())
    }
}


/// Connects to the shared [`InMemoryServer`] named by a `memory://<host>` string.
#[derive(Debug, Clone)]
pub struct MemoryClusterBuilder {
    connection_string: String,
}

impl MemoryClusterBuilder {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self { connection_string: connection_string.into() }
    }
}

#[async_trait]
impl ClusterBackendBuilder for MemoryClusterBuilder {
    type Backend = MemoryCluster;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let connection = ConnectionString::parse(&self.connection_string)?;

        if connection.scheme() != SCHEME {
            return Err(DocumentStoreError::Connection(format!(
                "unsupported scheme {:?} for the in-memory backend",
                connection.scheme()
            )));
        }

        // Only the first host is used; there is no failover between servers
        let host = &connection.hosts()[0].host;
        let server = InMemoryServer::shared(host).await;
        server.round_trip().await?;

        Ok(MemoryCluster::new(server))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bson::doc;

    use super::*;
    use docbucket_core::{error::ErrorKind, options::QueryOptions};

    async fn connect(host: &str) -> MemoryCluster {
        MemoryCluster::builder(format!("memory://{host}"))
            .build()
            .await
            .unwrap()
    }

    fn select_all() -> Statement {
        Statement::parse("SELECT * FROM default", &QueryOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_builder_rejects_other_schemes_and_offline_servers() {
        let err = MemoryCluster::builder("couchbase://localhost").build().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);

        InMemoryServer::shared("cluster-tests-offline").await.set_online(false);
        let err = MemoryCluster::builder("memory://cluster-tests-offline").build().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_connections_share_the_host_server() {
        let first = connect("cluster-tests-shared").await;
        let second = connect("cluster-tests-shared").await;

        first
            .upsert_document("default", "k", doc! { "v": 1 }, None)
            .await
            .unwrap();
        assert_eq!(
            second.get_document("default", "k").await.unwrap(),
            Some(doc! { "v": 1 })
        );
    }

    #[tokio::test]
    async fn test_injected_fault_ends_stream_with_error() {
        let cluster = connect("cluster-tests-fault").await;
        for key in ["a", "b", "c"] {
            cluster
                .upsert_document("default", key, doc! { "k": key }, None)
                .await
                .unwrap();
        }

        cluster.server().fail_next_query_after(2).await;
        let items: Vec<_> = cluster.execute_query(select_all()).await.unwrap().collect().await;
        assert_eq!(items.len(), 3);
        assert!(items[..2].iter().all(Result::is_ok));
        assert_eq!(items[2].as_ref().unwrap_err().kind(), ErrorKind::Query);

        // The fault is one-shot
        let items: Vec<_> = cluster.execute_query(select_all()).await.unwrap().collect().await;
        assert!(items.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn test_unknown_keyspace_is_query_error() {
        let cluster = connect("cluster-tests-keyspace").await;
        let statement = Statement::parse("SELECT * FROM nowhere", &QueryOptions::default()).unwrap();

        match cluster.execute_query(statement).await {
            Err(err) => assert_eq!(err.kind(), ErrorKind::Query),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_requests() {
        let cluster = connect("cluster-tests-latency").await;
        cluster.server().set_latency(Duration::from_millis(300)).await;

        let started = tokio::time::Instant::now();
        cluster.get_document("default", "missing").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
