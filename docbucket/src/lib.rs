//! Main docbucket crate providing a typed client for bucket-oriented document databases.
//!
//! This crate is the primary entry point for users of docbucket. It re-exports
//! the core types from the sub-crates, picks a backend from the connection
//! string and ships the [`Book`](book::Book) record used by the demo program.
//!
//! # Features
//!
//! - **Typed documents** - Any serde type whose serialized form is an object can be stored
//! - **Upsert and fetch by key** - `put` creates or fully replaces, `get` decodes into your type
//! - **Statements** - `SELECT ... FROM <bucket> WHERE ...` with lazily streamed rows
//! - **Multiple backends** - In-memory and MongoDB, selected from the connection string scheme
//!
//! # Quick Start
//!
//! ```ignore
//! use docbucket::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let cluster = connect("memory://localhost", ClusterOptions::default()).await?;
//!     let bucket = cluster.open_bucket("default", Credentials::Anonymous).await?;
//!
//!     let book = Book::new("978-1-4919-1889-0", "Minecraft Modding with Forge", "29.99");
//!     bucket.put("u:book1", &book).await?;
//!
//!     let stored: Book = bucket.get("u:book1").await?;
//!     assert_eq!(stored, book);
//!
//!     let mut rows = bucket.query("SELECT * FROM default").await?;
//!     while let Some(row) = rows.next().await {
//!         println!("Row: {}", row?.to_json()?);
//!     }
//!
//!     drop(bucket);
//!     cluster.close().await
//! }
//! ```
//!
//! # Static Dispatch
//!
//! [`connect`] returns a [`DynCluster`](cluster::DynCluster) whose backend is
//! chosen at runtime. When the backend is known up front, build it directly
//! and wrap it in a [`Cluster`](cluster::Cluster):
//!
//! ```ignore
//! use docbucket::{prelude::*, memory::MemoryCluster};
//!
//! let backend = MemoryCluster::builder("memory://localhost").build().await?;
//! let cluster = Cluster::new(backend, ClusterOptions::default());
//! ```
//!
//! # Queries
//!
//! Statements are parsed on the client. Parameters are bound from
//! [`QueryOptions`](options::QueryOptions):
//!
//! ```ignore
//! let options = QueryOptions::new()
//!     .named_parameter("max", "30.00")
//!     .timeout(Duration::from_secs(5));
//!
//! let cheap: Vec<Book> = cluster
//!     .query_with_options("SELECT b.* FROM default b WHERE b.cost < $max ORDER BY b.name", options)
//!     .await?
//!     .rows_as()
//!     .await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Process-local server for development and testing
//! - [`mongodb`] - MongoDB backend (requires the `mongodb` feature)

pub mod book;
mod connect;
pub mod prelude;

pub use connect::connect;
pub use docbucket_core::{backend, bucket, cluster, config, document, error, options, query, rows, timeout};

// Re-export BSON types for convenience
pub use bson;

/// In-memory backend.
pub mod memory {
    pub use docbucket_memory::{
        BucketAccess, InMemoryServer, MemoryCluster, MemoryClusterBuilder,
        cluster::SCHEME,
        server::DEFAULT_BUCKET,
    };
}

/// MongoDB backend.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docbucket_mongodb::{MongoCluster, MongoClusterBuilder};
}
