//! In-memory cluster backend for docbucket.
//!
//! This crate provides a process-local document service and a `ClusterBackend`
//! that talks to it. It reproduces what a real cluster does from the client's
//! point of view (buckets, credentials, expiry, statement execution) and lets
//! tests take the service offline, slow it down or break a query mid-stream.
//!
//! # Features
//!
//! - **Shared servers** - every `memory://<host>` connection reaches the same server
//! - **Bucket access rules** - anonymous, user/password and token access
//! - **Statement execution** - filtering, ordering, paging and projection
//! - **Fault injection** - offline servers, latency and aborted queries
//!
//! # Quick Start
//!
//! ```ignore
//! use docbucket::{Cluster, ClusterOptions, Credentials, memory::MemoryCluster};
//! use docbucket::backend::ClusterBackendBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MemoryCluster::builder("memory://localhost").build().await?;
//!     let cluster = Cluster::new(backend, ClusterOptions::default());
//!     let bucket = cluster.open_bucket("default", Credentials::Anonymous).await?;
//!
//!     bucket.put("u:book1", &serde_json::json!({ "isbn": "978-1-4919-1889-0" })).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbucket_memory;

pub mod cluster;
pub mod server;
mod evaluator;
mod executor;

pub use cluster::{MemoryCluster, MemoryClusterBuilder};
pub use server::{BucketAccess, InMemoryServer};
