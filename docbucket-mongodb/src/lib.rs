//! MongoDB backend implementation for docbucket.
//!
//! This crate provides a `ClusterBackend` that keeps each bucket in its own
//! MongoDB database and runs statements through MongoDB's query engine.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docbucket = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Server-side queries** - Filters, ordering and paging run on the server
//! - **Per-bucket credentials** - Buckets opened with a password get their own client
//! - **Expiry** - Expired documents are hidden from reads and queries
//!
//! # Example
//!
//! ```ignore
//! use docbucket::{Cluster, ClusterOptions, Credentials, backend::ClusterBackendBuilder};
//! use docbucket::mongodb::MongoCluster;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MongoCluster::builder("mongodb://localhost:27017").build().await?;
//!     let cluster = Cluster::new(backend, ClusterOptions::default());
//!     let bucket = cluster.open_bucket("default", Credentials::Anonymous).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbucket_mongodb;

pub mod cluster;
mod query;
mod sanitizer;

pub use cluster::{MongoCluster, MongoClusterBuilder};
