//! A thin typed client layer for bucket-oriented JSON document databases.
//!
//! This crate is the core of the docbucket project and provides:
//!
//! - **Cluster and bucket handles** ([`cluster`], [`bucket`]) - Connect, open buckets, put, get and query
//! - **Backend abstraction** ([`backend`]) - Traits implemented by each database client
//! - **Document traits** ([`document`]) - Conversions between serde types and stored content
//! - **Statements** ([`query`]) - The parsed `SELECT` model, filters and builders
//! - **Rows** ([`rows`]) - Untyped result rows and the lazy query result
//! - **Configuration** ([`config`], [`options`]) - Connection strings, credentials, timeouts
//! - **Error handling** ([`error`]) - Error kinds and the crate-wide result type
//!
//! # Example
//!
//! ```ignore
//! use docbucket_core::{cluster::Cluster, config::Credentials, options::ClusterOptions};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(rename_all = "lowercase")]
//! pub struct Book {
//!     pub isbn: String,
//!     pub name: String,
//!     pub cost: String,
//! }
//!
//! let cluster = Cluster::new(backend, ClusterOptions::default());
//! let bucket = cluster.open_bucket("default", Credentials::Anonymous).await?;
//! bucket.put("u:book1", &book).await?;
//! let book: Book = bucket.get("u:book1").await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbucket_core;

pub mod backend;
pub mod bucket;
pub mod cluster;
pub mod config;
pub mod document;
pub mod error;
pub mod options;
mod parser;
pub mod query;
pub mod rows;
pub mod timeout;
