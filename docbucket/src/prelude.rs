//! Convenient re-exports of commonly used types from docbucket.
//!
//! ```ignore
//! use docbucket::prelude::*;
//! ```

pub use crate::{book::Book, connect::connect};
pub use docbucket_core::{
    backend::{ClusterBackend, ClusterBackendBuilder, DynClusterBackend},
    bucket::{Bucket, TypedBucket},
    cluster::{Cluster, DynCluster},
    config::{ConnectionString, Credentials},
    document::{Content, Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult, ErrorKind},
    options::{ClusterOptions, GetOptions, PutOptions, QueryOptions},
    query::{Expr, FieldOp, Filter, Projection, QueryVisitor, Sort, SortDirection, Statement, StatementBuilder},
    rows::{QueryMetaData, QueryResult, QueryStatus, Row},
};
