//! [`ClusterBackend`] implementation on top of the official MongoDB driver.
//!
//! A bucket maps to a database and its documents live in the `_default`
//! collection. The document key is stored as `_id` and the expiry instant,
//! when there is one, as `_expires_at`. Both are stripped on read.

use std::{collections::HashMap, time::Duration};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use bson::{Document, Bson, doc};
use mea::rwlock::RwLock;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind as MongoErrorKind},
    options::{ClientOptions, Credential, FindOptions},
};
use tracing::{debug, info};

use docbucket_core::{
    backend::{ClusterBackend, ClusterBackendBuilder},
    config::Credentials,
    document::Content,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{QueryVisitor, SortDirection, Statement},
    rows::RowStream,
};

use crate::{
    query::{ID_FIELD, MongoQueryTranslator},
    sanitizer::KeySanitizer,
};

/// Collection holding the documents of a bucket.
pub const COLLECTION: &str = "_default";
/// Field holding the expiry instant of a document.
pub const EXPIRES_FIELD: &str = "_expires_at";

// Server error codes for "Unauthorized" and "AuthenticationFailed"
const UNAUTHORIZED_CODES: [i32; 2] = [13, 18];


/// Maps a driver error onto the error taxonomy. Authentication and reachability
/// problems keep their meaning; anything else becomes `fallback`.
fn classify(error: MongoError, bucket: &str, fallback: fn(String) -> DocumentStoreError) -> DocumentStoreError {
    match error.kind.as_ref() {
        MongoErrorKind::Authentication { .. } => {
            DocumentStoreError::Authentication(bucket.to_string(), error.to_string())
        }
        MongoErrorKind::Command(command) if UNAUTHORIZED_CODES.contains(&command.code) => {
            DocumentStoreError::Authentication(bucket.to_string(), error.to_string())
        }
        MongoErrorKind::ServerSelection { .. } | MongoErrorKind::Io(_) => {
            DocumentStoreError::Connection(error.to_string())
        }
        _ => fallback(error.to_string()),
    }
}

fn database_name(bucket: &str) -> String {
    KeySanitizer::sanitize_key(bucket)
}

/// Matches documents that have not expired.
fn live_filter() -> Document {
    doc! {
        "$or": [
            { "_expires_at": { "$exists": false } },
            { "_expires_at": { "$gt": bson::DateTime::now() } },
        ]
    }
}

/// Builds the stored form of a document.
fn prepare_document(
    key: &str,
    content: &Content,
    expires_at: Option<DateTime<Utc>>,
) -> DocumentStoreResult<Document> {
    if let Some(reserved) = [ID_FIELD, EXPIRES_FIELD]
        .into_iter()
        .find(|field| content.contains_key(*field))
    {
        return Err(DocumentStoreError::InvalidDocument(format!("field {reserved} is reserved")));
    }

    let mut stored = KeySanitizer::sanitize_document(content);
    stored.insert(ID_FIELD, key);
    if let Some(at) = expires_at {
        stored.insert(EXPIRES_FIELD, bson::DateTime::from_chrono(at));
    }

    Ok(stored)
}

/// Splits a stored document back into its key and content.
fn restore_document(mut stored: Document) -> DocumentStoreResult<(String, Content)> {
    let key = match stored.remove(ID_FIELD) {
        Some(Bson::String(key)) => key,
        other => {
            return Err(DocumentStoreError::Decoding(format!(
                "stored document has a non-string key: {other:?}"
            )));
        }
    };
    stored.remove(EXPIRES_FIELD);

    Ok((key, KeySanitizer::restore_document(&stored)))
}


#[derive(Debug)]
pub struct MongoCluster {
    client: Client,
    options: ClientOptions,
    buckets: RwLock<HashMap<String, Client>>,
}

impl MongoCluster {
    pub fn new(client: Client, options: ClientOptions) -> Self {
        Self {
            client,
            options,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    pub fn builder(connection_string: impl Into<String>) -> MongoClusterBuilder {
        MongoClusterBuilder::new(connection_string)
    }

    /// The client a bucket was opened with, or the connection's own client.
    async fn client_for(&self, bucket: &str) -> Client {
        self.buckets
            .read()
            .await
            .get(bucket)
            .cloned()
            .unwrap_or_else(|| self.client.clone())
    }

    async fn get_collection(&self, bucket: &str) -> MongoCollection<Document> {
        self.client_for(bucket)
            .await
            .database(&database_name(bucket))
            .collection(COLLECTION)
    }

    fn client_with(&self, credentials: &Credentials, bucket: &str) -> DocumentStoreResult<Client> {
        let (username, password) = match credentials {
            Credentials::Anonymous => return Ok(self.client.clone()),
            Credentials::Password { username, password } => (username, password),
            Credentials::Token(_) => {
                return Err(DocumentStoreError::Authentication(
                    bucket.to_string(),
                    "token credentials are not supported by the MongoDB backend".to_string(),
                ));
            }
        };

        let mut credential = Credential::default();
        credential.username = Some(username.clone());
        credential.password = Some(password.clone());

        let mut options = self.options.clone();
        options.credential = Some(credential);

        Client::with_options(options).map_err(|e| DocumentStoreError::Connection(e.to_string()))
    }

    async fn bucket_exists(&self, client: &Client, bucket: &str) -> Result<bool, MongoError> {
        Ok(client
            .list_database_names()
            .await?
            .contains(&database_name(bucket)))
    }
}

#[async_trait]
impl ClusterBackend for MongoCluster {
    async fn open_bucket(&self, bucket: &str, credentials: &Credentials) -> DocumentStoreResult<()> {
        let client = self.client_with(credentials, bucket)?;

        if !self
            .bucket_exists(&client, bucket)
            .await
            .map_err(|e| classify(e, bucket, DocumentStoreError::Connection))?
        {
            return Err(DocumentStoreError::BucketNotFound(bucket.to_string()));
        }

        self.buckets
            .write()
            .await
            .insert(bucket.to_string(), client);

        Ok(())
    }

    async fn upsert_document(
        &self,
        bucket: &str,
        key: &str,
        content: Content,
        expires_at: Option<DateTime<Utc>>,
    ) -> DocumentStoreResult<()> {
        self.get_collection(bucket)
            .await
            .replace_one(doc! { "_id": key }, prepare_document(key, &content, expires_at)?)
            .upsert(true)
            .await
            .map_err(|e| classify(e, bucket, DocumentStoreError::Storage))?;

        Ok(())
    }

    async fn get_document(&self, bucket: &str, key: &str) -> DocumentStoreResult<Option<Content>> {
        let mut filter = live_filter();
        filter.insert(ID_FIELD, key);

        self.get_collection(bucket)
            .await
            .find_one(filter)
            .await
            .map_err(|e| classify(e, bucket, DocumentStoreError::Storage))?
            .map(|stored| restore_document(stored).map(|(_, content)| content))
            .transpose()
    }

    async fn execute_query(&self, statement: Statement) -> DocumentStoreResult<RowStream> {
        let keyspace = statement.keyspace.clone();
        let client = self.client_for(&keyspace).await;

        if !self
            .bucket_exists(&client, &keyspace)
            .await
            .map_err(|e| classify(e, &keyspace, DocumentStoreError::Query))?
        {
            return Err(DocumentStoreError::Query(format!("keyspace not found: {keyspace}")));
        }

        // The driver reads a zero limit as "no limit"
        if statement.limit == Some(0) {
            return Ok(stream::empty().boxed());
        }

        let filter = match &statement.filter {
            Some(expr) => doc! { "$and": [live_filter(), MongoQueryTranslator.visit_expr(expr)?] },
            None => live_filter(),
        };

        let mut sort = Document::new();
        for term in &statement.sort {
            sort.insert(
                MongoQueryTranslator::field_path(&term.field),
                match term.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                },
            );
        }
        if !sort.contains_key(ID_FIELD) {
            sort.insert(ID_FIELD, 1);
        }

        let mut options = FindOptions::default();
        options.sort = Some(sort);
        options.skip = statement.offset.map(|offset| offset as u64);
        options.limit = statement.limit.map(|limit| limit as i64);

        debug!(keyspace = %keyspace, filter = %filter, "running find");

        let cursor = client
            .database(&database_name(&keyspace))
            .collection::<Document>(COLLECTION)
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| classify(e, &keyspace, DocumentStoreError::Query))?;

        Ok(cursor
            .map(move |item| {
                let stored = item.map_err(|e| classify(e, &statement.keyspace, DocumentStoreError::Query))?;
                let (key, content) = restore_document(stored)?;
                Ok(statement.project(&key, &content))
            })
            .boxed())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        let bucket_clients: Vec<Client> = self.buckets.read().await.values().cloned().collect();
        for client in bucket_clients {
            client.shutdown().await;
        }
        self.client.shutdown().await;

        Ok(())
    }
}


/// Connects to MongoDB from a `mongodb://` or `mongodb+srv://` connection string.
pub struct MongoClusterBuilder {
    connection_string: String,
    connect_timeout: Option<Duration>,
}

impl MongoClusterBuilder {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            connect_timeout: None,
        }
    }

    /// Bounds connection establishment and server selection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl ClusterBackendBuilder for MongoClusterBuilder {
    type Backend = MongoCluster;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.connection_string)
            .await
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;

        if let Some(timeout) = self.connect_timeout {
            options.connect_timeout = Some(timeout);
            options.server_selection_timeout = Some(timeout);
        }

        let client = Client::with_options(options.clone())
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| classify(e, "admin", DocumentStoreError::Connection))?;

        info!(hosts = ?options.hosts, "connected to MongoDB");

        Ok(MongoCluster::new(client, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbucket_core::error::ErrorKind;

    fn book() -> Content {
        doc! {
            "isbn": "978-1-4919-1889-0",
            "name": "Minecraft Modding with Forge",
            "cost": "29.99",
        }
    }

    #[test]
    fn test_prepare_and_restore() {
        let stored = prepare_document("u:book1", &book(), None).unwrap();
        assert_eq!(stored.get_str("_id").ok(), Some("u:book1"));
        assert!(!stored.contains_key(EXPIRES_FIELD));

        let (key, content) = restore_document(stored).unwrap();
        assert_eq!(key, "u:book1");
        assert_eq!(content, book());
    }

    #[test]
    fn test_expiry_is_stored_and_stripped() {
        let at = Utc::now() + chrono::Duration::minutes(5);
        let stored = prepare_document("k", &book(), Some(at)).unwrap();
        assert!(matches!(stored.get(EXPIRES_FIELD), Some(Bson::DateTime(_))));

        let (_, content) = restore_document(stored).unwrap();
        assert!(!content.contains_key(EXPIRES_FIELD));
    }

    #[test]
    fn test_reserved_fields_are_rejected() {
        let err = prepare_document("k", &doc! { "_id": 1 }, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_restore_requires_string_key() {
        let err = restore_document(doc! { "_id": 5, "a": 1 }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decoding);
    }
}
