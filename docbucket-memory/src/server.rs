//! Process-local stand-in for a document database service.
//!
//! A server holds buckets of keyed documents, enforces bucket credentials and
//! document expiry, and can be switched offline, slowed down, or told to abort
//! a query part-way through.
//! Every `memory://<host>` connection string resolves to the server registered
//! for `<host>` (see [`InMemoryServer::shared`]).

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        Arc, LazyLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use mea::{mutex::Mutex, rwlock::RwLock};
use tracing::debug;

use docbucket_core::{
    config::Credentials,
    document::Content,
    error::{DocumentStoreError, DocumentStoreResult},
};

static SERVERS: LazyLock<Mutex<HashMap<String, Arc<InMemoryServer>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Name of the bucket every shared server starts with.
pub const DEFAULT_BUCKET: &str = "default";

/// Who may open a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketAccess {
    anonymous: bool,
    users: HashMap<String, String>,
    tokens: HashSet<String>,
}

impl BucketAccess {
    /// Open to everyone, including anonymous clients.
    pub fn anonymous() -> Self {
        Self {
            anonymous: true,
            users: HashMap::new(),
            tokens: HashSet::new(),
        }
    }

    /// Open only to the credentials added with [`BucketAccess::user`] and [`BucketAccess::token`].
    pub fn restricted() -> Self {
        Self {
            anonymous: false,
            ..Self::anonymous()
        }
    }

    pub fn user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.tokens.insert(token.into());
        self
    }

    fn allows(&self, credentials: &Credentials) -> bool {
        match credentials {
            Credentials::Anonymous => self.anonymous,
            Credentials::Password { username, password } => self
                .users
                .get(username)
                .is_some_and(|expected| expected == password),
            Credentials::Token(token) => self.tokens.contains(token),
        }
    }
}

impl Default for BucketAccess {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StoredDocument {
    content: Content,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredDocument {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Default)]
struct BucketState {
    access: BucketAccess,
    documents: BTreeMap<String, StoredDocument>,
}

#[derive(Debug)]
pub struct InMemoryServer {
    host: String,
    buckets: RwLock<BTreeMap<String, BucketState>>,
    online: AtomicBool,
    latency: RwLock<Duration>,
    query_fault: Mutex<Option<usize>>,
}

impl InMemoryServer {
    /// Creates a standalone server with no buckets.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            buckets: RwLock::new(BTreeMap::new()),
            online: AtomicBool::new(true),
            latency: RwLock::new(Duration::ZERO),
            query_fault: Mutex::new(None),
        }
    }

    /// Returns the server registered for `host`, creating it on first use.
    ///
    /// A newly created server has one anonymous bucket named [`DEFAULT_BUCKET`].
    pub async fn shared(host: &str) -> Arc<InMemoryServer> {
        let mut servers = SERVERS.lock().await;

        if let Some(server) = servers.get(host) {
            return server.clone();
        }

        let server = Arc::new(InMemoryServer::new(host));
        server
            .buckets
            .write()
            .await
            .insert(DEFAULT_BUCKET.to_string(), BucketState::default());
        servers.insert(host.to_string(), server.clone());

        debug!(host, "registered in-memory server");

        server
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Creates a bucket, or replaces the access rules of an existing one.
    pub async fn create_bucket(&self, name: &str, access: BucketAccess) {
        self.buckets
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .access = access;
    }

    /// Makes the server reachable or unreachable. Unreachable servers fail
    /// every request with a connection error.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Delays every request by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    /// Makes the next query abort after delivering `rows` rows.
    pub async fn fail_next_query_after(&self, rows: usize) {
        *self.query_fault.lock().await = Some(rows);
    }

    /// Number of live documents in `bucket`.
    pub async fn document_count(&self, bucket: &str) -> usize {
        let now = Utc::now();

        self.buckets
            .read()
            .await
            .get(bucket)
            .map_or(0, |state| {
                state
                    .documents
                    .values()
                    .filter(|doc| doc.is_live(now))
                    .count()
            })
    }

    /// Simulates the round trip to the service.
    pub(crate) async fn round_trip(&self) -> DocumentStoreResult<()> {
        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if !self.is_online() {
            return Err(DocumentStoreError::Connection(format!(
                "memory://{} is unreachable",
                self.host
            )));
        }

        Ok(())
    }

    pub(crate) async fn authenticate(
        &self,
        bucket: &str,
        credentials: &Credentials,
    ) -> DocumentStoreResult<()> {
        let buckets = self.buckets.read().await;
        let state = buckets
            .get(bucket)
            .ok_or_else(|| DocumentStoreError::BucketNotFound(bucket.to_string()))?;

        if !state.access.allows(credentials) {
            return Err(DocumentStoreError::Authentication(
                bucket.to_string(),
                format!("access denied for {}", credentials.principal()),
            ));
        }

        Ok(())
    }

    pub(crate) async fn upsert(
        &self,
        bucket: &str,
        key: &str,
        content: Content,
        expires_at: Option<DateTime<Utc>>,
    ) -> DocumentStoreResult<()> {
        let mut buckets = self.buckets.write().await;
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| DocumentStoreError::BucketNotFound(bucket.to_string()))?;

        state
            .documents
            .insert(key.to_string(), StoredDocument { content, expires_at });

        Ok(())
    }

    pub(crate) async fn get(&self, bucket: &str, key: &str) -> DocumentStoreResult<Option<Content>> {
        let buckets = self.buckets.read().await;
        let state = buckets
            .get(bucket)
            .ok_or_else(|| DocumentStoreError::BucketNotFound(bucket.to_string()))?;

        let now = Utc::now();

        Ok(state
            .documents
            .get(key)
            .filter(|doc| doc.is_live(now))
            .map(|doc| doc.content.clone()))
    }

    /// Copies the live documents of a keyspace, ordered by key.
    pub(crate) async fn scan(&self, keyspace: &str) -> DocumentStoreResult<Vec<(String, Content)>> {
        let buckets = self.buckets.read().await;
        let state = buckets.get(keyspace).ok_or_else(|| {
            DocumentStoreError::Query(format!("keyspace not found: {keyspace}"))
        })?;

        let now = Utc::now();

        Ok(state
            .documents
            .iter()
            .filter(|(_, doc)| doc.is_live(now))
            .map(|(key, doc)| (key.clone(), doc.content.clone()))
            .collect())
    }

    pub(crate) async fn take_query_fault(&self) -> Option<usize> {
        self.query_fault.lock().await.take()
    }
}
