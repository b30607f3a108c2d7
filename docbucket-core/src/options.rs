//! Cluster-wide defaults and per-operation options.

use std::time::Duration;

use bson::Bson;

/// Timeouts applied to every operation issued through a cluster.
///
/// Defaults match the usual SDK values: 10s to connect, 2.5s for key-value
/// operations and 75s for queries.
///
/// # Example
///
/// ```ignore
/// let options = ClusterOptions::default()
///     .with_kv_timeout(Duration::from_secs(1))
///     .with_query_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOptions {
    /// Upper bound for establishing the connection.
    pub connect_timeout: Duration,
    /// Upper bound for put, get, exists and opening a bucket.
    pub kv_timeout: Duration,
    /// Upper bound for running a query and iterating all of its rows.
    pub query_timeout: Duration,
}

impl ClusterOptions {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_KV_TIMEOUT: Duration = Duration::from_millis(2500);
    pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(75);

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_kv_timeout(mut self, timeout: Duration) -> Self {
        self.kv_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            kv_timeout: Self::DEFAULT_KV_TIMEOUT,
            query_timeout: Self::DEFAULT_QUERY_TIMEOUT,
        }
    }
}

/// Options for a single `put`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Time-to-live of the written document. `Duration::ZERO` means it never expires.
    pub expiry: Duration,
    /// Overrides [`ClusterOptions::kv_timeout`].
    pub timeout: Option<Duration>,
}

impl PutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options for a single `get` or `exists`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Overrides [`ClusterOptions::kv_timeout`].
    pub timeout: Option<Duration>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options for a single query: parameters, timeout and a context id.
///
/// # Example
///
/// ```ignore
/// let options = QueryOptions::new()
///     .positional_parameter("Minecraft%")
///     .named_parameter("max_cost", "30.00");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Values bound to `$1`, `$2`, ... in order.
    pub positional_parameters: Vec<Bson>,
    /// Values bound to `$name` placeholders.
    pub named_parameters: Vec<(String, Bson)>,
    /// Overrides [`ClusterOptions::query_timeout`].
    pub timeout: Option<Duration>,
    /// Caller-chosen id echoed in the query metadata. A random one is used when unset.
    pub client_context_id: Option<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional_parameter(mut self, value: impl Into<Bson>) -> Self {
        self.positional_parameters.push(value.into());
        self
    }

    /// Binds a named parameter. The name may be given with or without the leading `$`.
    pub fn named_parameter(mut self, name: impl Into<String>, value: impl Into<Bson>) -> Self {
        let name = name.into();
        let name = name.strip_prefix('$').map(str::to_string).unwrap_or(name);

        self.named_parameters.retain(|(existing, _)| existing != &name);
        self.named_parameters.push((name, value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn client_context_id(mut self, id: impl Into<String>) -> Self {
        self.client_context_id = Some(id.into());
        self
    }

    /// Resolves `$1`-style placeholders (1-indexed).
    pub fn positional(&self, index: usize) -> Option<&Bson> {
        index
            .checked_sub(1)
            .and_then(|i| self.positional_parameters.get(i))
    }

    /// Resolves `$name` placeholders.
    pub fn named(&self, name: &str) -> Option<&Bson> {
        self.named_parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}
