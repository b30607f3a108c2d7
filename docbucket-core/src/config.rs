//! Connection targets and credentials.
//!
//! A cluster is addressed by a connection string of the form
//! `scheme://host[:port][,host[:port]...][/][?key=value&...]`. The string is
//! validated here and then handed to the backend driver unchanged.

use std::fmt;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A single `host[:port]` entry of a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddress {
    pub host: String,
    pub port: Option<u16>,
}

/// A validated cluster connection string.
///
/// # Example
///
/// ```ignore
/// let conn = ConnectionString::parse("memory://localhost")?;
/// assert_eq!(conn.scheme(), "memory");
/// assert_eq!(conn.hosts()[0].host, "localhost");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    raw: String,
    scheme: String,
    hosts: Vec<HostAddress>,
}

impl ConnectionString {
    /// Parses and validates a connection string.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Connection`] when the string has no scheme,
    /// no hosts, an empty host entry or a port that is not a number.
    pub fn parse(input: &str) -> DocumentStoreResult<Self> {
        let malformed =
            |reason: &str| DocumentStoreError::Connection(format!("malformed connection string {input:?}: {reason}"));

        let raw = input.trim();
        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| malformed("missing scheme separator"))?;

        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(malformed("invalid scheme"));
        }

        // Options after '?' are left to the driver
        let authority = rest
            .split_once('?')
            .map_or(rest, |(authority, _)| authority);
        // Anything after the first '/' (a default database or bucket) is left to the driver
        let authority = authority
            .split_once('/')
            .map_or(authority, |(hosts, _)| hosts);
        // Userinfo is allowed by some drivers and carries no host information
        let authority = authority
            .rsplit_once('@')
            .map_or(authority, |(_, hosts)| hosts);

        if authority.is_empty() {
            return Err(malformed("no hosts"));
        }

        let hosts = authority
            .split(',')
            .map(|entry| Self::parse_host(entry).map_err(|reason| malformed(&reason)))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        Ok(Self {
            raw: raw.to_string(),
            scheme: scheme.to_ascii_lowercase(),
            hosts,
        })
    }

    fn parse_host(entry: &str) -> Result<HostAddress, String> {
        let entry = entry.trim();

        if entry.is_empty() {
            return Err("empty host entry".to_string());
        }

        // Bracketed IPv6 literal, e.g. `[::1]:8091`
        if let Some(bracketed) = entry.strip_prefix('[') {
            let (host, rest) = bracketed
                .split_once(']')
                .ok_or_else(|| format!("unterminated IPv6 address in {entry:?}"))?;
            if host.is_empty() {
                return Err(format!("empty IPv6 address in {entry:?}"));
            }

            let port = match rest {
                "" => None,
                _ => Some(Self::parse_port(
                    rest.strip_prefix(':')
                        .ok_or_else(|| format!("unexpected {rest:?} after IPv6 address"))?,
                )?),
            };

            return Ok(HostAddress { host: host.to_string(), port });
        }

        match entry.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => Ok(HostAddress {
                host: host.to_string(),
                port: Some(Self::parse_port(port)?),
            }),
            Some(_) => Err(format!("missing host before port in {entry:?}")),
            None => Ok(HostAddress { host: entry.to_string(), port: None }),
        }
    }

    fn parse_port(port: &str) -> Result<u16, String> {
        port.parse::<u16>()
            .map_err(|_| format!("invalid port {port:?}"))
    }

    /// The original string, exactly as supplied (minus surrounding whitespace).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The lower-cased scheme, e.g. `memory` or `mongodb`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The hosts listed in the connection string. Never empty.
    pub fn hosts(&self) -> &[HostAddress] {
        &self.hosts
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Credentials presented when opening a bucket.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// No credentials; accepted only by buckets that allow anonymous access.
    #[default]
    Anonymous,
    /// Username and password.
    Password { username: String, password: String },
    /// An opaque bearer token.
    Token(String),
}

impl Credentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Credentials::Token(token.into())
    }

    /// A short, secret-free description used in logs.
    pub fn principal(&self) -> &str {
        match self {
            Credentials::Anonymous => "anonymous",
            Credentials::Password { username, .. } => username,
            Credentials::Token(_) => "token",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
        }
    }
}
