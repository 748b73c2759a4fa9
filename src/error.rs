// Error types module

use thiserror::Error;

/// Boxed error used at the transport and body boundaries
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Crate-wide result alias
pub type Result<T, E = HttpCacheError> = std::result::Result<T, E>;

/// Centralized error type for the cache engine
///
/// Most variants never reach the caller: the engine resolves date, codec and
/// storage failures locally by failing toward a miss or a stale decision.
/// Only `Transport` (without a usable stale fallback) and `InvalidRequest`
/// are returned from `CachedClient::execute`.
#[derive(Error, Debug)]
pub enum HttpCacheError {
    /// The response carries no `Date` header, so its age cannot be computed
    #[error("no Date header")]
    NoDateHeader,

    /// A date header was present but not in RFC1123 format
    #[error("invalid HTTP date: {0}")]
    InvalidDate(String),

    /// A stored entry could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The storage backend failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The underlying transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A request or response could not be assembled
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration was invalid or could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<http::Error> for HttpCacheError {
    fn from(err: http::Error) -> Self {
        HttpCacheError::InvalidRequest(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for HttpCacheError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        HttpCacheError::Serialization(format!("MessagePack encoding failed: {}", err))
    }
}

impl From<rmp_serde::decode::Error> for HttpCacheError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        HttpCacheError::Serialization(format!("MessagePack decoding failed: {}", err))
    }
}

/// Transport-level failure (connection refused, reset, timeout, ...)
#[derive(Error, Debug)]
#[error("transport error: {source}")]
pub struct TransportError {
    #[source]
    source: BoxError,
}

impl TransportError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self { source: err.into() }
    }

    /// Consume the error and return the underlying cause
    pub fn into_inner(self) -> BoxError {
        self.source
    }
}

/// Storage backend errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("entry of {size} bytes exceeds backend capacity")]
    Capacity { size: usize },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
