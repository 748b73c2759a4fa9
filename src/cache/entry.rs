//! Stored response entries.
//!
//! A `CacheEntry` is the complete serialized form of a response: HTTP
//! version, status, every header (repeated headers included, raw value
//! bytes) and the body. Entries are encoded with MessagePack inside a
//! versioned envelope and are never patched in place: an update re-encodes
//! and replaces the whole value.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Response, StatusCode, Version};
use serde::{Deserialize, Serialize};

use super::X_FROM_CACHE;
use crate::error::{HttpCacheError, Result};

/// Serialization format version for schema evolution
const SERIALIZATION_VERSION: u8 = 1;

/// In-memory form of a stored response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub version: Version,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializableEntry {
    version: u8,
    http_version: String,
    status: u16,
    headers: Vec<(String, Vec<u8>)>,
    body: Vec<u8>,
}

impl CacheEntry {
    /// Snapshot a response head and its full body.
    ///
    /// The `X-From-Cache` marker is dropped; it describes how a response was
    /// served, not what the origin sent.
    pub fn new(version: Version, status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        let mut headers = headers.clone();
        headers.remove(X_FROM_CACHE);
        Self {
            version,
            status,
            headers,
            body,
        }
    }

    /// Encode to the byte form handed to storage
    pub fn encode(&self) -> Result<Bytes> {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();

        let serializable = SerializableEntry {
            version: SERIALIZATION_VERSION,
            http_version: format!("{:?}", self.version),
            status: self.status.as_u16(),
            headers,
            body: self.body.to_vec(),
        };

        Ok(Bytes::from(rmp_serde::to_vec(&serializable)?))
    }

    /// Decode bytes previously produced by `encode`
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let serializable: SerializableEntry = rmp_serde::from_slice(bytes)?;

        if serializable.version != SERIALIZATION_VERSION {
            return Err(HttpCacheError::Serialization(format!(
                "Unsupported schema version: {} (expected: {})",
                serializable.version, SERIALIZATION_VERSION
            )));
        }

        let version = parse_version(&serializable.http_version)?;
        let status = StatusCode::from_u16(serializable.status).map_err(|e| {
            HttpCacheError::Serialization(format!("Invalid status {}: {}", serializable.status, e))
        })?;

        let mut headers = HeaderMap::with_capacity(serializable.headers.len());
        for (name, value) in serializable.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                HttpCacheError::Serialization(format!("Invalid header name {}: {}", name, e))
            })?;
            let value = HeaderValue::from_bytes(&value).map_err(|e| {
                HttpCacheError::Serialization(format!("Invalid value for {}: {}", name, e))
            })?;
            headers.append(name, value);
        }

        Ok(Self {
            version,
            status,
            headers,
            body: Bytes::from(serializable.body),
        })
    }

    /// Response head of this entry with the body attached
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.version_mut() = self.version;
        *response.headers_mut() = self.headers;
        response
    }
}

fn parse_version(value: &str) -> Result<Version> {
    match value {
        "HTTP/0.9" => Ok(Version::HTTP_09),
        "HTTP/1.0" => Ok(Version::HTTP_10),
        "HTTP/1.1" => Ok(Version::HTTP_11),
        "HTTP/2.0" => Ok(Version::HTTP_2),
        "HTTP/3.0" => Ok(Version::HTTP_3),
        other => Err(HttpCacheError::Serialization(format!(
            "Unknown HTTP version: {}",
            other
        ))),
    }
}
