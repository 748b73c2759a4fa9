//! Request orchestration.
//!
//! `CachedClient` runs every request through the same pipeline:
//!
//! 1. Key and eligibility (`gate`)
//! 2. Lookup and decode; failures are a miss
//! 3. Vary match, then freshness (`vary`, `freshness`)
//! 4. Fresh entries are served directly. Stale ones are revalidated
//!    conditionally and may be merged with a `304` or served on origin error.
//!    Transparent requests are sent unmodified but get the same handling.
//! 5. Misses go to the transport, or get a synthetic `504` under
//!    `only-if-cached`
//! 6. Store or evict. `GET` bodies are captured while the caller streams
//!    them; other eligible methods are stored immediately.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::HeaderValue;
use http::{Method, Request, Response, StatusCode, Version};
use http_body_util::BodyExt;
use std::sync::Arc;

use super::capture::CapturingBody;
use super::control::{Directives, ONLY_IF_CACHED};
use super::entry::CacheEntry;
use super::freshness::{self, Freshness};
use super::gate::{can_store_headers, is_cacheable, request_key};
use super::headers::end_to_end_headers;
use super::revalidation::{clone_request, conditional_request};
use super::stale::can_serve_stale_on_error;
use super::vary;
use super::X_FROM_CACHE;
use crate::clock::{Clock, SystemClock};
use crate::error::{HttpCacheError, Result, TransportError};
use crate::storage::Storage;
use crate::transport::{empty_body, full_body, ResponseBody, Transport};

/// Runtime knobs for `CachedClient`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// TTL handed to `Storage::set`; 0 leaves expiry to the backend
    pub ttl_seconds: u64,
    /// Add `X-From-Cache: 1` to responses served from storage
    pub mark_cached_responses: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl_seconds: 0,
            mark_cached_responses: true,
        }
    }
}

/// What the cached branch of the pipeline produced
enum Outcome {
    /// Serve the entry as stored
    Cached(CacheEntry),
    /// Serve the entry and persist it again (304 merge)
    Refreshed(CacheEntry),
    /// An origin response that still has to go through the store phase
    Origin(Response<ResponseBody>),
}

/// Private HTTP cache in front of a `Transport`
pub struct CachedClient {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    options: CacheOptions,
}

impl CachedClient {
    pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn Storage>) -> Self {
        Self {
            transport,
            storage,
            clock: Arc::new(SystemClock),
            options: CacheOptions::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Decoded entry currently stored for `request`, ignoring freshness
    pub fn cached_response<B>(&self, request: &Request<B>) -> Option<CacheEntry> {
        self.lookup(&request_key(request))
    }

    /// Serve `request` from cache or origin, storing the result when allowed
    pub async fn execute(&self, request: Request<Bytes>) -> Result<Response<ResponseBody>> {
        let key = request_key(&request);
        let cacheable = is_cacheable(&request);

        let cached = if cacheable {
            self.lookup(&key)
        } else {
            self.evict(&key);
            None
        };

        let usable = cached.filter(|entry| {
            let matched = vary::matches(&entry.headers, request.headers());
            if !matched {
                tracing::debug!(key = %key, "vary mismatch, treating as miss");
            }
            matched
        });

        let outcome = match usable {
            Some(entry) => {
                let state =
                    freshness::evaluate(request.headers(), &entry.headers, self.clock.as_ref());
                tracing::debug!(key = %key, freshness = %state, "cache hit");
                match state {
                    Freshness::Fresh => Outcome::Cached(entry),
                    Freshness::Stale => {
                        let outgoing = match conditional_request(&entry.headers, &request) {
                            Some(conditional) => {
                                tracing::debug!(key = %key, "revalidating with conditional request");
                                conditional
                            }
                            None => clone_request(&request),
                        };
                        self.exchange(&key, entry, outgoing, &request).await?
                    }
                    Freshness::Transparent => {
                        self.exchange(&key, entry, clone_request(&request), &request)
                            .await?
                    }
                }
            }
            None => {
                if Directives::from_headers(request.headers()).contains(ONLY_IF_CACHED) {
                    tracing::debug!(key = %key, "only-if-cached miss, synthesizing 504");
                    return gateway_timeout();
                }
                tracing::debug!(key = %key, "cache miss");
                Outcome::Origin(self.forward(&key, cacheable, &request).await?)
            }
        };

        match outcome {
            Outcome::Cached(entry) => Ok(self.serve(entry)),
            Outcome::Refreshed(entry) => {
                if can_store_headers(request.headers(), &entry.headers) {
                    self.persist(&key, &entry);
                } else {
                    self.evict(&key);
                }
                Ok(self.serve(entry))
            }
            Outcome::Origin(response) if cacheable => self.store(key, &request, response).await,
            Outcome::Origin(response) => Ok(response),
        }
    }

    /// Send `request` unchanged; a failed cacheable exchange evicts its key
    async fn forward(
        &self,
        key: &str,
        cacheable: bool,
        request: &Request<Bytes>,
    ) -> Result<Response<ResponseBody>> {
        match self.transport.send(clone_request(request)).await {
            Ok(response) => Ok(response),
            Err(err) => {
                if cacheable {
                    self.evict(key);
                }
                Err(err.into())
            }
        }
    }

    /// Send `outgoing` while a prior entry exists for `key`.
    ///
    /// A `GET` answered with `304` merges onto the entry. A transport error or
    /// 5xx falls back to the entry when stale-if-error allows it. Anything
    /// else that is not `200` evicts.
    async fn exchange(
        &self,
        key: &str,
        entry: CacheEntry,
        outgoing: Request<Bytes>,
        request: &Request<Bytes>,
    ) -> Result<Outcome> {
        let is_get = request.method() == Method::GET;

        match self.transport.send(outgoing).await {
            Ok(response) if is_get && response.status() == StatusCode::NOT_MODIFIED => {
                tracing::debug!(key = %key, "304 Not Modified, merging headers");
                Ok(Outcome::Refreshed(merge_not_modified(entry, &response)))
            }
            Ok(response)
                if is_get
                    && response.status().as_u16() >= 500
                    && self.stale_allowed(&entry, request) =>
            {
                tracing::debug!(
                    key = %key,
                    status = response.status().as_u16(),
                    "origin error, serving stale entry"
                );
                Ok(Outcome::Cached(entry))
            }
            Ok(response) => {
                if response.status() != StatusCode::OK {
                    self.evict(key);
                }
                Ok(Outcome::Origin(response))
            }
            Err(err) if is_get && self.stale_allowed(&entry, request) => {
                tracing::debug!(key = %key, error = %err, "transport failed, serving stale entry");
                Ok(Outcome::Cached(entry))
            }
            Err(err) => {
                self.evict(key);
                Err(err.into())
            }
        }
    }

    fn stale_allowed(&self, entry: &CacheEntry, request: &Request<Bytes>) -> bool {
        can_serve_stale_on_error(&entry.headers, request.headers(), self.clock.as_ref())
    }

    /// Store phase for an origin response of a cacheable request
    async fn store(
        &self,
        key: String,
        request: &Request<Bytes>,
        response: Response<ResponseBody>,
    ) -> Result<Response<ResponseBody>> {
        if response.status() != StatusCode::OK
            || !can_store_headers(request.headers(), response.headers())
        {
            tracing::debug!(key = %key, status = response.status().as_u16(), "not storable, evicting");
            self.evict(&key);
            return Ok(response);
        }

        let (mut parts, body) = response.into_parts();
        vary::record(&mut parts.headers, request.headers());

        if request.method() == Method::GET {
            let storage = self.storage.clone();
            let ttl_seconds = self.options.ttl_seconds;
            let (version, status, headers) = (parts.version, parts.status, parts.headers.clone());
            let body = CapturingBody::new(body, move |bytes| {
                let entry = CacheEntry::new(version, status, &headers, bytes);
                persist_entry(storage.as_ref(), &key, &entry, ttl_seconds);
            });
            return Ok(Response::from_parts(parts, body.boxed_unsync()));
        }

        let bytes = body
            .collect()
            .await
            .map_err(TransportError::new)?
            .to_bytes();
        let entry = CacheEntry::new(parts.version, parts.status, &parts.headers, bytes.clone());
        self.persist(&key, &entry);
        Ok(Response::from_parts(parts, full_body(bytes)))
    }

    fn serve(&self, entry: CacheEntry) -> Response<ResponseBody> {
        let mut response = entry.into_response().map(full_body);
        if self.options.mark_cached_responses {
            response
                .headers_mut()
                .insert(X_FROM_CACHE, HeaderValue::from_static("1"));
        }
        response
    }

    fn lookup(&self, key: &str) -> Option<CacheEntry> {
        match self.storage.get(key) {
            Ok(Some(bytes)) => match CacheEntry::decode(&bytes) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache lookup failed");
                None
            }
        }
    }

    fn persist(&self, key: &str, entry: &CacheEntry) {
        persist_entry(self.storage.as_ref(), key, entry, self.options.ttl_seconds);
    }

    fn evict(&self, key: &str) {
        if let Err(e) = self.storage.delete(key) {
            tracing::warn!(key = %key, error = %e, "cache eviction failed");
        }
    }
}

fn persist_entry(storage: &dyn Storage, key: &str, entry: &CacheEntry, ttl_seconds: u64) {
    let bytes = match entry.encode() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "failed to encode cache entry");
            return;
        }
    };
    let size = bytes.len();
    match storage.set(key, bytes, ttl_seconds) {
        Ok(()) => tracing::debug!(key = %key, size, "stored response"),
        Err(e) => tracing::warn!(key = %key, error = %e, "failed to store response"),
    }
}

/// Replace the cached entry's end-to-end headers with those from a `304`
fn merge_not_modified<B>(mut entry: CacheEntry, not_modified: &Response<B>) -> CacheEntry {
    let fresh = not_modified.headers();
    for name in end_to_end_headers(fresh) {
        entry.headers.remove(&name);
        for value in fresh.get_all(&name) {
            entry.headers.append(name.clone(), value.clone());
        }
    }
    entry
}

fn gateway_timeout() -> Result<Response<ResponseBody>> {
    Ok(Response::builder()
        .status(StatusCode::GATEWAY_TIMEOUT)
        .version(Version::HTTP_11)
        .body(empty_body())?)
}

#[async_trait]
impl Transport for CachedClient {
    async fn send(&self, request: Request<Bytes>) -> std::result::Result<Response<ResponseBody>, TransportError> {
        self.execute(request).await.map_err(|err| match err {
            HttpCacheError::Transport(inner) => inner,
            other => TransportError::new(other),
        })
    }
}
