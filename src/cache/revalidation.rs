//! Conditional revalidation of stale entries.
//!
//! Copies a stale entry's validators onto the outgoing request so the origin
//! can answer `304 Not Modified`. The caller's request is never modified: the
//! first validator that needs setting triggers a clone, and any further
//! validator goes onto that same clone.

use bytes::Bytes;
use http::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use http::{HeaderMap, Request};

/// Independent copy of a request with its own header map.
///
/// Extensions are not carried over.
pub fn clone_request(request: &Request<Bytes>) -> Request<Bytes> {
    let mut clone = Request::new(request.body().clone());
    *clone.method_mut() = request.method().clone();
    *clone.uri_mut() = request.uri().clone();
    *clone.version_mut() = request.version();
    *clone.headers_mut() = request.headers().clone();
    clone
}

/// Build the conditional request for a stale entry.
///
/// Returns `None` when no validator needed to be added and the original
/// request should be sent unmodified.
pub fn conditional_request(cached: &HeaderMap, request: &Request<Bytes>) -> Option<Request<Bytes>> {
    let mut conditional: Option<Request<Bytes>> = None;

    if let Some(etag) = cached.get(ETAG).filter(|v| !v.is_empty()) {
        if !request.headers().contains_key(IF_NONE_MATCH) {
            tracing::debug!(etag = ?etag, "setting If-None-Match from cached ETag");
            conditional
                .get_or_insert_with(|| clone_request(request))
                .headers_mut()
                .insert(IF_NONE_MATCH, etag.clone());
        }
    }

    if let Some(last_modified) = cached.get(LAST_MODIFIED).filter(|v| !v.is_empty()) {
        if !request.headers().contains_key(IF_MODIFIED_SINCE) {
            tracing::debug!(last_modified = ?last_modified, "setting If-Modified-Since from cached Last-Modified");
            conditional
                .get_or_insert_with(|| clone_request(request))
                .headers_mut()
                .insert(IF_MODIFIED_SINCE, last_modified.clone());
        }
    }

    conditional
}
