//! Storage eligibility and cache keys.

use http::header::RANGE;
use http::{HeaderMap, Method, Request};

use super::control::{Directives, NO_STORE};

/// Whether a request may consult or populate the cache at all.
///
/// Only `GET` and `HEAD` without a `Range` header qualify.
pub fn is_cacheable<B>(request: &Request<B>) -> bool {
    matches!(*request.method(), Method::GET | Method::HEAD)
        && !request.headers().contains_key(RANGE)
}

/// Whether an exchange may be stored: neither side carries `no-store`
pub fn can_store(request_cc: &Directives, response_cc: &Directives) -> bool {
    !response_cc.contains(NO_STORE) && !request_cc.contains(NO_STORE)
}

/// Same as `can_store`, parsing the directives from both header maps
pub fn can_store_headers(request: &HeaderMap, response: &HeaderMap) -> bool {
    can_store(
        &Directives::from_headers(request),
        &Directives::from_headers(response),
    )
}

/// Lookup key for a request.
///
/// `GET` and `HEAD` use the absolute URL alone; every other method prefixes
/// the method name, e.g. `POST http://example.com/items`.
pub fn request_key<B>(request: &Request<B>) -> String {
    match *request.method() {
        Method::GET | Method::HEAD => request.uri().to_string(),
        ref method => format!("{} {}", method, request.uri()),
    }
}
