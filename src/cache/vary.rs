//! Vary handling.
//!
//! When a response is stored, the request value of every header listed in
//! its `Vary` is echoed into the stored response as `X-Varied-<Header>`.
//! A later request can only reuse the entry if its own values for those
//! headers equal the echoed ones.

use http::header::{HeaderName, VARY};
use http::HeaderMap;

use super::headers::{header_str, multi_value};

/// Prefix of the synthetic echo headers
pub const VARIED_PREFIX: &str = "x-varied-";

/// Echo header name for a `Vary`-listed header, e.g. `x-varied-accept-language`
pub fn echo_header_name(header: &str) -> Option<HeaderName> {
    let name = format!("{}{}", VARIED_PREFIX, header.to_ascii_lowercase());
    HeaderName::from_bytes(name.as_bytes()).ok()
}

/// Whether the request still matches the Vary dependencies of a cached
/// response.
///
/// Comparison is a case-sensitive string compare; a header absent on one
/// side only matches if it is absent (or empty) on the other. An empty or
/// absent `Vary` always matches.
pub fn matches(cached: &HeaderMap, request: &HeaderMap) -> bool {
    for header in multi_value(cached, &VARY) {
        if header.is_empty() {
            continue;
        }
        let Ok(name) = HeaderName::from_bytes(header.as_bytes()) else {
            return false;
        };
        let Some(echo) = echo_header_name(&header) else {
            return false;
        };

        let requested = header_str(request, &name).unwrap_or_default();
        let recorded = header_str(cached, &echo).unwrap_or_default();
        if requested != recorded {
            return false;
        }
    }
    true
}

/// Copy the request's values for every `Vary`-listed header into echo headers
/// on the response about to be stored. Headers absent from the request are
/// not echoed.
pub fn record(response: &mut HeaderMap, request: &HeaderMap) {
    for header in multi_value(response, &VARY) {
        if header.is_empty() {
            continue;
        }
        let (Ok(name), Some(echo)) = (
            HeaderName::from_bytes(header.as_bytes()),
            echo_header_name(&header),
        ) else {
            continue;
        };

        if let Some(value) = request.get(&name).filter(|value| !value.is_empty()) {
            response.insert(echo, value.clone());
        }
    }
}
