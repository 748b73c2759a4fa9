//! stale-if-error (RFC 5861) eligibility.
//!
//! The response's `Cache-Control` is checked first, then the request's. A bare
//! `stale-if-error` makes the stale entry usable unconditionally; a numeric
//! value bounds it by the entry's age. Anything unparseable fails closed.

use http::HeaderMap;

use super::control::{parse_delta_seconds, Directives, STALE_IF_ERROR};
use super::headers::response_date;
use crate::clock::Clock;

/// Whether a stale cached response may be served because the origin failed
pub fn can_serve_stale_on_error(cached: &HeaderMap, request: &HeaderMap, clock: &dyn Clock) -> bool {
    let mut window = None;

    for headers in [cached, request] {
        let directives = Directives::from_headers(headers);
        let Some(value) = directives.get(STALE_IF_ERROR) else {
            continue;
        };
        if value.is_empty() {
            return true;
        }
        match parse_delta_seconds(value) {
            Some(delta) => window = Some(delta),
            None => {
                tracing::debug!(value = %value, "malformed stale-if-error value");
                return false;
            }
        }
    }

    let Some(window) = window else {
        return false;
    };

    match response_date(cached) {
        Ok(date) => clock.since(date) < window,
        Err(e) => {
            tracing::debug!(error = %e, "cannot establish response age for stale-if-error");
            false
        }
    }
}
