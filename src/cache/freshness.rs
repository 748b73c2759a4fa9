//! Freshness evaluation.
//!
//! Decides whether a cached response can be served as-is, must be revalidated,
//! or must be bypassed entirely. This is a private cache, so `public`,
//! `private` and `s-maxage` carry no weight here.
//!
//! Rules are applied in order, first match wins:
//!
//! 1. request `no-cache` → `Transparent`
//! 2. response `no-cache` → `Stale`
//! 3. request `only-if-cached` → `Fresh`
//! 4. no parseable response `Date` → `Stale`
//! 5. lifetime from response `max-age`, else `Expires - Date`, else zero;
//!    request `max-age` replaces it
//! 6. request `min-fresh` is added to the current age
//! 7. bare request `max-stale` → `Fresh`; a numeric one is subtracted from
//!    the current age
//! 8. `lifetime > age` → `Fresh`, otherwise `Stale`

use chrono::TimeDelta;
use http::header::EXPIRES;
use http::HeaderMap;
use std::fmt;

use super::control::{
    parse_delta_seconds, Directives, MAX_AGE, MAX_STALE, MIN_FRESH, NO_CACHE, ONLY_IF_CACHED,
};
use super::headers::{header_str, parse_http_date, response_date};
use crate::clock::Clock;

/// Usability of a cached response for a given request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Can be returned without contacting the origin
    Fresh,
    /// Must be revalidated before use
    Stale,
    /// Must not be used to satisfy the request
    Transparent,
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::Fresh => write!(f, "fresh"),
            Freshness::Stale => write!(f, "stale"),
            Freshness::Transparent => write!(f, "transparent"),
        }
    }
}

/// Evaluate the freshness of a cached response against a new request
pub fn evaluate(request: &HeaderMap, cached: &HeaderMap, clock: &dyn Clock) -> Freshness {
    let request_cc = Directives::from_headers(request);
    let response_cc = Directives::from_headers(cached);

    if request_cc.contains(NO_CACHE) {
        tracing::debug!("request no-cache directive, bypassing cache");
        return Freshness::Transparent;
    }
    if response_cc.contains(NO_CACHE) {
        tracing::debug!("response no-cache directive, entry is stale");
        return Freshness::Stale;
    }
    if request_cc.contains(ONLY_IF_CACHED) {
        tracing::debug!("request only-if-cached directive, entry is fresh");
        return Freshness::Fresh;
    }

    let date = match response_date(cached) {
        Ok(date) => date,
        Err(e) => {
            tracing::debug!(error = %e, "cannot establish response age, entry is stale");
            return Freshness::Stale;
        }
    };
    let mut current_age = clock.since(date);

    // max-age overrides Expires, even when Expires is more restrictive
    let mut lifetime = match response_cc.get(MAX_AGE) {
        Some(max_age) => parse_delta_seconds(max_age).unwrap_or_else(TimeDelta::zero),
        None => match header_str(cached, &EXPIRES) {
            Some(expires) => parse_http_date(expires)
                .map(|expires| expires.signed_duration_since(date))
                .unwrap_or_else(|_| TimeDelta::zero()),
            None => TimeDelta::zero(),
        },
    };

    if let Some(max_age) = request_cc.get(MAX_AGE) {
        lifetime = parse_delta_seconds(max_age).unwrap_or_else(TimeDelta::zero);
    }

    if let Some(min_fresh) = request_cc.get(MIN_FRESH).and_then(parse_delta_seconds) {
        match current_age.checked_add(&min_fresh) {
            Some(age) => current_age = age,
            None => tracing::debug!("min-fresh out of range, ignored"),
        }
    }

    if let Some(max_stale) = request_cc.get(MAX_STALE) {
        if max_stale.is_empty() {
            tracing::debug!("request max-stale without limit, entry is fresh");
            return Freshness::Fresh;
        }
        if let Some(max_stale) = parse_delta_seconds(max_stale) {
            match current_age.checked_sub(&max_stale) {
                Some(age) => current_age = age,
                None => tracing::debug!("max-stale out of range, ignored"),
            }
        }
    }

    if lifetime > current_age {
        tracing::debug!(
            lifetime_secs = lifetime.num_seconds(),
            age_secs = current_age.num_seconds(),
            "entry is fresh"
        );
        Freshness::Fresh
    } else {
        tracing::debug!(
            lifetime_secs = lifetime.num_seconds(),
            age_secs = current_age.num_seconds(),
            "lifetime exhausted, entry is stale"
        );
        Freshness::Stale
    }
}
