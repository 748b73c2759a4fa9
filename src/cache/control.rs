//! Cache-Control header parsing.
//!
//! Parses request and response `Cache-Control` headers into a directive
//! mapping used by the freshness, storage and stale-if-error decisions.
//!
//! # Parsing rules
//!
//! - The header value is split on every comma, each token is trimmed and
//!   empty tokens are skipped.
//! - A token containing `=` is split once on the first `=`; the value is kept
//!   verbatim (no unquoting), so `max-age="60"` yields the value `"60"`.
//! - A token without `=` is stored with an empty value (`no-store`,
//!   `no-cache`, `only-if-cached`, bare `max-stale`).
//! - Names are case-sensitive as written and the last occurrence wins.
//!
//! Because splitting happens on every comma, a quoted value with an embedded
//! comma (`stale-if-error="10, 20"`) is broken into two tokens.
//!
//! # Example
//!
//! ```rust
//! use httpcache::cache::Directives;
//!
//! let cc = Directives::parse("max-age=3600, no-cache");
//! assert_eq!(cc.get("max-age"), Some("3600"));
//! assert!(cc.contains("no-cache"));
//! ```

use chrono::TimeDelta;
use http::header::CACHE_CONTROL;
use http::HeaderMap;
use std::collections::HashMap;

pub const NO_STORE: &str = "no-store";
pub const NO_CACHE: &str = "no-cache";
pub const ONLY_IF_CACHED: &str = "only-if-cached";
pub const MAX_AGE: &str = "max-age";
pub const MIN_FRESH: &str = "min-fresh";
pub const MAX_STALE: &str = "max-stale";
pub const STALE_IF_ERROR: &str = "stale-if-error";

/// Parsed Cache-Control directives.
///
/// Maps directive name to its value, or to an empty string for
/// presence-only directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    directives: HashMap<String, String>,
}

impl Directives {
    /// Parse a raw Cache-Control value.
    pub fn parse(header_value: &str) -> Self {
        let mut directives = HashMap::new();

        for token in header_value.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            match token.split_once('=') {
                Some((name, value)) => {
                    directives.insert(name.trim().to_string(), value.to_string());
                }
                None => {
                    directives.insert(token.to_string(), String::new());
                }
            }
        }

        Self { directives }
    }

    /// Parse every `Cache-Control` occurrence in `headers`.
    ///
    /// Repeated headers are joined with commas before parsing, so a later
    /// occurrence overrides an earlier one. A missing header gives the same
    /// empty mapping as an empty one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let joined = headers
            .get_all(CACHE_CONTROL)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        Self::parse(&joined)
    }

    /// Value of a directive; `Some("")` for presence-only directives
    pub fn get(&self, name: &str) -> Option<&str> {
        self.directives.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }
}

/// Largest delta accepted, in seconds (about 292 years)
pub const MAX_DELTA_SECONDS: i64 = 9_223_372_036;

/// Parse a delta-seconds directive value.
///
/// Returns `None` for anything that is not a plain (optionally signed)
/// integer, or whose magnitude exceeds `MAX_DELTA_SECONDS`; callers decide
/// whether that means zero or absent.
pub fn parse_delta_seconds(value: &str) -> Option<TimeDelta> {
    let secs = value.parse::<i64>().ok()?;
    if secs.unsigned_abs() > MAX_DELTA_SECONDS as u64 {
        return None;
    }
    TimeDelta::try_seconds(secs)
}
