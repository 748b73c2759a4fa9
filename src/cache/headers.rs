//! Header classification and HTTP date helpers.
//!
//! - `end_to_end_headers`: response header names that survive a hop, used
//!   when a `304 Not Modified` is merged onto a cached response.
//! - `multi_value`: all comma-separated values of a possibly repeated header.
//! - `parse_http_date` / `format_http_date`: the RFC1123 fixed format, the
//!   only date format accepted for `Date`, `Expires` and `Last-Modified`.

use chrono::{DateTime, NaiveDateTime, Utc};
use http::header::{HeaderName, CONNECTION, DATE};
use http::HeaderMap;
use std::collections::HashSet;

use crate::error::{HttpCacheError, Result};

/// RFC1123 timestamp layout, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Headers that are always hop-by-hop
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Names of the end-to-end headers in `headers`.
///
/// Every header listed in the `Connection` value is treated as hop-by-hop in
/// addition to the fixed set.
pub fn end_to_end_headers(headers: &HeaderMap) -> Vec<HeaderName> {
    let mut hop_by_hop: HashSet<String> = HOP_BY_HOP.iter().map(|h| h.to_string()).collect();

    for extra in multi_value(headers, &CONNECTION) {
        if !extra.is_empty() {
            hop_by_hop.insert(extra.to_ascii_lowercase());
        }
    }

    headers
        .keys()
        .filter(|name| !hop_by_hop.contains(name.as_str()))
        .cloned()
        .collect()
}

/// All values of `name`, across repeated occurrences, split on commas and
/// whitespace-trimmed.
pub fn multi_value(headers: &HeaderMap, name: &HeaderName) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|field| field.trim().to_string())
        .collect()
}

/// First value of `name` as a string, if present and valid UTF-8
pub fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Parse an RFC1123 HTTP date
pub fn parse_http_date(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| HttpCacheError::InvalidDate(value.to_string()))
}

/// Format a timestamp as an RFC1123 HTTP date
pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

/// The response `Date` header.
///
/// Fails with `NoDateHeader` when the header is absent or empty, and with
/// `InvalidDate` when it is not RFC1123.
pub fn response_date(headers: &HeaderMap) -> Result<DateTime<Utc>> {
    match header_str(headers, &DATE) {
        Some(value) if !value.is_empty() => parse_http_date(value),
        _ => Err(HttpCacheError::NoDateHeader),
    }
}
