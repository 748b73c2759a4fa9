// End-to-end behaviour of CachedClient against a scripted transport

mod common;

use bytes::Bytes;
use common::*;
use http::StatusCode;
use httpcache::storage::{MokaStorage, Storage};
use httpcache::{CacheOptions, CachedClient, HttpCacheError};
use rstest::rstest;
use std::sync::Arc;

#[rstest]
#[case::just_stored(0, true)]
#[case::half_way(30, true)]
#[case::last_second(59, true)]
#[case::at_expiry(60, false)]
#[case::long_after(600, false)]
#[tokio::test]
async fn test_max_age_freshness(#[case] elapsed: i64, #[case] served_from_cache: bool) {
    // Test: a max-age response is reused without a transport call until it expires
    let h = Harness::new();
    h.transport.reply(ok(&[("cache-control", "max-age=60")], "payload"));
    let (first, body) = h.fetch(get(&[])).await;
    assert!(!from_cache(&first));
    assert_eq!(body, Bytes::from("payload"));

    h.at(elapsed);
    if !served_from_cache {
        h.transport.reply(ok(&[("cache-control", "max-age=60")], "refetched"));
    }
    let (second, body) = h.fetch(get(&[])).await;

    assert_eq!(from_cache(&second), served_from_cache);
    if served_from_cache {
        assert_eq!(body, Bytes::from("payload"));
        assert_eq!(h.transport.calls(), 1);
    } else {
        assert_eq!(body, Bytes::from("refetched"));
        assert_eq!(h.transport.calls(), 2);
    }
}

#[tokio::test]
async fn test_expires_header_gives_lifetime() {
    let h = Harness::new();
    h.transport
        .reply(ok(&[("expires", "Wed, 01 May 2024 12:05:00 GMT")], "expiring"));
    h.fetch(get(&[])).await;

    h.at(299);
    let (response, _) = h.fetch(get(&[])).await;
    assert!(from_cache(&response));
    assert_eq!(h.transport.calls(), 1);
}

#[rstest]
#[case::request_no_store(&[("cache-control", "no-store")], "max-age=60")]
#[case::response_no_store(&[], "max-age=60, no-store")]
#[case::response_no_store_only(&[], "no-store")]
#[tokio::test]
async fn test_no_store_is_never_stored(
    #[case] request_headers: &[(&str, &str)],
    #[case] response_cache_control: &str,
) {
    let h = Harness::new();
    h.transport.reply(ok(&[("cache-control", response_cache_control)], "secret"));

    let (_, body) = h.fetch(get(request_headers)).await;
    assert_eq!(body, Bytes::from("secret"));
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_no_store_evicts_existing_entry() {
    let h = Harness::new();
    h.transport.reply(ok(&[("cache-control", "max-age=0")], "old"));
    h.fetch(get(&[])).await;
    assert!(!h.storage.is_empty());

    h.transport.reply(ok(&[("cache-control", "no-store")], "new"));
    h.fetch(get(&[])).await;
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_vary_mismatch_is_a_miss() {
    // Test: an entry stored for Accept-Language: en is not served to fr
    let h = Harness::new();
    h.transport.reply(ok(
        &[("cache-control", "max-age=60"), ("vary", "Accept-Language")],
        "english",
    ));
    h.fetch(get(&[("accept-language", "en")])).await;

    let (same, body) = h.fetch(get(&[("accept-language", "en")])).await;
    assert!(from_cache(&same));
    assert_eq!(body, Bytes::from("english"));

    h.transport.reply(ok(
        &[("cache-control", "max-age=60"), ("vary", "Accept-Language")],
        "french",
    ));
    let (other, body) = h.fetch(get(&[("accept-language", "fr")])).await;
    assert!(!from_cache(&other));
    assert_eq!(body, Bytes::from("french"));
    assert_eq!(h.transport.calls(), 2);
}

#[tokio::test]
async fn test_vary_mismatch_does_not_delete_entry() {
    let h = Harness::new();
    h.transport.reply(ok(
        &[("cache-control", "max-age=60"), ("vary", "Accept-Language")],
        "english",
    ));
    h.fetch(get(&[("accept-language", "en")])).await;

    let (response, body) = h
        .fetch(get(&[
            ("accept-language", "fr"),
            ("cache-control", "only-if-cached"),
        ]))
        .await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(body.is_empty());
    assert!(h.storage.contains_key(URL));
}

#[tokio::test]
async fn test_vary_on_absent_request_header() {
    let h = Harness::new();
    h.transport.reply(ok(
        &[("cache-control", "max-age=60"), ("vary", "Accept-Encoding")],
        "identity",
    ));
    h.fetch(get(&[])).await;

    let (response, _) = h.fetch(get(&[])).await;
    assert!(from_cache(&response));

    h.transport.reply(ok(&[("cache-control", "max-age=60")], "gzip"));
    let (response, _) = h.fetch(get(&[("accept-encoding", "gzip")])).await;
    assert!(!from_cache(&response));
}

#[tokio::test]
async fn test_only_if_cached_miss_synthesizes_504() {
    let h = Harness::new();
    let (response, body) = h.fetch(get(&[("cache-control", "only-if-cached")])).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response.version(), http::Version::HTTP_11);
    assert!(body.is_empty());
    assert_eq!(h.transport.calls(), 0);
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_only_if_cached_serves_stale_entry() {
    let h = Harness::new();
    h.transport.reply(ok(&[("cache-control", "max-age=10")], "old"));
    h.fetch(get(&[])).await;

    h.at(3600);
    let (response, body) = h.fetch(get(&[("cache-control", "only-if-cached")])).await;
    assert!(from_cache(&response));
    assert_eq!(body, Bytes::from("old"));
    assert_eq!(h.transport.calls(), 1);
}

#[tokio::test]
async fn test_round_trip_preserves_headers_and_body() {
    let h = Harness::new();
    let original = ok(
        &[
            ("cache-control", "max-age=60"),
            ("content-type", "application/octet-stream"),
            ("set-cookie", "a=1"),
            ("set-cookie", "b=2"),
            ("x-custom", "value"),
        ],
        "\u{0}binary-ish body",
    );
    let expected_headers = original.headers().clone();
    h.transport.reply(original);
    h.fetch(get(&[])).await;

    let (cached, body) = h.fetch(get(&[])).await;
    assert_eq!(cached.status(), StatusCode::OK);
    assert_eq!(body, Bytes::from("\u{0}binary-ish body"));

    let mut headers = cached.headers().clone();
    headers.remove("x-from-cache");
    assert_eq!(headers, expected_headers);
}

#[tokio::test]
async fn test_cached_response_exposes_stored_entry() {
    let h = Harness::new();
    h.transport.reply(ok(
        &[("cache-control", "max-age=60"), ("vary", "Accept")],
        "doc",
    ));
    h.fetch(get(&[("accept", "text/html")])).await;

    let entry = h.client.cached_response(&get(&[])).unwrap();
    assert_eq!(entry.body, Bytes::from("doc"));
    assert_eq!(entry.headers.get("x-varied-accept").unwrap(), "text/html");
    assert!(entry.headers.get("x-from-cache").is_none());
}

#[tokio::test]
async fn test_request_no_cache_bypasses_fresh_entry() {
    let h = Harness::new();
    h.transport.reply(ok(&[("cache-control", "max-age=60")], "v1"));
    h.fetch(get(&[])).await;

    h.transport.reply(ok(&[("cache-control", "max-age=60")], "v2"));
    let (response, body) = h.fetch(get(&[("cache-control", "no-cache")])).await;
    assert!(!from_cache(&response));
    assert_eq!(body, Bytes::from("v2"));

    let (response, body) = h.fetch(get(&[])).await;
    assert!(from_cache(&response));
    assert_eq!(body, Bytes::from("v2"));
}

#[tokio::test]
async fn test_request_no_cache_falls_back_to_stale_on_transport_error() {
    // Test: a no-cache fetch that cannot reach the origin still honours stale-if-error
    let h = Harness::new();
    h.transport.reply(ok(
        &[("cache-control", "max-age=60, stale-if-error")],
        "v1",
    ));
    h.fetch(get(&[])).await;

    h.transport.fail("connection refused");
    let (response, body) = h.fetch(get(&[("cache-control", "no-cache")])).await;
    assert!(from_cache(&response));
    assert_eq!(body, Bytes::from("v1"));
    assert!(h.storage.contains_key(URL));
}

#[tokio::test]
async fn test_request_no_cache_without_stale_if_error_evicts_on_error() {
    let h = Harness::new();
    h.transport.reply(ok(&[("cache-control", "max-age=60")], "v1"));
    h.fetch(get(&[])).await;

    h.transport.fail("connection refused");
    let err = h
        .client
        .execute(get(&[("cache-control", "no-cache")]))
        .await
        .unwrap_err();
    assert!(matches!(err, HttpCacheError::Transport(_)));
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_request_no_cache_falls_back_to_stale_on_server_error() {
    let h = Harness::new();
    h.transport.reply(ok(
        &[("cache-control", "max-age=60, stale-if-error=300")],
        "v1",
    ));
    h.fetch(get(&[])).await;

    h.transport
        .reply(response(StatusCode::BAD_GATEWAY, &[], "upstream down"));
    let (response, body) = h.fetch(get(&[("cache-control", "no-cache")])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(from_cache(&response));
    assert_eq!(body, Bytes::from("v1"));
    assert!(h.storage.contains_key(URL));
}

#[tokio::test]
async fn test_request_no_cache_merges_not_modified() {
    // Test: the no-cache request goes out unmodified, and a 304 still refreshes the entry
    let h = Harness::new();
    h.transport.reply(ok(
        &[("cache-control", "max-age=60"), ("etag", "\"v1\"")],
        "v1",
    ));
    h.fetch(get(&[])).await;

    h.transport.reply(response(
        StatusCode::NOT_MODIFIED,
        &[("cache-control", "max-age=600")],
        "",
    ));
    let (response, body) = h.fetch(get(&[("cache-control", "no-cache")])).await;
    let sent = h.transport.last_request().unwrap();
    assert!(sent.headers.get("if-none-match").is_none());
    assert_eq!(response.status(), StatusCode::OK);
    assert!(from_cache(&response));
    assert_eq!(body, Bytes::from("v1"));

    let entry = h.client.cached_response(&get(&[])).unwrap();
    assert_eq!(entry.headers.get("cache-control").unwrap(), "max-age=600");
}

#[tokio::test]
async fn test_range_requests_bypass_cache() {
    let h = Harness::new();
    h.transport.reply(ok(&[("cache-control", "max-age=60")], "full"));
    h.fetch(get(&[])).await;

    h.transport
        .reply(response(StatusCode::PARTIAL_CONTENT, &[], "fu"));
    let (response, _) = h.fetch(get(&[("range", "bytes=0-1")])).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(h.transport.calls(), 2);
}

#[tokio::test]
async fn test_transport_error_on_miss_propagates() {
    let h = Harness::new();
    h.transport.fail("connection refused");

    let err = h.client.execute(get(&[])).await.unwrap_err();
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_ttl_is_passed_to_storage() {
    let transport = Arc::new(MockTransport::default());
    let storage = Arc::new(MokaStorage::new(1024 * 1024));
    let client = CachedClient::new(transport.clone(), storage.clone()).with_options(CacheOptions {
        ttl_seconds: 1,
        mark_cached_responses: true,
    });

    transport.reply(ok(&[("cache-control", "max-age=3600")], "short-lived"));
    drain(client.execute(get(&[])).await.unwrap()).await;
    assert!(storage.get(URL).unwrap().is_some());

    std::thread::sleep(std::time::Duration::from_millis(1100));
    storage.run_pending_tasks();
    assert!(storage.get(URL).unwrap().is_none());
}

#[tokio::test]
async fn test_undrained_body_is_not_stored() {
    let h = Harness::new();
    h.transport.reply(ok(&[("cache-control", "max-age=60")], "abandoned"));

    let response = h.client.execute(get(&[])).await.unwrap();
    drop(response);
    assert!(h.storage.is_empty());
}
