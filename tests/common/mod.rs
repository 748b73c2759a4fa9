// Shared helpers for the integration tests: a scripted transport, a manual
// clock pinned to a fixed origin time, and request/response builders.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use http_body_util::BodyExt;
use httpcache::cache::headers::format_http_date;
use httpcache::storage::MemoryStorage;
use httpcache::transport::full_body;
use httpcache::{CacheOptions, CachedClient, ManualClock, ResponseBody, Transport, TransportError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// What the transport saw for one call
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

enum Reply {
    Response(Response<Bytes>),
    Error(String),
}

/// Transport answering from a script and recording every request
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn reply(&self, response: Response<Bytes>) {
        self.replies.lock().push_back(Reply::Response(response));
    }

    pub fn fail(&self, message: &str) {
        self.replies.lock().push_back(Reply::Error(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<ResponseBody>, TransportError> {
        self.requests.lock().push(RecordedRequest {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        });
        match self.replies.lock().pop_front() {
            Some(Reply::Response(response)) => Ok(response.map(full_body)),
            Some(Reply::Error(message)) => Err(TransportError::new(message)),
            None => Err(TransportError::new("unexpected request: nothing scripted")),
        }
    }
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub storage: Arc<MemoryStorage>,
    pub clock: Arc<ManualClock>,
    pub client: CachedClient,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(CacheOptions::default())
    }

    pub fn with_options(options: CacheOptions) -> Self {
        let transport = Arc::new(MockTransport::default());
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(origin()));
        let client = CachedClient::new(transport.clone(), storage.clone())
            .with_clock(clock.clone())
            .with_options(options);
        Self {
            transport,
            storage,
            clock,
            client,
        }
    }

    /// Move the clock to `secs` seconds after `origin()`
    pub fn at(&self, secs: i64) {
        self.clock.set(origin() + TimeDelta::seconds(secs));
    }

    /// Execute and drain the body so streaming capture completes
    pub async fn fetch(&self, request: Request<Bytes>) -> (Response<()>, Bytes) {
        let response = self.client.execute(request).await.expect("request failed");
        drain(response).await
    }
}

/// Instant every scripted `Date` header refers to
pub fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub const URL: &str = "http://example.com/resource";

pub fn get(headers: &[(&str, &str)]) -> Request<Bytes> {
    let mut builder = Request::get(URL);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Bytes::new()).unwrap()
}

/// Origin response dated `origin()`
pub fn response(status: StatusCode, headers: &[(&str, &str)], body: &'static str) -> Response<Bytes> {
    let mut builder = Response::builder()
        .status(status)
        .header("date", format_http_date(origin()));
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Bytes::from_static(body.as_bytes())).unwrap()
}

pub fn ok(headers: &[(&str, &str)], body: &'static str) -> Response<Bytes> {
    response(StatusCode::OK, headers, body)
}

pub async fn drain(response: Response<ResponseBody>) -> (Response<()>, Bytes) {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.expect("body failed").to_bytes();
    (Response::from_parts(parts, ()), bytes)
}

pub fn from_cache(response: &Response<()>) -> bool {
    response.headers().get("x-from-cache").is_some_and(|v| v == "1")
}
