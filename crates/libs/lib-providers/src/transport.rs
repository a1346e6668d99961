//! # Instrumented HTTP Transport
//!
//! A single seam through which every outbound provider request flows. The
//! transport records a per-(service, endpoint) call count, opens a trace
//! span, measures latency, and injects a trace header before handing the
//! request to the underlying executor.
//!
//! The executor itself is a trait object so adapters stay testable: the
//! production [`ReqwestExecutor`] wraps a `reqwest::Client` with the
//! adapter's timeout, and tests substitute an in-memory implementation
//! scripting responses.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// HTTP method subset the adapters need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outbound provider request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Full URL including any query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// JSON body for POST requests.
    pub body: Option<Vec<u8>>,
    /// Explicit endpoint name override for counters. JSON-RPC adapters set
    /// this to the RPC method since every call shares one path.
    pub endpoint_hint: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            endpoint_hint: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: &impl Serialize) -> Result<Self> {
        let body = serde_json::to_vec(body).map_err(|e| Error::Decode(e.to_string()))?;
        Ok(Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
            endpoint_hint: None,
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn endpoint_hint(mut self, hint: impl Into<String>) -> Self {
        self.endpoint_hint = Some(hint.into());
        self
    }
}

/// A provider response, body fully read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Upstreams serve HTML error pages when throttling; a body that opens
    /// with an HTML tag is never valid provider JSON.
    pub fn looks_like_html(&self) -> bool {
        let trimmed = self
            .body
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map(|start| &self.body[start..])
            .unwrap_or(&[]);
        trimmed.starts_with(b"<")
    }
}

/// Pluggable HTTP executor.
#[async_trait]
pub trait HttpExecute: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Production executor backed by `reqwest` with a fixed per-adapter timeout.
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExecute for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

/// Sink for per-call accounting. Implemented by the stats accountant; the
/// transport is its sole integration point.
pub trait CallRecorder: Send + Sync {
    fn record(&self, service: &str, endpoint: &str);
}

/// Recorder that drops every call. Useful in tests that don't assert counts.
pub struct NoopRecorder;

impl CallRecorder for NoopRecorder {
    fn record(&self, _service: &str, _endpoint: &str) {}
}

/// Derive a stable endpoint name from a request URL: the path without
/// scheme, host, or query string.
pub fn endpoint_name(url: &str) -> String {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = after_scheme
        .find('/')
        .map(|idx| &after_scheme[idx..])
        .unwrap_or("/");
    let path = path.split_once('?').map(|(p, _)| p).unwrap_or(path);
    path.to_string()
}

/// The instrumented executor wrapper each adapter owns.
pub struct InstrumentedTransport {
    service: &'static str,
    executor: Arc<dyn HttpExecute>,
    recorder: Arc<dyn CallRecorder>,
}

impl InstrumentedTransport {
    pub fn new(
        service: &'static str,
        executor: Arc<dyn HttpExecute>,
        recorder: Arc<dyn CallRecorder>,
    ) -> Self {
        Self {
            service,
            executor,
            recorder,
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Execute a request, recording the call and timing it.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let endpoint = request
            .endpoint_hint
            .clone()
            .unwrap_or_else(|| endpoint_name(&request.url));

        self.recorder.record(self.service, &endpoint);

        let request = request.header("x-request-id", Uuid::new_v4().to_string());

        let span = tracing::info_span!(
            "provider_call",
            service = self.service,
            endpoint = %endpoint
        );
        let started = Instant::now();
        let result = self.executor.execute(request).instrument(span).await;
        let elapsed_ms = started.elapsed().as_millis();

        match &result {
            Ok(response) => tracing::debug!(
                service = self.service,
                endpoint = %endpoint,
                status = response.status,
                elapsed_ms,
                "provider call completed"
            ),
            Err(err) => tracing::warn!(
                service = self.service,
                endpoint = %endpoint,
                elapsed_ms,
                error = %err,
                "provider call failed"
            ),
        }

        result
    }

    /// Execute a request and decode its body as JSON.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let response = self.execute(request).await?;
        decode_json(response)
    }
}

/// Decode a provider response, enforcing the JSON-only contract.
///
/// HTML at any status is classified as rate limiting; 404 maps to
/// not-found; other non-2xx statuses surface as status errors with a body
/// snippet for diagnostics.
pub fn decode_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    if response.looks_like_html() {
        return Err(Error::RateLimited(format!(
            "HTML body at status {}",
            response.status
        )));
    }

    if !response.is_success() {
        let message = body_snippet(&response.body);
        return match response.status {
            429 => Err(Error::RateLimited(message)),
            404 => Err(Error::NotFound(message)),
            status => Err(Error::Status { status, message }),
        };
    }

    serde_json::from_slice(&response.body).map_err(|e| Error::Decode(e.to_string()))
}

fn body_snippet(body: &[u8]) -> String {
    const SNIPPET_LEN: usize = 200;
    let text = String::from_utf8_lossy(body);
    text.chars().take(SNIPPET_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(serde::Deserialize, Debug)]
    struct Payload {
        value: u64,
    }

    struct StaticExecutor {
        response: HttpResponse,
    }

    #[async_trait]
    impl HttpExecute for StaticExecutor {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
            Ok(self.response.clone())
        }
    }

    struct RecordingRecorder {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl CallRecorder for RecordingRecorder {
        fn record(&self, service: &str, endpoint: &str) {
            self.calls
                .lock()
                .unwrap()
                .push((service.to_string(), endpoint.to_string()));
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn endpoint_name_strips_host_and_query() {
        assert_eq!(
            endpoint_name("https://api.example.com/defi/history_price?address=abc&type=1m"),
            "/defi/history_price"
        );
        assert_eq!(endpoint_name("https://api.example.com"), "/");
        assert_eq!(endpoint_name("/already/a/path"), "/already/a/path");
    }

    #[test]
    fn html_body_is_rate_limited_at_any_status() {
        let err =
            decode_json::<Payload>(json_response(200, "<html><body>slow down</body></html>"))
                .unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)));

        let err = decode_json::<Payload>(json_response(503, "  <!DOCTYPE html>")).unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)));
    }

    #[test]
    fn status_429_is_rate_limited() {
        let err = decode_json::<Payload>(json_response(429, r#"{"message":"slow"}"#)).unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)));
    }

    #[test]
    fn status_404_is_not_found() {
        let err = decode_json::<Payload>(json_response(404, r#"{"message":"nope"}"#)).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn bad_json_is_decode_error() {
        let err = decode_json::<Payload>(json_response(200, r#"{"value":"text"}"#)).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn good_json_decodes() {
        let payload = decode_json::<Payload>(json_response(200, r#"{"value":7}"#)).unwrap();
        assert_eq!(payload.value, 7);
    }

    #[tokio::test]
    async fn transport_records_service_and_endpoint() {
        let recorder = Arc::new(RecordingRecorder {
            calls: Mutex::new(Vec::new()),
        });
        let transport = InstrumentedTransport::new(
            "market-data",
            Arc::new(StaticExecutor {
                response: json_response(200, r#"{"value":1}"#),
            }),
            recorder.clone(),
        );

        transport
            .execute(HttpRequest::get(
                "https://api.example.com/defi/token_trending?limit=50",
            ))
            .await
            .unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[(
                "market-data".to_string(),
                "/defi/token_trending".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn endpoint_hint_overrides_path() {
        let recorder = Arc::new(RecordingRecorder {
            calls: Mutex::new(Vec::new()),
        });
        let transport = InstrumentedTransport::new(
            "chain-rpc",
            Arc::new(StaticExecutor {
                response: json_response(200, r#"{"value":1}"#),
            }),
            recorder.clone(),
        );

        transport
            .execute(
                HttpRequest::get("https://rpc.example.com/").endpoint_hint("getBalance"),
            )
            .await
            .unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls[0].1, "getBalance");
    }
}
