use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, instrument};
use validator::Validate;

use super::{RetryPolicy, TeiBackend, execute_with_retry};
use crate::config::TeiConfig;
use crate::context::RequestContext;
use crate::error::{
    EmbeddingsError, EmbeddingsResult, TeiError, classify_http_status, classify_transport_failure,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
const MAX_RAW_ERROR_CHARS: usize = 200;

/// HTTP client for a TEI deployment.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct TeiHttpClient {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl TeiHttpClient {
    pub fn new(config: &TeiConfig) -> EmbeddingsResult<Self> {
        config
            .validate()
            .map_err(|e| EmbeddingsError::Config(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(config.max_connections)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE)
            .build()
            .map_err(|e| EmbeddingsError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            policy: config.retry_policy(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// One POST, classified. Never retries.
    async fn send_once(
        &self,
        ctx: &RequestContext,
        url: &str,
        body: Bytes,
    ) -> Result<Bytes, TeiError> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        if let Ok(value) = HeaderValue::from_str(ctx.request_id()) {
            request = request.header(REQUEST_ID_HEADER, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport_failure(&e).with_request_id(ctx.request_id()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_transport_failure(&e).with_request_id(ctx.request_id()))?;

        if status.is_success() {
            return Ok(bytes);
        }

        let code = status.as_u16();
        debug!(
            request_id = ctx.request_id(),
            status_code = code,
            body_size = bytes.len(),
            "Handling error response"
        );
        Err(classify_http_status(code, error_message(code, &bytes)).with_request_id(ctx.request_id()))
    }
}

#[async_trait]
impl TeiBackend for TeiHttpClient {
    #[instrument(skip(self, ctx, body), fields(request_id = ctx.request_id(), body_size = body.len()))]
    async fn post(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        body: Bytes,
    ) -> EmbeddingsResult<Bytes> {
        let url = self.endpoint_url(endpoint);
        execute_with_retry(&self.policy, ctx, &url, |_| {
            self.send_once(ctx, &url, body.clone())
        })
        .await
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Human-readable message for a non-2xx body.
///
/// JSON `error` wins over `message`; a non-JSON body is used as is, cut to 200
/// characters. Anything else falls back to `HTTP <code>`.
fn error_message(code: u16, body: &[u8]) -> String {
    let fallback = || format!("HTTP {}", code);
    if body.is_empty() {
        return fallback();
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => {
            if let Some(error_type) = parsed.error_type.as_deref() {
                debug!(status_code = code, error_type, "Backend reported error type");
            }
            parsed
                .error
                .filter(|s| !s.is_empty())
                .or(parsed.message.filter(|s| !s.is_empty()))
                .unwrap_or_else(fallback)
        }
        Err(_) => {
            let raw = String::from_utf8_lossy(body);
            if raw.chars().count() > MAX_RAW_ERROR_CHARS {
                let cut: String = raw.chars().take(MAX_RAW_ERROR_CHARS).collect();
                format!("{}...", cut)
            } else {
                raw.into_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use test_utils::TestTeiBackend;

    fn config_for(backend: &TestTeiBackend) -> TeiConfig {
        TeiConfig::new(backend.url()).with_retries(2, Duration::from_millis(10))
    }

    // ==================== error bodies ====================

    #[test]
    fn test_error_message_prefers_error_field() {
        let body = br#"{"error":"Input validation error","error_type":"Validation","message":"other"}"#;
        assert_eq!(error_message(413, body), "Input validation error");
    }

    #[test]
    fn test_error_message_falls_back_to_message_field() {
        assert_eq!(error_message(500, br#"{"message":"model crashed"}"#), "model crashed");
    }

    #[test]
    fn test_error_message_json_without_text_uses_status() {
        assert_eq!(error_message(429, br#"{"error":""}"#), "HTTP 429");
        assert_eq!(error_message(502, b""), "HTTP 502");
    }

    #[test]
    fn test_error_message_raw_text_is_truncated() {
        let raw = "x".repeat(250);
        let message = error_message(502, raw.as_bytes());
        assert_eq!(message.len(), 203);
        assert!(message.ends_with("..."));

        assert_eq!(error_message(502, b"Bad Gateway"), "Bad Gateway");
    }

    // ==================== client ====================

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = TeiHttpClient::new(&TeiConfig::new("::not-a-url::")).unwrap_err();
        assert!(matches!(err, EmbeddingsError::Config(_)));
    }

    #[test]
    fn test_endpoint_url_joins_cleanly() {
        let client = TeiHttpClient::new(&TeiConfig::new("http://tei:8080/")).unwrap();
        assert_eq!(client.base_url(), "http://tei:8080");
        assert_eq!(client.endpoint_url("/embed"), "http://tei:8080/embed");
        assert_eq!(client.endpoint_url("similarity"), "http://tei:8080/similarity");
    }

    #[tokio::test]
    async fn test_post_sends_headers_and_returns_body() {
        let backend = TestTeiBackend::start().await;
        backend.respond("/embed", 200, "[[0.1,0.2]]");

        let client = TeiHttpClient::new(&config_for(&backend)).unwrap();
        let ctx = RequestContext::new().with_request_id("req-42");
        let body = client
            .post(&ctx, "/embed", Bytes::from_static(br#"{"inputs":"hi"}"#))
            .await
            .unwrap();

        assert_eq!(body, Bytes::from_static(b"[[0.1,0.2]]"));

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.path, "/embed");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.header("x-request-id"), Some("req-42"));
        assert!(request.header("user-agent").is_some_and(|ua| ua.contains('/')));
        assert_eq!(request.body, r#"{"inputs":"hi"}"#);
    }

    #[tokio::test]
    async fn test_retries_overload_then_succeeds() {
        let backend = TestTeiBackend::start().await;
        backend.enqueue("/embed", 429, r#"{"error":"Model is overloaded"}"#);
        backend.respond("/embed", 200, "[[1.0]]");

        let client = TeiHttpClient::new(&config_for(&backend)).unwrap();
        let body = client
            .post(&RequestContext::new(), "/embed", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        assert_eq!(body, Bytes::from_static(b"[[1.0]]"));
        assert_eq!(backend.request_count("/embed"), 2);
        // same buffered body on both attempts
        let requests = backend.requests();
        assert_eq!(requests[0].body, requests[1].body);
    }

    #[tokio::test]
    async fn test_tokenizer_error_not_retried() {
        let backend = TestTeiBackend::start().await;
        backend.respond(
            "/embed",
            422,
            r#"{"error":"Input is too long","error_type":"Tokenizer"}"#,
        );

        let client = TeiHttpClient::new(&config_for(&backend)).unwrap();
        let ctx = RequestContext::new().with_request_id("r-7");
        let err = client
            .post(&ctx, "/embed", Bytes::from_static(b"{}"))
            .await
            .unwrap_err();

        let tei = err.tei_error().unwrap();
        assert_eq!(tei.kind(), ErrorKind::Tokenizer);
        assert_eq!(tei.code(), Some(422));
        assert_eq!(tei.message(), "Input is too long");
        assert_eq!(tei.request_id(), Some("r-7"));
        assert_eq!(backend.request_count("/embed"), 1);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let backend = TestTeiBackend::start().await;
        backend.respond("/embed", 500, "internal boom");

        let client = TeiHttpClient::new(&config_for(&backend)).unwrap();
        let err = client
            .post(&RequestContext::new(), "/embed", Bytes::from_static(b"{}"))
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingsError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.tei_error().unwrap().message(), "internal boom");
        assert_eq!(backend.request_count("/embed"), 3);
    }

    #[tokio::test]
    async fn test_unhealthy_is_not_retried() {
        let backend = TestTeiBackend::start().await;
        backend.respond("/embed", 503, "");

        let client = TeiHttpClient::new(&config_for(&backend)).unwrap();
        let err = client
            .post(&RequestContext::new(), "/embed", Bytes::from_static(b"{}"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unhealthy);
        assert_eq!(err.tei_error().unwrap().message(), "HTTP 503");
        assert_eq!(backend.request_count("/embed"), 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = TeiConfig::new(format!("http://{}", addr))
            .with_retries(1, Duration::from_millis(5));
        let client = TeiHttpClient::new(&config).unwrap();
        let err = client
            .post(&RequestContext::new(), "/embed", Bytes::from_static(b"{}"))
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingsError::RetriesExhausted { attempts: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_slow_backend_is_timeout() {
        let backend = TestTeiBackend::start().await;
        backend.respond_delayed("/embed", 200, "[[1.0]]", Duration::from_secs(2));

        let config = TeiConfig::new(backend.url())
            .with_timeout(Duration::from_millis(100))
            .with_retries(0, Duration::from_millis(5));
        let client = TeiHttpClient::new(&config).unwrap();
        let err = client
            .post(&RequestContext::new(), "/embed", Bytes::from_static(b"{}"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.tei_error().unwrap().is_retryable());
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight_request() {
        let backend = TestTeiBackend::start().await;
        backend.respond_delayed("/embed", 200, "[[1.0]]", Duration::from_secs(5));

        let client = TeiHttpClient::new(&config_for(&backend)).unwrap();
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        let err = client
            .post(&ctx, "/embed", Bytes::from_static(b"{}"))
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingsError::Tei(_)));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.tei_error().unwrap().message(), "request timeout");
    }
}
