//! Scripted TEI backend
//!
//! An axum server on an ephemeral local port that answers each path from a
//! script and records every request it sees.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A canned answer for one request.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

/// A request as received by the scripted backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl CapturedRequest {
    /// Header value by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The body parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("captured body is not JSON ({}): {}", e, self.body))
    }
}

#[derive(Default)]
struct Script {
    /// One-shot answers, consumed in order.
    queued: HashMap<String, VecDeque<ScriptedResponse>>,
    /// Answer used once the queue for a path is empty.
    sticky: HashMap<String, ScriptedResponse>,
    requests: Vec<CapturedRequest>,
}

/// Scripted stand-in for a TEI deployment.
///
/// Paths with nothing scripted answer 404 with a TEI-style error body. The
/// server stops when this value is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use test_utils::TestTeiBackend;
///
/// # async fn example() {
/// let backend = TestTeiBackend::start().await;
/// backend.enqueue("/embed", 429, r#"{"error":"overloaded"}"#);
/// backend.respond("/embed", 200, "[[0.1, 0.2]]");
///
/// let url = backend.url();
/// // point the client at `url`...
/// assert_eq!(backend.request_count("/embed"), 0);
/// # }
/// ```
pub struct TestTeiBackend {
    addr: SocketAddr,
    script: Arc<Mutex<Script>>,
    handle: JoinHandle<()>,
}

impl TestTeiBackend {
    pub async fn start() -> Self {
        let script = Arc::new(Mutex::new(Script::default()));

        let app = Router::new()
            .fallback(handle_request)
            .with_state(script.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind scripted TEI backend");
        let addr = listener
            .local_addr()
            .expect("Failed to read scripted TEI backend address");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Scripted TEI backend stopped");
            }
        });

        tracing::debug!(%addr, "Scripted TEI backend ready");

        Self {
            addr,
            script,
            handle,
        }
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Answer the next request to `path` with this, once.
    pub fn enqueue(&self, path: &str, status: u16, body: impl Into<String>) {
        self.push(
            path,
            ScriptedResponse {
                status,
                body: body.into(),
                delay: None,
            },
        );
    }

    /// Answer every request to `path` with this once the queue is drained.
    pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) {
        self.set_sticky(
            path,
            ScriptedResponse {
                status,
                body: body.into(),
                delay: None,
            },
        );
    }

    /// Like [`respond`](Self::respond), but wait `delay` before answering.
    pub fn respond_delayed(&self, path: &str, status: u16, body: impl Into<String>, delay: Duration) {
        self.set_sticky(
            path,
            ScriptedResponse {
                status,
                body: body.into(),
                delay: Some(delay),
            },
        );
    }

    pub fn push(&self, path: &str, response: ScriptedResponse) {
        self.lock()
            .queued
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn set_sticky(&self, path: &str, response: ScriptedResponse) {
        self.lock().sticky.insert(path.to_string(), response);
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("scripted backend lock poisoned")
    }
}

impl Drop for TestTeiBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_request(
    State(script): State<Arc<Mutex<Script>>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();

    let scripted = {
        let mut script = script.lock().expect("scripted backend lock poisoned");
        script.requests.push(CapturedRequest {
            path: path.clone(),
            headers: headers
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });

        script
            .queued
            .get_mut(&path)
            .and_then(VecDeque::pop_front)
            .or_else(|| script.sticky.get(&path).cloned())
    };

    let Some(scripted) = scripted else {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "application/json")],
            format!(r#"{{"error":"no scripted response for {}","error_type":"NotFound"}}"#, path),
        )
            .into_response();
    };

    if let Some(delay) = scripted.delay {
        tokio::time::sleep(delay).await;
    }

    let status = StatusCode::from_u16(scripted.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        scripted.body,
    )
        .into_response()
}
