use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::TeiError;

/// Per-call state carried from the gRPC boundary down to the transport.
///
/// The request id is sent to the backend as `X-Request-ID` and stamped onto
/// classified errors. Cancelling the token or passing the deadline aborts
/// backoff waits and in-flight sends.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// A context with a fresh UUIDv4 request id, no deadline and its own token.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            cancellation: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the call is cancelled or its deadline passes, yielding the
    /// matching `timeout` error. Pending forever otherwise.
    pub async fn cancelled(&self) -> TeiError {
        let err = match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancellation.cancelled() => TeiError::canceled(),
                _ = tokio::time::sleep_until(deadline) => TeiError::deadline_exceeded(),
            },
            None => {
                self.cancellation.cancelled().await;
                TeiError::canceled()
            }
        };
        err.with_request_id(self.request_id.clone())
    }
}
