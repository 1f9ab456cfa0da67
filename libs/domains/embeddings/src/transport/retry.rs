use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::context::RequestContext;
use crate::error::{EmbeddingsError, EmbeddingsResult, TeiError};

/// Ceiling on a single backoff wait.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry schedule for one logical backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (default: 3)
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each one after (default: 1s)
    pub base_delay: Duration,
    /// Upper bound for any single wait (default: 30s)
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Wait before attempt number `attempt` (0 is the first, unconditional one).
    ///
    /// `min(base * 2^(attempt-1), max_delay)`, so attempt 1 waits exactly `base`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        2u32.checked_pow(attempt - 1)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Run `attempt_fn` until it succeeds, fails for good, or runs out of retries.
///
/// `attempt_fn` gets the attempt index and must resend the same buffered body
/// each time. Both the backoff wait and the attempt itself are raced against
/// the context; on cancellation the in-flight attempt is dropped and a
/// `timeout` error is returned. Non-retryable errors end the loop at once;
/// running out of retries yields [`EmbeddingsError::RetriesExhausted`].
pub async fn execute_with_retry<F, Fut>(
    policy: &RetryPolicy,
    ctx: &RequestContext,
    url: &str,
    mut attempt_fn: F,
) -> EmbeddingsResult<Bytes>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Bytes, TeiError>>,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            debug!(
                request_id = ctx.request_id(),
                url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying request"
            );

            tokio::select! {
                biased;
                err = ctx.cancelled() => {
                    warn!(request_id = ctx.request_id(), url, attempt, "Cancelled during backoff");
                    return Err(err.into());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let outcome = tokio::select! {
            biased;
            err = ctx.cancelled() => {
                warn!(request_id = ctx.request_id(), url, attempt, "Cancelled in flight");
                return Err(err.into());
            }
            outcome = attempt_fn(attempt) => outcome,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;

        let err = match outcome {
            Ok(body) => {
                debug!(
                    request_id = ctx.request_id(),
                    url,
                    attempts = attempt + 1,
                    elapsed_ms,
                    response_size = body.len(),
                    "Request completed"
                );
                return Ok(body);
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            warn!(
                request_id = ctx.request_id(),
                url,
                attempt,
                elapsed_ms,
                kind = %err.kind(),
                code = err.code(),
                error = %err.message(),
                "Request failed with non-retryable error"
            );
            return Err(err.into());
        }

        if attempt >= policy.max_retries {
            error!(
                request_id = ctx.request_id(),
                url,
                max_retries = policy.max_retries,
                elapsed_ms,
                kind = %err.kind(),
                error = %err.message(),
                "Request failed after all retries"
            );
            return Err(EmbeddingsError::RetriesExhausted {
                attempts: attempt + 1,
                source: err,
            });
        }

        warn!(
            request_id = ctx.request_id(),
            url,
            attempt,
            elapsed_ms,
            kind = %err.kind(),
            code = err.code(),
            error = %err.message(),
            "Request failed, will retry"
        );
        attempt += 1;
    }
}
