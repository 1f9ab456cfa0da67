mod client;
mod retry;

pub use client::TeiHttpClient;
pub use retry::{MAX_BACKOFF, RetryPolicy, execute_with_retry};

use async_trait::async_trait;
use bytes::Bytes;

use crate::context::RequestContext;
use crate::error::EmbeddingsResult;

/// The seam between domain operations and the wire.
///
/// `post` sends an already-encoded JSON body to `endpoint` and returns the raw
/// 2xx body; retries and error classification happen behind it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TeiBackend: Send + Sync {
    async fn post(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        body: Bytes,
    ) -> EmbeddingsResult<Bytes>;
}
