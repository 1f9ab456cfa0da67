//! Embeddings gRPC service implementation
//!
//! This module contains the EmbeddingsServiceImpl struct and its gRPC trait implementation.
//! Handlers leverage the TryFrom conversions defined in domain_embeddings::conversions.

use std::time::Duration;

use domain_embeddings::conversions::{
    embed_all_response, embed_response, embed_sparse_response, similarity_response,
};
use domain_embeddings::{
    EmbedAllRequest, EmbedRequest, EmbedSparseRequest, EmbeddingsError, EmbeddingsService,
    RequestContext, SimilarityRequest, TeiBackend, ValidationError,
};
use grpc_client::{REQUEST_ID_HEADER, grpc_timeout, request_id};
use rpc::embeddings::{
    EmbedAllRequest as ProtoEmbedAllRequest, EmbedAllResponse,
    EmbedRequest as ProtoEmbedRequest, EmbedResponse,
    EmbedSparseRequest as ProtoEmbedSparseRequest, EmbedSparseResponse,
    SimilarityRequest as ProtoSimilarityRequest, SimilarityResponse,
    text_embeddings_service_server::TextEmbeddingsService,
};
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

/// gRPC service implementation for TEI operations
///
/// Wraps the domain EmbeddingsService and handles proto ↔ domain conversions.
/// Generic over the backend type for testability.
pub struct EmbeddingsServiceImpl<B>
where
    B: TeiBackend + 'static,
{
    service: EmbeddingsService<B>,
}

impl<B> EmbeddingsServiceImpl<B>
where
    B: TeiBackend + 'static,
{
    pub fn new(service: EmbeddingsService<B>) -> Self {
        Self { service }
    }
}

// Headroom kept between the domain deadline and tonic's own `grpc-timeout`
// timer, which starts before the handler and answers `Cancelled`.
const MIN_DEADLINE_MARGIN: Duration = Duration::from_millis(1);
const MAX_DEADLINE_MARGIN: Duration = Duration::from_millis(100);

/// Builds the per-call context from `x-request-id` and `grpc-timeout`.
///
/// The deadline expires slightly before the caller's so an abandoned TEI call
/// reaches the caller as `DeadlineExceeded` with the request id attached.
fn request_context<T>(request: &Request<T>) -> RequestContext {
    let mut ctx = RequestContext::new();
    if let Some(id) = request_id(request.metadata()) {
        ctx = ctx.with_request_id(id);
    }
    if let Some(timeout) = grpc_timeout(request.metadata()) {
        ctx = ctx.with_timeout(local_budget(timeout));
    }
    ctx
}

/// A fifth of the caller's timeout is reserved, bounded by the margins above.
fn local_budget(timeout: Duration) -> Duration {
    let margin = (timeout / 5).clamp(MIN_DEADLINE_MARGIN, MAX_DEADLINE_MARGIN);
    timeout.saturating_sub(margin)
}

fn invalid_request(ctx: &RequestContext, rpc: &str, err: ValidationError) -> Status {
    failure(ctx, rpc, EmbeddingsError::from(err))
}

fn failure(ctx: &RequestContext, rpc: &str, err: EmbeddingsError) -> Status {
    warn!(
        request_id = ctx.request_id(),
        rpc,
        kind = %err.kind(),
        error = %err,
        "Request failed"
    );
    Status::from(err)
}

/// Wraps `message`, echoing the request id back to the caller.
fn respond<T>(ctx: &RequestContext, message: T) -> Response<T> {
    let mut response = Response::new(message);
    if let Ok(value) = ctx.request_id().parse() {
        response.metadata_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[tonic::async_trait]
impl<B> TextEmbeddingsService for EmbeddingsServiceImpl<B>
where
    B: TeiBackend + 'static,
{
    async fn embed(
        &self,
        request: Request<ProtoEmbedRequest>,
    ) -> Result<Response<EmbedResponse>, Status> {
        let ctx = request_context(&request);
        let req = EmbedRequest::try_from(request.into_inner())
            .map_err(|e| invalid_request(&ctx, "Embed", e))?;

        let embeddings = self
            .service
            .embed(&ctx, req)
            .await
            .map_err(|e| failure(&ctx, "Embed", e))?;

        debug!(request_id = ctx.request_id(), count = embeddings.len(), "Embed served");
        Ok(respond(&ctx, embed_response(embeddings)))
    }

    async fn embed_all(
        &self,
        request: Request<ProtoEmbedAllRequest>,
    ) -> Result<Response<EmbedAllResponse>, Status> {
        let ctx = request_context(&request);
        let req = EmbedAllRequest::try_from(request.into_inner())
            .map_err(|e| invalid_request(&ctx, "EmbedAll", e))?;

        let token_embeddings = self
            .service
            .embed_all(&ctx, req)
            .await
            .map_err(|e| failure(&ctx, "EmbedAll", e))?;

        Ok(respond(&ctx, embed_all_response(token_embeddings)))
    }

    async fn embed_sparse(
        &self,
        request: Request<ProtoEmbedSparseRequest>,
    ) -> Result<Response<EmbedSparseResponse>, Status> {
        let ctx = request_context(&request);
        let req = EmbedSparseRequest::try_from(request.into_inner())
            .map_err(|e| invalid_request(&ctx, "EmbedSparse", e))?;

        let sparse_embeddings = self
            .service
            .embed_sparse(&ctx, req)
            .await
            .map_err(|e| failure(&ctx, "EmbedSparse", e))?;

        Ok(respond(&ctx, embed_sparse_response(sparse_embeddings)))
    }

    async fn calculate_similarity(
        &self,
        request: Request<ProtoSimilarityRequest>,
    ) -> Result<Response<SimilarityResponse>, Status> {
        let ctx = request_context(&request);
        let req = SimilarityRequest::try_from(request.into_inner())
            .map_err(|e| invalid_request(&ctx, "CalculateSimilarity", e))?;

        let similarities = self
            .service
            .similarity(&ctx, req)
            .await
            .map_err(|e| failure(&ctx, "CalculateSimilarity", e))?;

        Ok(respond(&ctx, similarity_response(similarities)))
    }
}
