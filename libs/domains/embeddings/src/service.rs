//! Embeddings Service - Business logic layer

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use crate::context::RequestContext;
use crate::error::{EmbeddingsResult, ErrorKind, TeiError, ValidationError};
use crate::models::{
    BackendPayload, ENDPOINT_EMBED, ENDPOINT_EMBED_ALL, ENDPOINT_EMBED_SPARSE,
    ENDPOINT_SIMILARITY, EmbedAllRequest, EmbedRequest, EmbedSparseRequest, Embeddings,
    MostSimilar, SimilarSentence, SimilarityRequest, SparseEmbeddings, TokenEmbeddings,
};
use crate::transport::TeiBackend;
use crate::validation::Validator;

/// Embeddings service providing the TEI operations
///
/// Every operation runs the same pipeline: fill defaults, validate, post to the
/// backend, decode, then check that the response has one entry per input.
pub struct EmbeddingsService<B: TeiBackend> {
    backend: B,
    validator: Validator,
}

impl<B: TeiBackend> EmbeddingsService<B> {
    pub fn new(backend: B, validator: Validator) -> Self {
        Self {
            backend,
            validator,
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    // ===== Backend Operations =====

    /// One dense vector per input, in input order.
    #[instrument(skip_all, fields(request_id = ctx.request_id(), inputs = request.inputs.len()))]
    pub async fn embed(
        &self,
        ctx: &RequestContext,
        mut request: EmbedRequest,
    ) -> EmbeddingsResult<Embeddings> {
        request.set_defaults();
        self.validator.validate_embed_request(&request)?;

        let embeddings: Embeddings = self.dispatch(ctx, ENDPOINT_EMBED, &request).await?;
        check_count(ctx, "embeddings", request.inputs.len(), embeddings.len())?;

        debug!(
            embeddings_count = embeddings.len(),
            dimension = embeddings.first().map(Vec::len).unwrap_or(0),
            "Embed request completed"
        );
        Ok(embeddings)
    }

    /// Per input, one vector per token.
    #[instrument(skip_all, fields(request_id = ctx.request_id(), inputs = request.inputs.len()))]
    pub async fn embed_all(
        &self,
        ctx: &RequestContext,
        mut request: EmbedAllRequest,
    ) -> EmbeddingsResult<TokenEmbeddings> {
        request.set_defaults();
        self.validator.validate_embed_all_request(&request)?;

        let embeddings: TokenEmbeddings = self.dispatch(ctx, ENDPOINT_EMBED_ALL, &request).await?;
        check_count(ctx, "token embeddings", request.inputs.len(), embeddings.len())?;

        debug!(
            embeddings_count = embeddings.len(),
            "Embed all request completed"
        );
        Ok(embeddings)
    }

    /// Per input, the non-zero `(index, value)` pairs.
    #[instrument(skip_all, fields(request_id = ctx.request_id(), inputs = request.inputs.len()))]
    pub async fn embed_sparse(
        &self,
        ctx: &RequestContext,
        mut request: EmbedSparseRequest,
    ) -> EmbeddingsResult<SparseEmbeddings> {
        request.set_defaults();
        self.validator.validate_embed_sparse_request(&request)?;

        let embeddings: SparseEmbeddings =
            self.dispatch(ctx, ENDPOINT_EMBED_SPARSE, &request).await?;
        check_count(ctx, "sparse embeddings", request.inputs.len(), embeddings.len())?;

        debug!(
            embeddings_count = embeddings.len(),
            "Embed sparse request completed"
        );
        Ok(embeddings)
    }

    /// One score per candidate sentence, in candidate order.
    #[instrument(
        skip_all,
        fields(request_id = ctx.request_id(), sentences = request.inputs.sentences.len())
    )]
    pub async fn similarity(
        &self,
        ctx: &RequestContext,
        mut request: SimilarityRequest,
    ) -> EmbeddingsResult<Vec<f32>> {
        request.set_defaults();
        self.validator.validate_similarity_request(&request)?;

        let similarities: Vec<f32> = self.dispatch(ctx, ENDPOINT_SIMILARITY, &request).await?;
        check_count(
            ctx,
            "similarity",
            request.inputs.sentences.len(),
            similarities.len(),
        )?;

        debug!(
            similarities_count = similarities.len(),
            avg_similarity = average(&similarities),
            "Similarity request completed"
        );
        Ok(similarities)
    }

    // ===== Convenience Operations =====

    /// Embed a single text.
    pub async fn embed_text(
        &self,
        ctx: &RequestContext,
        text: &str,
        normalize: bool,
    ) -> EmbeddingsResult<Vec<f32>> {
        let request = EmbedRequest::new(text).with_normalize(normalize);
        let mut embeddings = self.embed(ctx, request).await?;
        // count already checked, so exactly one vector is present
        Ok(embeddings.swap_remove(0))
    }

    pub async fn embed_texts(
        &self,
        ctx: &RequestContext,
        texts: Vec<String>,
        normalize: bool,
    ) -> EmbeddingsResult<Embeddings> {
        let request = EmbedRequest::new(texts).with_normalize(normalize);
        self.embed(ctx, request).await
    }

    /// Scores of `targets` against `source` with default parameters.
    pub async fn similarity_scores(
        &self,
        ctx: &RequestContext,
        source: &str,
        targets: Vec<String>,
    ) -> EmbeddingsResult<Vec<f32>> {
        self.similarity(ctx, SimilarityRequest::new(source, targets))
            .await
    }

    /// Row `i` holds the scores of every sentence in `right` against `left[i]`.
    ///
    /// Rows are computed one after another; the first failing row ends the call.
    #[instrument(skip_all, fields(request_id = ctx.request_id(), rows = left.len(), columns = right.len()))]
    pub async fn pairwise_similarity(
        &self,
        ctx: &RequestContext,
        left: &[String],
        right: &[String],
    ) -> EmbeddingsResult<Vec<Vec<f32>>> {
        if left.is_empty() || right.is_empty() {
            return Err(
                ValidationError::new("sentences", "both sentence arrays must be non-empty").into(),
            );
        }

        let mut rows = Vec::with_capacity(left.len());
        for (index, source) in left.iter().enumerate() {
            let row = self
                .similarity_scores(ctx, source, right.to_vec())
                .await
                .map_err(|e| {
                    error!(row = index, error = %e, "Pairwise similarity calculation failed");
                    e.at_row(index)
                })?;
            rows.push(row);
        }

        debug!("Pairwise similarity completed");
        Ok(rows)
    }

    /// The `top_k` candidates closest to `source`, best first.
    ///
    /// `top_k` larger than the candidate list is clamped.
    pub async fn find_most_similar(
        &self,
        ctx: &RequestContext,
        source: &str,
        candidates: Vec<String>,
        top_k: usize,
    ) -> EmbeddingsResult<MostSimilar> {
        if top_k == 0 {
            return Err(ValidationError::new("top_k", "must be positive")
                .with_value(top_k)
                .into());
        }
        let top_k = top_k.min(candidates.len());

        let scores = self
            .similarity_scores(ctx, source, candidates.clone())
            .await?;

        let mut ranked: Vec<SimilarSentence> = candidates
            .into_iter()
            .zip(scores)
            .enumerate()
            .map(|(index, (sentence, similarity))| SimilarSentence {
                index,
                sentence,
                similarity,
            })
            .collect();
        ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        ranked.truncate(top_k);

        Ok(MostSimilar {
            source_sentence: source.to_string(),
            top_matches: ranked,
        })
    }

    // ===== Internals =====

    async fn dispatch<Req, Resp>(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        request: &Req,
    ) -> EmbeddingsResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request).map_err(|e| {
            TeiError::new(ErrorKind::Unknown, format!("failed to encode request: {}", e))
                .with_request_id(ctx.request_id())
        })?;

        let raw = self.backend.post(ctx, endpoint, Bytes::from(body)).await?;

        serde_json::from_slice::<BackendPayload<Resp>>(&raw)
            .map(BackendPayload::into_inner)
            .map_err(|e| {
                error!(endpoint, error = %e, body_size = raw.len(), "Failed to parse response");
                TeiError::backend("failed to parse response")
                    .with_request_id(ctx.request_id())
                    .into()
            })
    }
}

fn check_count(
    ctx: &RequestContext,
    what: &str,
    expected: usize,
    actual: usize,
) -> Result<(), TeiError> {
    if expected == actual {
        return Ok(());
    }
    error!(expected, actual, what, "Response count mismatch");
    Err(TeiError::backend(format!("response {} count mismatch", what))
        .with_request_id(ctx.request_id()))
}

fn average(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbeddingsError, classify_http_status};
    use crate::models::{SparseValue, TruncationDirection};
    use crate::transport::MockTeiBackend;
    use crate::validation::ValidationConfig;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    fn service(mock: MockTeiBackend) -> EmbeddingsService<MockTeiBackend> {
        EmbeddingsService::new(mock, Validator::default())
    }

    fn reply(value: Value) -> EmbeddingsResult<Bytes> {
        Ok(Bytes::from(value.to_string()))
    }

    fn body_json(body: &Bytes) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    fn ctx() -> RequestContext {
        RequestContext::new().with_request_id("req-test")
    }

    // ==================== embed ====================

    #[tokio::test]
    async fn test_embed_applies_defaults_and_returns_vectors() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().times(1).returning(|_, endpoint, body| {
            assert_eq!(endpoint, "/embed");
            assert_eq!(
                body_json(&body),
                json!({
                    "inputs": "hello",
                    "normalize": true,
                    "truncate": false,
                    "truncation_direction": "Right",
                })
            );
            reply(json!([[0.1, 0.2, 0.3, 0.4]]))
        });

        let embeddings = service(mock)
            .embed(&ctx(), EmbedRequest::new("hello"))
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![0.1, 0.2, 0.3, 0.4]]);
    }

    #[tokio::test]
    async fn test_embed_keeps_explicit_options() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().times(1).returning(|_, _, body| {
            let body = body_json(&body);
            assert_eq!(body["normalize"], false);
            assert_eq!(body["truncate"], true);
            assert_eq!(body["truncation_direction"], "Left");
            assert_eq!(body["prompt_name"], "query");
            assert_eq!(body["inputs"], json!(["a", "b"]));
            reply(json!([[1.0], [2.0]]))
        });

        let mut request =
            EmbedRequest::new(vec!["a".to_string(), "b".to_string()]).with_normalize(false);
        request.options.truncate = Some(true);
        request.options.truncation_direction = Some(TruncationDirection::Left);
        request.options.prompt_name = Some("query".into());

        let embeddings = service(mock).embed(&ctx(), request).await.unwrap();
        assert_eq!(embeddings.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_backend() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().never();

        let request = EmbedRequest::new(vec!["ok".to_string(), "   ".to_string()]);
        let err = service(mock).embed(&ctx(), request).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        match err {
            EmbeddingsError::InvalidRequest(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors.errors()[0].field, "inputs[1]");
            }
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_embed_batch_limit_uses_config() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().never();

        let validator = Validator::new(ValidationConfig {
            max_batch_size: 2,
            ..ValidationConfig::default()
        });
        let service = EmbeddingsService::new(mock, validator);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let err = service.embed(&ctx(), EmbedRequest::new(texts)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_embed_count_mismatch_is_backend_error() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post()
            .returning(|_, _, _| reply(json!([[0.1], [0.2]])));

        let err = service(mock)
            .embed(&ctx(), EmbedRequest::new("one"))
            .await
            .unwrap_err();

        let tei = err.tei_error().unwrap();
        assert_eq!(tei.kind(), ErrorKind::Backend);
        assert_eq!(tei.message(), "response embeddings count mismatch");
        assert_eq!(tei.request_id(), Some("req-test"));
    }

    #[tokio::test]
    async fn test_unparsable_response_is_backend_error() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post()
            .returning(|_, _, _| Ok(Bytes::from_static(b"<html>oops</html>")));

        let err = service(mock)
            .embed(&ctx(), EmbedRequest::new("x"))
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingsError::Tei(_)));
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.tei_error().unwrap().message(), "failed to parse response");
    }

    #[tokio::test]
    async fn test_transport_errors_pass_through_unchanged() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().returning(|_, _, _| {
            Err(EmbeddingsError::RetriesExhausted {
                attempts: 4,
                source: classify_http_status(429, "queue full"),
            })
        });

        let err = service(mock)
            .embed(&ctx(), EmbedRequest::new("x"))
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingsError::RetriesExhausted { attempts: 4, .. }));
        assert_eq!(err.kind(), ErrorKind::Overloaded);
    }

    #[tokio::test]
    async fn test_wrapped_embeddings_response_is_accepted() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post()
            .returning(|_, _, _| reply(json!({ "embeddings": [[0.5, 0.5]] })));

        let embeddings = service(mock)
            .embed(&ctx(), EmbedRequest::new("x"))
            .await
            .unwrap();
        assert_eq!(embeddings, vec![vec![0.5, 0.5]]);
    }

    // ==================== embed_all / embed_sparse ====================

    #[tokio::test]
    async fn test_embed_all_returns_token_vectors() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().times(1).returning(|_, endpoint, body| {
            assert_eq!(endpoint, "/embed_all");
            let body = body_json(&body);
            assert!(body.get("normalize").is_none());
            assert_eq!(body["truncate"], false);
            reply(json!([[[0.1, 0.2], [0.3, 0.4]]]))
        });

        let tokens = service(mock)
            .embed_all(&ctx(), EmbedAllRequest::new("two tokens"))
            .await
            .unwrap();
        assert_eq!(tokens, vec![vec![vec![0.1, 0.2], vec![0.3, 0.4]]]);
    }

    #[tokio::test]
    async fn test_embed_sparse_returns_pairs() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().times(1).returning(|_, endpoint, _| {
            assert_eq!(endpoint, "/embed_sparse");
            reply(json!([
                [{ "index": 12, "value": 0.5 }],
                [{ "index": 3, "value": 0.25 }, { "index": 99, "value": 1.0 }],
            ]))
        });

        let sparse = service(mock)
            .embed_sparse(
                &ctx(),
                EmbedSparseRequest::new(vec!["a".to_string(), "b".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(sparse.len(), 2);
        assert_eq!(sparse[1][1], SparseValue { index: 99, value: 1.0 });
    }

    #[tokio::test]
    async fn test_embed_sparse_count_mismatch() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().returning(|_, _, _| reply(json!([])));

        let err = service(mock)
            .embed_sparse(&ctx(), EmbedSparseRequest::new("a"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(
            err.tei_error().unwrap().message(),
            "response sparse embeddings count mismatch"
        );
    }

    // ==================== similarity ====================

    #[tokio::test]
    async fn test_similarity_wire_format_and_scores() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().times(1).returning(|_, endpoint, body| {
            assert_eq!(endpoint, "/similarity");
            assert_eq!(
                body_json(&body),
                json!({
                    "inputs": { "source_sentence": "cat", "sentences": ["kitten", "car"] },
                    "parameters": { "truncate": false, "truncation_direction": "Right" },
                })
            );
            reply(json!({ "similarities": [0.92, 0.13] }))
        });

        let scores = service(mock)
            .similarity(
                &ctx(),
                SimilarityRequest::new("cat", vec!["kitten".into(), "car".into()]),
            )
            .await
            .unwrap();
        assert_eq!(scores, vec![0.92, 0.13]);
    }

    #[tokio::test]
    async fn test_similarity_count_mismatch() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().returning(|_, _, _| reply(json!([0.9])));

        let err = service(mock)
            .similarity(&ctx(), SimilarityRequest::new("s", vec!["a".into(), "b".into()]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(
            err.tei_error().unwrap().message(),
            "response similarity count mismatch"
        );
    }

    #[tokio::test]
    async fn test_similarity_requires_sentences() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().never();

        let err = service(mock)
            .similarity(&ctx(), SimilarityRequest::new("s", vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    // ==================== convenience ====================

    #[tokio::test]
    async fn test_embed_text_returns_single_vector() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().times(1).returning(|_, _, body| {
            let body = body_json(&body);
            assert_eq!(body["inputs"], "solo");
            assert_eq!(body["normalize"], false);
            reply(json!([[0.7, 0.1]]))
        });

        let vector = service(mock)
            .embed_text(&ctx(), "solo", false)
            .await
            .unwrap();
        assert_eq!(vector, vec![0.7, 0.1]);
    }

    #[tokio::test]
    async fn test_embed_texts_preserves_order() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post()
            .returning(|_, _, _| reply(json!([[1.0], [2.0], [3.0]])));

        let vectors = service(mock)
            .embed_texts(&ctx(), vec!["a".into(), "b".into(), "c".into()], true)
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0], vec![3.0]]);
    }

    #[tokio::test]
    async fn test_pairwise_similarity_one_call_per_row() {
        let sources = Arc::new(Mutex::new(Vec::new()));
        let seen = sources.clone();

        let mut mock = MockTeiBackend::new();
        mock.expect_post().times(2).returning(move |_, _, body| {
            let body = body_json(&body);
            let source = body["inputs"]["source_sentence"].as_str().unwrap().to_string();
            let score = if source == "a" { 0.1 } else { 0.2 };
            seen.lock().unwrap().push(source);
            reply(json!([score, score, score]))
        });

        let left = vec!["a".to_string(), "b".to_string()];
        let right = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        let matrix = service(mock)
            .pairwise_similarity(&ctx(), &left, &right)
            .await
            .unwrap();

        assert_eq!(matrix, vec![vec![0.1; 3], vec![0.2; 3]]);
        assert_eq!(*sources.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_pairwise_similarity_rejects_empty_side() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().never();
        let service = service(mock);

        let err = service
            .pairwise_similarity(&ctx(), &[], &["x".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = service
            .pairwise_similarity(&ctx(), &["x".to_string()], &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_pairwise_similarity_stops_at_first_failure() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = calls.clone();

        let mut mock = MockTeiBackend::new();
        mock.expect_post().times(2).returning(move |_, _, _| {
            let mut calls = counter.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                reply(json!([0.5]))
            } else {
                Err(classify_http_status(422, "too long").into())
            }
        });

        let err = service(mock)
            .pairwise_similarity(&ctx(), &["a".into(), "b".into(), "c".into()], &["x".into()])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Tokenizer);
        assert!(matches!(err, EmbeddingsError::PairwiseRow { index: 1, .. }));
        assert_eq!(err.tei_error().unwrap().code(), Some(422));
        assert_eq!(
            err.to_string(),
            "pairwise similarity failed at index 1: TEI error [tokenizer]: too long"
        );
        assert_eq!(*calls.lock().unwrap(), 2);

        let status = tonic::Status::from(err);
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert_eq!(
            status.message(),
            "[tokenizer] too long (pairwise similarity failed at index 1)"
        );
    }

    #[tokio::test]
    async fn test_find_most_similar_ranks_and_clamps() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post()
            .returning(|_, _, _| reply(json!([0.2, 0.9, 0.5])));

        let candidates = vec!["low".to_string(), "high".to_string(), "mid".to_string()];
        let result = service(mock)
            .find_most_similar(&ctx(), "query", candidates, 10)
            .await
            .unwrap();

        assert_eq!(result.source_sentence, "query");
        let ranked: Vec<(usize, &str)> = result
            .top_matches
            .iter()
            .map(|m| (m.index, m.sentence.as_str()))
            .collect();
        assert_eq!(ranked, vec![(1, "high"), (2, "mid"), (0, "low")]);
    }

    #[tokio::test]
    async fn test_find_most_similar_truncates_to_top_k() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post()
            .returning(|_, _, _| reply(json!([0.2, 0.9, 0.5])));

        let result = service(mock)
            .find_most_similar(&ctx(), "q", vec!["a".into(), "b".into(), "c".into()], 1)
            .await
            .unwrap();

        assert_eq!(result.top_matches.len(), 1);
        assert_eq!(result.top_matches[0].sentence, "b");
        assert_eq!(result.top_matches[0].similarity, 0.9);
    }

    #[tokio::test]
    async fn test_find_most_similar_rejects_zero_top_k() {
        let mut mock = MockTeiBackend::new();
        mock.expect_post().never();

        let err = service(mock)
            .find_most_similar(&ctx(), "q", vec!["a".into()], 0)
            .await
            .unwrap_err();

        match err {
            EmbeddingsError::Validation(v) => {
                assert_eq!(v.field, "top_k");
                assert_eq!(v.value, Some(json!(0)));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[0.5, 1.0]), 0.75);
    }
}
