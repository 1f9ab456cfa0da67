//! Proto ↔ domain conversions
//!
//! Optional proto fields map to `None` when absent so that defaulting happens
//! in one place, the service layer.

use crate::error::ValidationError;
use crate::models::{
    EmbedAllRequest, EmbedOptions, EmbedRequest, EmbedSparseRequest, Embeddings, Inputs,
    SimilarityInputs, SimilarityRequest, SparseEmbeddings, SparseValue, TokenEmbeddings,
};
use crate::validation::Validator;

use rpc::embeddings::{
    EmbedAllRequest as ProtoEmbedAllRequest, EmbedAllResponse, EmbedRequest as ProtoEmbedRequest,
    EmbedResponse, EmbedSparseRequest as ProtoEmbedSparseRequest, EmbedSparseResponse, Embedding,
    SimilarityParameters, SimilarityRequest as ProtoSimilarityRequest, SimilarityResponse,
    SparseEmbedding, SparseValue as ProtoSparseValue,
    TokenEmbeddings as ProtoTokenEmbeddings,
};

fn options_from_proto(
    prompt_name: Option<String>,
    truncate: Option<bool>,
    truncation_direction: Option<i32>,
) -> Result<EmbedOptions, ValidationError> {
    Ok(EmbedOptions {
        prompt_name,
        truncate,
        truncation_direction: Validator::validate_truncation_direction(truncation_direction)?,
    })
}

// ===== Requests =====

impl TryFrom<ProtoEmbedRequest> for EmbedRequest {
    type Error = ValidationError;

    fn try_from(proto: ProtoEmbedRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            inputs: Inputs::new(proto.inputs),
            normalize: proto.normalize,
            options: options_from_proto(
                proto.prompt_name,
                proto.truncate,
                proto.truncation_direction,
            )?,
        })
    }
}

impl TryFrom<ProtoEmbedAllRequest> for EmbedAllRequest {
    type Error = ValidationError;

    fn try_from(proto: ProtoEmbedAllRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            inputs: Inputs::new(proto.inputs),
            options: options_from_proto(
                proto.prompt_name,
                proto.truncate,
                proto.truncation_direction,
            )?,
        })
    }
}

impl TryFrom<ProtoEmbedSparseRequest> for EmbedSparseRequest {
    type Error = ValidationError;

    fn try_from(proto: ProtoEmbedSparseRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            inputs: Inputs::new(proto.inputs),
            options: options_from_proto(
                proto.prompt_name,
                proto.truncate,
                proto.truncation_direction,
            )?,
        })
    }
}

impl TryFrom<ProtoSimilarityRequest> for SimilarityRequest {
    type Error = ValidationError;

    fn try_from(proto: ProtoSimilarityRequest) -> Result<Self, Self::Error> {
        let parameters = proto
            .parameters
            .map(|p: SimilarityParameters| {
                options_from_proto(p.prompt_name, p.truncate, p.truncation_direction)
            })
            .transpose()?;

        Ok(Self {
            inputs: SimilarityInputs {
                source_sentence: proto.source_sentence,
                sentences: proto.sentences,
            },
            parameters,
        })
    }
}

// ===== Responses =====

impl From<SparseValue> for ProtoSparseValue {
    fn from(value: SparseValue) -> Self {
        ProtoSparseValue {
            index: value.index,
            value: value.value,
        }
    }
}

pub fn embed_response(embeddings: Embeddings) -> EmbedResponse {
    EmbedResponse {
        embeddings: embeddings
            .into_iter()
            .map(|values| Embedding { values })
            .collect(),
    }
}

pub fn embed_all_response(token_embeddings: TokenEmbeddings) -> EmbedAllResponse {
    EmbedAllResponse {
        token_embeddings: token_embeddings
            .into_iter()
            .map(|tokens| ProtoTokenEmbeddings {
                embeddings: tokens
                    .into_iter()
                    .map(|values| Embedding { values })
                    .collect(),
            })
            .collect(),
    }
}

pub fn embed_sparse_response(sparse_embeddings: SparseEmbeddings) -> EmbedSparseResponse {
    EmbedSparseResponse {
        sparse_embeddings: sparse_embeddings
            .into_iter()
            .map(|values| SparseEmbedding {
                values: values.into_iter().map(Into::into).collect(),
            })
            .collect(),
    }
}

pub fn similarity_response(similarities: Vec<f32>) -> SimilarityResponse {
    SimilarityResponse { similarities }
}
