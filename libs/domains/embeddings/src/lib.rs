//! Embeddings Domain Library
//!
//! Validated, retrying access to a Text Embeddings Inference (TEI) backend.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │ EmbeddingsService │  ← defaults, validation, decode, shape check
//! └─────────┬─────────┘
//!           │
//! ┌─────────▼─────────┐     ┌─────────────────┐
//! │    TeiBackend     │     │    Validator    │
//! │      (trait)      │     │ (pure, config)  │
//! └─────────┬─────────┘     └─────────────────┘
//!           │
//! ┌─────────▼─────────┐
//! │   TeiHttpClient   │  ← pooled reqwest client, backoff retries,
//! │ (implementation)  │    error classification
//! └───────────────────┘
//! ```
//!
//! # Features
//!
//! - **Operations**: embed, embed_all, embed_sparse, similarity
//! - **Helpers**: single-text embedding, pairwise similarity, top-k ranking
//! - **Error taxonomy**: every failure carries an [`ErrorKind`] that maps onto a gRPC code
//! - **Retries**: exponential backoff capped at 30s, aborted by cancellation or deadline
//!
//! # Usage
//!
//! ```rust,no_run
//! use core_config::FromEnv;
//! use domain_embeddings::{
//!     EmbedRequest, EmbeddingsService, RequestContext, TeiConfig, TeiHttpClient,
//!     ValidationConfig, Validator,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TeiHttpClient::new(&TeiConfig::from_env()?)?;
//! let service = EmbeddingsService::new(client, Validator::new(ValidationConfig::from_env()?));
//!
//! let ctx = RequestContext::new();
//! let embeddings = service.embed(&ctx, EmbedRequest::new("hello world")).await?;
//! assert_eq!(embeddings.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod conversions;
pub mod error;
pub mod models;
pub mod service;
pub mod transport;
pub mod validation;

// Re-export commonly used types
pub use config::TeiConfig;
pub use context::RequestContext;
pub use error::{
    EmbeddingsError, EmbeddingsResult, ErrorKind, MultiValidationError, TeiError, ValidationError,
};
pub use models::{
    EmbedAllRequest, EmbedOptions, EmbedRequest, EmbedSparseRequest, Embeddings, Inputs,
    MostSimilar, SimilarSentence, SimilarityRequest, SparseEmbeddings, SparseValue,
    TokenEmbeddings, TruncationDirection,
};
pub use service::EmbeddingsService;
pub use transport::{RetryPolicy, TeiBackend, TeiHttpClient};
pub use validation::{ValidationConfig, Validator};
