//! Embeddings gRPC Service
//!
//! A gateway exposing a Text Embeddings Inference (TEI) deployment over gRPC.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   ↓ (gRPC, optional Zstd compression, x-request-id)
//! EmbeddingsServiceImpl (service.rs)
//!   ↓ (proto ↔ domain conversions)
//! EmbeddingsService (domain layer)
//!   ↓ (defaults, validation, shape checks)
//! TeiHttpClient (retries with backoff)
//!   ↓ (JSON over HTTP)
//! TEI
//! ```
//!
//! ## Features
//!
//! - **Operations**: Embed, EmbedAll, EmbedSparse, CalculateSimilarity
//! - **Status mapping**: every failure carries a kind that maps onto a gRPC code
//! - **Health**: grpc.health.v1.Health, flipped to NOT_SERVING on shutdown
//! - **Deadlines**: `grpc-timeout` bounds retries and in-flight backend calls
//!
//! ## Modules
//!
//! - `server`: Server initialization and lifecycle
//! - `service`: gRPC service implementation (EmbeddingsServiceImpl)

pub mod server;
pub mod service;

// Re-export for convenience
pub use server::{run, serve};
pub use service::EmbeddingsServiceImpl;
