//! Generated protobuf and gRPC bindings.
//!
//! Sources live under `proto/`. The files in `src/generated/` are checked in
//! and regenerated with `buf generate` whenever a `.proto` changes.

#[allow(clippy::all)]
pub mod embeddings {
    include!("generated/embeddings/v1/embeddings.v1.rs");
}
