//! Shared test utilities for the embeddings gateway
//!
//! This crate provides reusable test infrastructure:
//! - `TestTeiBackend`: scripted TEI HTTP server on a local port (always available)
//! - `TestTei`: real TEI container with automatic cleanup (feature: "tei")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `tei`: Enables the testcontainers-backed TEI instance
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestDataBuilder, TestTeiBackend};
//!
//! #[tokio::test]
//! async fn my_embed_test() {
//!     let backend = TestTeiBackend::start().await;
//!     let builder = TestDataBuilder::from_test_name("my_embed_test");
//!
//!     let vectors = builder.vectors(2, 4);
//!     backend.respond("/embed", 200, serde_json::to_string(&vectors).unwrap());
//! }
//! ```

mod tei_backend;

#[cfg(feature = "tei")]
mod tei;

pub use tei_backend::{CapturedRequest, ScriptedResponse, TestTeiBackend};

#[cfg(feature = "tei")]
pub use tei::{DEFAULT_MODEL, TestTei};

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_embed_batch");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// A sentence unique to this builder and `index`.
    pub fn sentence(&self, index: usize) -> String {
        format!("test sentence {} for seed {}", index, self.seed)
    }

    pub fn sentences(&self, count: usize) -> Vec<String> {
        (0..count).map(|i| self.sentence(i)).collect()
    }

    /// A deterministic vector with components in `[-1, 1)`.
    pub fn vector(&self, index: usize, dim: usize) -> Vec<f32> {
        let mut state = (self.seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)) | 1;
        (0..dim)
            .map(|_| {
                // xorshift64
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
            })
            .collect()
    }

    pub fn vectors(&self, count: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..count).map(|i| self.vector(i, dim)).collect()
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert two floats are within `epsilon` of each other
    pub fn assert_close(actual: f32, expected: f32, epsilon: f32, context: &str) {
        assert!(
            (actual - expected).abs() <= epsilon,
            "{}: expected {} ± {}, got {}",
            context,
            expected,
            epsilon,
            actual
        );
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
