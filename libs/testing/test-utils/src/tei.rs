//! TEI container test infrastructure
//!
//! Provides a `TestTei` helper that runs the real text-embeddings-inference
//! image. The image is large and downloads its model on first start, so tests
//! using it should be `#[ignore]`d by default.

use std::time::Duration;

use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

const TEI_IMAGE: &str = "ghcr.io/huggingface/text-embeddings-inference";
const TEI_TAG: &str = "cpu-1.8";
const TEI_PORT: u16 = 80;

/// Small model that loads quickly on CPU.
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Test TEI wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::TestTei;
///
/// # async fn example() {
/// let tei = TestTei::new().await;
/// let base_url = tei.url.clone();
/// // point a TEI client at `base_url`
/// # }
/// ```
pub struct TestTei {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    pub url: String,
}

impl TestTei {
    /// Start TEI serving [`DEFAULT_MODEL`].
    pub async fn new() -> Self {
        Self::with_model(DEFAULT_MODEL).await
    }

    pub async fn with_model(model_id: &str) -> Self {
        let container = GenericImage::new(TEI_IMAGE, TEI_TAG)
            .with_exposed_port(TEI_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready"))
            .with_cmd(["--model-id", model_id, "--port", "80"])
            .with_startup_timeout(Duration::from_secs(300))
            .start()
            .await
            .expect("Failed to start TEI container");

        let host_port = container
            .get_host_port_ipv4(TEI_PORT)
            .await
            .expect("Failed to get TEI port");

        let url = format!("http://127.0.0.1:{}", host_port);

        tracing::info!(port = host_port, model_id, "Test TEI ready");

        Self { container, url }
    }
}
