pub mod config;

pub use config::ChannelConfig;

use crate::error::{GrpcError, GrpcResult};
use tonic::transport::{Channel, Endpoint};

/// Creates a gRPC channel with the default HTTP/2 tuning.
///
/// ## Configuration Details
/// - HTTP/2 keep-alive: 30s interval, 10s timeout
/// - Connection timeout: 5s
/// - Request timeout: 30s
/// - Window sizes: 1MB for connection and stream
/// - TCP nodelay and keepalive enabled
///
/// ## Example
/// ```ignore
/// use grpc_client::create_channel;
/// use rpc::embeddings::text_embeddings_service_client::TextEmbeddingsServiceClient;
///
/// let channel = create_channel("http://127.0.0.1:9090").await?;
/// let client = TextEmbeddingsServiceClient::new(channel);
/// ```
pub async fn create_channel(addr: impl Into<String>) -> GrpcResult<Channel> {
  create_channel_with_config(addr, ChannelConfig::default()).await
}

/// Creates a gRPC channel with custom configuration
pub async fn create_channel_with_config(
  addr: impl Into<String>,
  config: ChannelConfig,
) -> GrpcResult<Channel> {
  let addr_string = addr.into();

  let endpoint = Endpoint::from_shared(addr_string.clone()).map_err(|e| {
    tracing::error!(addr = %addr_string, error = ?e, "Invalid URI");
    GrpcError::InvalidUri(e)
  })?;

  let endpoint = config.apply_to_endpoint(endpoint);

  tracing::debug!(addr = %addr_string, "Creating gRPC channel");

  endpoint.connect().await.map_err(|e| {
    tracing::error!(
      addr = %addr_string,
      error = ?e,
      "Failed to connect to gRPC service"
    );
    GrpcError::ConnectionFailed(e)
  })
}
