//! # gRPC Library
//!
//! Shared gRPC plumbing for the workspace services: server configuration and
//! health reporting, request correlation via `x-request-id`, `grpc-timeout`
//! parsing, and tuned client channels.
//!
//! ## Serving
//! ```ignore
//! use grpc_client::server::{GrpcServer, ServerConfig};
//! use grpc_client::RequestIdInterceptor;
//! use core_config::FromEnv;
//!
//! let config = ServerConfig::from_env()?;
//! let (health_reporter, health_service) = grpc_client::server::create_health_service();
//! GrpcServer::setup_health(&health_reporter, SERVICE_NAME).await;
//! GrpcServer::log_startup(&config, SERVICE_NAME);
//! ```
//!
//! ## Connecting
//! ```ignore
//! use grpc_client::{create_channel_with_config, ChannelConfig, RequestIdInterceptor};
//!
//! let channel = create_channel_with_config("http://127.0.0.1:9090", ChannelConfig::default()).await?;
//! let client = TextEmbeddingsServiceClient::with_interceptor(channel, RequestIdInterceptor::new());
//! ```

pub mod channel;
pub mod error;
pub mod interceptors;
pub mod metadata;
pub mod server;

pub use channel::{ChannelConfig, create_channel, create_channel_with_config};
pub use error::{GrpcError, GrpcResult};
pub use interceptors::RequestIdInterceptor;
pub use metadata::{REQUEST_ID_HEADER, grpc_timeout, request_id};
