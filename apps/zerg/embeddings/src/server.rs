//! gRPC server initialization and lifecycle management
//!
//! This module handles all server setup:
//! - Tracing and error report initialization
//! - TEI client and validator configuration
//! - Service creation
//! - gRPC server configuration and startup
//! - Health check service (grpc.health.v1.Health)

use std::future::Future;
use std::time::Duration;

use core_config::FromEnv;
use core_config::tracing::{LogConfig, init_tracing, install_color_eyre};
use domain_embeddings::{
    EmbeddingsService, TeiBackend, TeiConfig, TeiHttpClient, ValidationConfig, Validator,
};
use eyre::{Result, WrapErr};
use grpc_client::RequestIdInterceptor;
use grpc_client::server::{GrpcServer, ServerConfig, create_health_service};
use rpc::embeddings::text_embeddings_service_server::{
    SERVICE_NAME, TextEmbeddingsServiceServer,
};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::codec::CompressionEncoding;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Server;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::EmbeddingsServiceImpl;

/// Run the gRPC server
///
/// This is the main entry point for server initialization. It:
/// 1. Installs color-eyre and structured logging (JSON for prod, pretty for dev)
/// 2. Loads TEI, validation and server configuration from the environment
/// 3. Creates the TEI client and the domain service
/// 4. Serves until SIGINT or SIGTERM
///
/// # Errors
///
/// Returns an error if:
/// - Any configuration is invalid
/// - The TEI client cannot be built
/// - Server binding fails
/// - Server runtime encounters an error
pub async fn run() -> Result<()> {
    install_color_eyre();

    let log_config = LogConfig::from_env().wrap_err("Failed to load logging configuration")?;
    init_tracing(&log_config);

    let tei_config = TeiConfig::from_env().wrap_err("Failed to load TEI configuration")?;
    let validation_config =
        ValidationConfig::from_env().wrap_err("Failed to load validation configuration")?;
    let server_config = ServerConfig::from_env().wrap_err("Failed to load server configuration")?;

    info!(
        base_url = %tei_config.base_url,
        timeout_secs = tei_config.timeout.as_secs(),
        max_retries = tei_config.max_retries,
        retry_delay_ms = tei_config.retry_delay.as_millis() as u64,
        max_connections = tei_config.max_connections,
        "TEI backend configured"
    );

    let client = TeiHttpClient::new(&tei_config).wrap_err("Failed to create TEI client")?;
    let service = EmbeddingsService::new(client, Validator::new(validation_config));

    let addr = server_config
        .socket_addr()
        .wrap_err("Failed to parse server address")?;
    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", addr))?;

    serve(listener, &server_config, service, GrpcServer::shutdown_signal()).await
}

/// Serve `service` on an already-bound listener until `signal` resolves.
///
/// Health reports SERVING once the server is set up and NOT_SERVING as soon
/// as shutdown begins; in-flight calls are then drained.
pub async fn serve<B, F>(
    listener: TcpListener,
    config: &ServerConfig,
    service: EmbeddingsService<B>,
    signal: F,
) -> Result<()>
where
    B: TeiBackend + 'static,
    F: Future<Output = ()>,
{
    let (health_reporter, health_service) = create_health_service();
    GrpcServer::setup_health(&health_reporter, SERVICE_NAME).await;
    GrpcServer::log_startup(config, SERVICE_NAME);

    let mut embeddings = TextEmbeddingsServiceServer::new(EmbeddingsServiceImpl::new(service))
        .max_decoding_message_size(config.max_decoding_message_size)
        .max_encoding_message_size(config.max_encoding_message_size);
    if config.enable_compression {
        embeddings = embeddings
            .accept_compressed(CompressionEncoding::Zstd)
            .send_compressed(CompressionEncoding::Zstd);
    }
    let embeddings = InterceptedService::new(embeddings, RequestIdInterceptor::new());

    let shutdown = async {
        signal.await;
        GrpcServer::mark_not_serving(&health_reporter, SERVICE_NAME).await;
        info!("Draining in-flight requests");
    };

    Server::builder()
        .http2_keepalive_interval(Some(Duration::from_secs(config.keepalive_secs)))
        .layer(TraceLayer::new_for_grpc())
        .add_service(health_service)
        .add_service(embeddings)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
        .wrap_err("gRPC server failed")?;

    info!("gRPC server stopped");
    Ok(())
}
