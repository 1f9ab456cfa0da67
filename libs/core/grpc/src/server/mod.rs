//! gRPC Server Builder
//!
//! Utilities for running gRPC servers with health checks, compression and
//! standard message limits.
//!
//! ```ignore
//! use core_config::FromEnv;
//! use grpc_client::server::{GrpcServer, ServerConfig, create_health_service};
//! use tonic::transport::Server;
//!
//! let config = ServerConfig::from_env()?;
//! let (health_reporter, health_service) = create_health_service();
//!
//! GrpcServer::setup_health(&health_reporter, SERVICE_NAME).await;
//! GrpcServer::log_startup(&config, SERVICE_NAME);
//!
//! Server::builder()
//!     .add_service(health_service)
//!     .add_service(my_service)
//!     .serve_with_shutdown(config.socket_addr()?, GrpcServer::shutdown_signal())
//!     .await?;
//! ```

mod builder;
mod config;

pub use builder::{GrpcServer, create_health_service};
pub use config::{DEFAULT_MAX_MESSAGE_SIZE, ServerConfig};
