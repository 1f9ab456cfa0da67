//! Server configuration loaded from environment variables.

use std::net::SocketAddr;

use core_config::{ConfigError, FromEnv, env_or_default, env_parse};

use crate::error::{GrpcError, GrpcResult};

/// Default message ceiling for both directions (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Configuration for gRPC server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Port to listen on (default: 9090)
    pub port: u16,
    /// Accept and send Zstd compressed messages (default: true)
    pub enable_compression: bool,
    /// Maximum message size for decoding (default: 16MB)
    pub max_decoding_message_size: usize,
    /// Maximum message size for encoding (default: 16MB)
    pub max_encoding_message_size: usize,
    /// TCP keepalive interval in seconds (default: 60)
    pub keepalive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
            enable_compression: true,
            max_decoding_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_encoding_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            keepalive_secs: 60,
        }
    }
}

impl FromEnv for ServerConfig {
    /// Reads:
    /// - `GRPC_HOST` (default: 0.0.0.0)
    /// - `GRPC_PORT` (default: 9090)
    /// - `GRPC_COMPRESSION` (default: true; "false" or "0" disables)
    /// - `GRPC_MAX_MESSAGE_SIZE` (default: 16777216 / 16MB)
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let enable_compression = std::env::var("GRPC_COMPRESSION")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(defaults.enable_compression);
        let max_message_size = env_parse("GRPC_MAX_MESSAGE_SIZE", DEFAULT_MAX_MESSAGE_SIZE)?;
        if max_message_size == 0 {
            return Err(ConfigError::Invalid(
                "GRPC_MAX_MESSAGE_SIZE must be positive".to_string(),
            ));
        }

        Ok(Self {
            host: env_or_default("GRPC_HOST", &defaults.host),
            port: env_parse("GRPC_PORT", defaults.port)?,
            enable_compression,
            max_decoding_message_size: max_message_size,
            max_encoding_message_size: max_message_size,
            keepalive_secs: defaults.keepalive_secs,
        })
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_compression(mut self, enable: bool) -> Self {
        self.enable_compression = enable;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_decoding_message_size = size;
        self.max_encoding_message_size = size;
        self
    }

    /// Get the socket address to bind to.
    pub fn socket_addr(&self) -> GrpcResult<SocketAddr> {
        self.addr_string()
            .parse()
            .map_err(|e| GrpcError::InvalidConfig(format!("bad listen address {}: {}", self.addr_string(), e)))
    }

    /// Get the address string (for logging).
    pub fn addr_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
