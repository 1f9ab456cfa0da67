use std::time::Duration;
use tonic::transport::Endpoint;

/// HTTP/2 and TCP settings applied to outgoing gRPC channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
  pub connect_timeout: Duration,
  pub request_timeout: Option<Duration>,
  pub keep_alive_interval: Option<Duration>,
  pub keep_alive_timeout: Duration,
  pub window_size: Option<u32>,
  pub tcp_keepalive: Option<Duration>,
}

impl Default for ChannelConfig {
  fn default() -> Self {
    Self {
      connect_timeout: Duration::from_secs(5),
      request_timeout: Some(Duration::from_secs(30)),
      keep_alive_interval: Some(Duration::from_secs(30)),
      keep_alive_timeout: Duration::from_secs(10),
      window_size: Some(1024 * 1024),
      tcp_keepalive: Some(Duration::from_secs(30)),
    }
  }
}

impl ChannelConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
    self.connect_timeout = timeout;
    self
  }

  /// Per-RPC deadline; `None` leaves calls unbounded.
  pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.request_timeout = timeout;
    self
  }

  pub fn without_keep_alive(mut self) -> Self {
    self.keep_alive_interval = None;
    self
  }

  /// Set both connection and stream window sizes
  pub fn with_window_size(mut self, size: u32) -> Self {
    self.window_size = Some(size);
    self
  }

  pub(crate) fn apply_to_endpoint(self, mut endpoint: Endpoint) -> Endpoint {
    if let Some(interval) = self.keep_alive_interval {
      endpoint = endpoint
        .http2_keep_alive_interval(interval)
        .keep_alive_timeout(self.keep_alive_timeout)
        .keep_alive_while_idle(true);
    }

    endpoint = endpoint.connect_timeout(self.connect_timeout);
    if let Some(timeout) = self.request_timeout {
      endpoint = endpoint.timeout(timeout);
    }

    if let Some(size) = self.window_size {
      endpoint = endpoint
        .initial_connection_window_size(size)
        .initial_stream_window_size(size);
    }

    endpoint
      .http2_adaptive_window(true)
      .tcp_nodelay(true)
      .tcp_keepalive(self.tcp_keepalive)
  }
}
