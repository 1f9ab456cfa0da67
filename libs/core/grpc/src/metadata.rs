//! Helpers for reading well-known request metadata.

use std::time::Duration;
use tonic::metadata::MetadataMap;

/// Correlation header shared by all services.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

// Longest id accepted from callers; anything longer is replaced.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Returns the caller-supplied request id, if present and usable.
pub fn request_id(metadata: &MetadataMap) -> Option<String> {
  let value = metadata.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
  if value.is_empty() || value.len() > MAX_REQUEST_ID_LEN {
    return None;
  }
  Some(value.to_string())
}

/// Parses the `grpc-timeout` header (`<digits><unit>`, at most 8 digits).
///
/// Units: `H` hours, `M` minutes, `S` seconds, `m` millis, `u` micros, `n` nanos.
pub fn grpc_timeout(metadata: &MetadataMap) -> Option<Duration> {
  parse_grpc_timeout(metadata.get(GRPC_TIMEOUT_HEADER)?.to_str().ok()?)
}

fn parse_grpc_timeout(raw: &str) -> Option<Duration> {
  if raw.len() < 2 || !raw.is_ascii() {
    return None;
  }
  let (digits, unit) = raw.split_at(raw.len() - 1);
  if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  let value: u64 = digits.parse().ok()?;

  let duration = match unit {
    "H" => Duration::from_secs(value * 60 * 60),
    "M" => Duration::from_secs(value * 60),
    "S" => Duration::from_secs(value),
    "m" => Duration::from_millis(value),
    "u" => Duration::from_micros(value),
    "n" => Duration::from_nanos(value),
    _ => return None,
  };
  Some(duration)
}
