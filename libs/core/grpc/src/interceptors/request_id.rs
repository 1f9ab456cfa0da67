use tonic::{Request, Status};

use crate::metadata::{REQUEST_ID_HEADER, request_id};

/// Interceptor guaranteeing every request carries an `x-request-id`.
///
/// An id supplied by the caller is kept; otherwise a UUIDv4 is generated.
/// Works on both sides: as a client interceptor it tags outgoing calls, as a
/// server interceptor it tags incoming ones before the handler runs.
///
/// # Example
/// ```ignore
/// use grpc_client::RequestIdInterceptor;
///
/// let client = TextEmbeddingsServiceClient::with_interceptor(channel, RequestIdInterceptor::new());
/// let server = TextEmbeddingsServiceServer::with_interceptor(service, RequestIdInterceptor::new());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestIdInterceptor;

impl RequestIdInterceptor {
  pub fn new() -> Self {
    Self
  }
}

impl tonic::service::Interceptor for RequestIdInterceptor {
  fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
    if let Some(existing) = request_id(request.metadata()) {
      tracing::trace!(request_id = %existing, "Request id supplied by caller");
      return Ok(request);
    }

    let generated = uuid::Uuid::new_v4().to_string();
    request.metadata_mut().insert(
      REQUEST_ID_HEADER,
      generated
        .parse()
        .map_err(|_| Status::internal("Failed to create request ID"))?,
    );

    tracing::debug!(request_id = %generated, "Assigned request id");

    Ok(request)
  }
}
