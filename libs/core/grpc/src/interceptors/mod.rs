/// Re-export tonic's Interceptor trait for convenience
pub use tonic::service::Interceptor;

pub mod request_id;

pub use request_id::RequestIdInterceptor;
