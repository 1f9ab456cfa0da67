use serde::Serialize;
use strum::{Display, EnumString};
use thiserror::Error;

/// Failure categories shared by the transport, the domain operations and the
/// gRPC boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Tokenizer,
    Backend,
    Overloaded,
    Unhealthy,
    Network,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn grpc_code(self) -> tonic::Code {
        match self {
            ErrorKind::Validation | ErrorKind::Tokenizer => tonic::Code::InvalidArgument,
            ErrorKind::Backend | ErrorKind::Unknown => tonic::Code::Internal,
            ErrorKind::Overloaded => tonic::Code::ResourceExhausted,
            ErrorKind::Unhealthy | ErrorKind::Network => tonic::Code::Unavailable,
            ErrorKind::Timeout => tonic::Code::DeadlineExceeded,
        }
    }
}

/// A classified failure observed while talking to the TEI backend.
///
/// Built once where the failure is first seen and never changed afterwards;
/// the request id is attached at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("TEI error [{kind}]{}: {message}", fmt_request_id(.request_id))]
pub struct TeiError {
    kind: ErrorKind,
    message: String,
    code: Option<u16>,
    request_id: Option<String>,
}

fn fmt_request_id(request_id: &Option<String>) -> String {
    request_id
        .as_deref()
        .map(|id| format!(" (request: {})", id))
        .unwrap_or_default()
}

impl TeiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            request_id: None,
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Backend, message)
    }

    /// The caller cancelled the request.
    pub fn canceled() -> Self {
        Self::new(ErrorKind::Timeout, "request canceled")
    }

    /// The request deadline passed.
    pub fn deadline_exceeded() -> Self {
        Self::new(ErrorKind::Timeout, "request timeout")
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<u16> {
        self.code
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        is_retryable(self.kind, self.code)
    }

    /// `[kind] message`, with the request id when known.
    pub fn status_message(&self) -> String {
        match &self.request_id {
            Some(id) => format!("[{}] {} (request: {})", self.kind, self.message, id),
            None => format!("[{}] {}", self.kind, self.message),
        }
    }
}

/// Map a non-2xx HTTP status to an error kind. First match wins.
pub fn classify_http_status(code: u16, message: impl Into<String>) -> TeiError {
    let kind = match code {
        413 => ErrorKind::Validation,
        422 => ErrorKind::Tokenizer,
        424 => ErrorKind::Backend,
        429 => ErrorKind::Overloaded,
        503 => ErrorKind::Unhealthy,
        500.. => ErrorKind::Backend,
        400.. => ErrorKind::Validation,
        _ => ErrorKind::Unknown,
    };

    TeiError {
        kind,
        message: message.into(),
        code: Some(code),
        request_id: None,
    }
}

/// Map a failure below HTTP (connect, DNS, socket, timeout) to an error kind.
///
/// Timeouts become `timeout`; every other transport failure, including
/// refused connections and unknown hosts, becomes `network`.
pub fn classify_transport_failure(err: &reqwest::Error) -> TeiError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::Network
    };

    TeiError::new(kind, transport_message(err))
}

fn transport_message(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Whether a failure of this kind is worth another attempt.
///
/// `backend` only qualifies when it came with a 5xx status.
pub fn is_retryable(kind: ErrorKind, code: Option<u16>) -> bool {
    match kind {
        ErrorKind::Overloaded | ErrorKind::Network | ErrorKind::Timeout => true,
        ErrorKind::Backend => code.is_some_and(|c| c >= 500),
        _ => false,
    }
}

/// A single rejected request field.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("validation error on field '{field}': {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Every field rejected during one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MultiValidationError {
    errors: Vec<ValidationError>,
}

impl MultiValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        field: impl Into<String>,
        message: impl Into<String>,
        value: Option<serde_json::Value>,
    ) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
            value,
        });
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: MultiValidationError) {
        self.errors.extend(other.errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_result(self) -> Result<(), MultiValidationError> {
        if self.has_errors() { Err(self) } else { Ok(()) }
    }
}

impl std::fmt::Display for MultiValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "validation failed"),
            [single] => write!(f, "{}", single),
            many => {
                write!(f, "validation failed with {} errors: ", many.len())?;
                for (i, err) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}: {}", err.field, err.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for MultiValidationError {}

impl From<ValidationError> for MultiValidationError {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

#[derive(Debug, Error)]
pub enum EmbeddingsError {
    #[error(transparent)]
    Tei(#[from] TeiError),

    #[error("request failed after {attempts} attempts: {source}")]
    RetriesExhausted { attempts: u32, source: TeiError },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    InvalidRequest(#[from] MultiValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("pairwise similarity failed at index {index}: {source}")]
    PairwiseRow {
        index: usize,
        source: Box<EmbeddingsError>,
    },
}

pub type EmbeddingsResult<T> = Result<T, EmbeddingsError>;

impl EmbeddingsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmbeddingsError::Tei(err) => err.kind(),
            EmbeddingsError::RetriesExhausted { source, .. } => source.kind(),
            EmbeddingsError::Validation(_) | EmbeddingsError::InvalidRequest(_) => {
                ErrorKind::Validation
            }
            EmbeddingsError::Config(_) => ErrorKind::Unknown,
            EmbeddingsError::PairwiseRow { source, .. } => source.kind(),
        }
    }

    /// The classified backend error, if this failure got that far.
    pub fn tei_error(&self) -> Option<&TeiError> {
        match self {
            EmbeddingsError::Tei(err) => Some(err),
            EmbeddingsError::RetriesExhausted { source, .. } => Some(source),
            EmbeddingsError::PairwiseRow { source, .. } => source.tei_error(),
            _ => None,
        }
    }

    /// Attach the index of the pairwise row that failed.
    pub fn at_row(self, index: usize) -> Self {
        EmbeddingsError::PairwiseRow {
            index,
            source: Box::new(self),
        }
    }

    /// Message reported to gRPC callers.
    pub fn status_message(&self) -> String {
        match self {
            EmbeddingsError::Tei(tei) => tei.status_message(),
            EmbeddingsError::RetriesExhausted { attempts, source } => {
                format!("{} after {} attempts", source.status_message(), attempts)
            }
            EmbeddingsError::Validation(v) => format!("[{}] {}", ErrorKind::Validation, v),
            EmbeddingsError::InvalidRequest(v) => format!("[{}] {}", ErrorKind::Validation, v),
            EmbeddingsError::Config(msg) => format!("[{}] {}", ErrorKind::Unknown, msg),
            EmbeddingsError::PairwiseRow { index, source } => format!(
                "{} (pairwise similarity failed at index {})",
                source.status_message(),
                index
            ),
        }
    }
}

impl From<EmbeddingsError> for tonic::Status {
    fn from(err: EmbeddingsError) -> Self {
        tonic::Status::new(err.kind().grpc_code(), err.status_message())
    }
}
