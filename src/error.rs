//! Error handling for the upload client
//!
//! This module defines the error types used throughout the library. HTTP
//! failures and transport failures are kept apart so callers can tell a
//! server rejection from a request that never produced a status.

use thiserror::Error;

/// Fixed message reported for any non-2xx completion.
pub const HTTP_FAILURE_MESSAGE: &str = "upload request failed!";

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, UploadError>;

/// Broad classification of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection could not be established (DNS, refused, reset)
    Connect,
    /// The transport's own timeout elapsed
    Timeout,
    /// The URL was rejected by the transport
    InvalidUrl,
    /// Streaming the request or reading the response body failed
    Body,
    /// Anything else the transport reported
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportErrorKind::Connect => write!(f, "connect"),
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::InvalidUrl => write!(f, "invalid url"),
            TransportErrorKind::Body => write!(f, "body"),
            TransportErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Native error of the transport, raised before any status is obtained
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::InvalidUrl, message)
    }

    pub fn body(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Body, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_builder() {
            TransportErrorKind::InvalidUrl
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_body() || err.is_request() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };
        TransportError::new(kind, err.to_string())
    }
}

/// Error types that can occur when using the upload client
#[derive(Error, Debug)]
pub enum UploadError {
    /// The server completed the request with a status outside [200, 300)
    #[error("upload request failed!")]
    Http { status: u16, body: Option<String> },

    /// The transport failed before a status was obtained
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid parameter
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// `request` was called outside a tokio runtime
    #[error("No tokio runtime available to drive the upload")]
    NoRuntime,

    /// The upload task was aborted through its handle
    #[error("Upload aborted")]
    Aborted,

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UploadError {
    /// Create a new HTTP failure
    pub fn http(status: u16, body: Option<String>) -> Self {
        UploadError::Http { status, body }
    }

    /// Create a new invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        UploadError::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        UploadError::ConfigError {
            message: message.into(),
        }
    }

    /// HTTP status of the failed completion, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure came from the transport rather than the server
    pub fn is_transport(&self) -> bool {
        matches!(self, UploadError::Transport(_))
    }
}

impl Clone for UploadError {
    fn clone(&self) -> Self {
        match self {
            UploadError::Http { status, body } => UploadError::Http {
                status: *status,
                body: body.clone(),
            },
            UploadError::Transport(err) => UploadError::Transport(err.clone()),
            UploadError::InvalidParameter { parameter, message } => UploadError::InvalidParameter {
                parameter: parameter.clone(),
                message: message.clone(),
            },
            UploadError::NoRuntime => UploadError::NoRuntime,
            UploadError::Aborted => UploadError::Aborted,
            UploadError::ConfigError { message } => UploadError::ConfigError {
                message: message.clone(),
            },
            UploadError::Io(err) => UploadError::Io(std::io::Error::new(err.kind(), err.to_string())),
            UploadError::Json(err) => UploadError::config_error(format!("JSON error: {}", err)),
        }
    }
}
