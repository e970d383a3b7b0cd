pub mod callback;
pub mod error;
pub mod transport;
pub mod upload;

pub use callback::UploadHandle;

pub use error::{Result, TransportError, TransportErrorKind, UploadError};

pub use transport::{
    HttpTransport, HttpTransportConfig, ProgressSink, ScriptedTransport, Transport,
    TransportRequest, TransportResponse,
};

pub use upload::{
    request, upload, MultipartForm, UploadClient, UploadConfig, UploadFile, UploadOutcome,
    UploadProgress, UploadResponse, UploadState,
};
