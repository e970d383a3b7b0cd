//! Upload operations implementation

use crate::callback::{CallbackGuard, UploadHandle};
use crate::error::{Result, UploadError};
use crate::transport::{
    HttpTransport, HttpTransportConfig, ProgressSink, Transport, TransportRequest,
};
use crate::upload::multipart::MultipartForm;
use crate::upload::response::normalize_body;
use crate::upload::types::{UploadConfig, UploadOutcome, UploadResponse};
use log::{debug, info};
use once_cell::sync::OnceCell;
use std::sync::Arc;

static DEFAULT_CLIENT: OnceCell<UploadClient<HttpTransport>> = OnceCell::new();

/// Issues uploads through one transport
///
/// Each call to [`UploadClient::request`] is independent: it gets its own
/// multipart body, its own task and its own callback state.
#[derive(Debug)]
pub struct UploadClient<T: Transport = HttpTransport> {
    transport: Arc<T>,
}

impl<T: Transport> Clone for UploadClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
        }
    }
}

impl UploadClient<HttpTransport> {
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::with_config(config)?))
    }
}

impl<T: Transport> UploadClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    pub fn from_shared(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start one multipart upload
    ///
    /// Returns as soon as the upload task is spawned. The outcome is
    /// delivered through the config's callbacks and through
    /// [`UploadHandle::outcome`].
    ///
    /// # Arguments
    ///
    /// * `config` - Destination, file part, extra fields and callbacks
    ///
    /// # Returns
    ///
    /// A handle to inspect, abort or await the running upload
    ///
    /// # Errors
    ///
    /// Fails synchronously only on misuse: an empty URL or field name, or a
    /// call made outside a tokio runtime. Everything else, including a
    /// malformed URL, is reported through `on_error`.
    pub fn request(&self, config: UploadConfig) -> Result<UploadHandle> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| UploadError::NoRuntime)?;

        let UploadConfig {
            url,
            field_name,
            file,
            extra_fields,
            on_progress,
            on_success,
            on_error,
        } = config;

        let form = extra_fields
            .into_iter()
            .fold(MultipartForm::new().file(field_name, file), |form, (name, value)| {
                form.text(name, value)
            });

        let request = TransportRequest {
            url: url.clone(),
            content_type: form.content_type(),
            body: form.encode(),
        };
        debug!(
            "Prepared upload to {} with {} parts ({} bytes)",
            url,
            form.parts().len(),
            request.body.len()
        );

        let guard = Arc::new(CallbackGuard::new(on_progress, on_success, on_error));
        let task = runtime.spawn(drive(self.transport.clone(), request, guard.clone()));

        Ok(UploadHandle::new(url, guard, task))
    }

    /// Start an upload and wait for its outcome
    ///
    /// Callbacks in `config` still fire as they do for [`UploadClient::request`].
    ///
    /// # Arguments
    ///
    /// * `config` - Destination, file part, extra fields and callbacks
    ///
    /// # Returns
    ///
    /// The normalized response body of a 2xx completion
    ///
    /// # Errors
    ///
    /// The misuse errors of [`UploadClient::request`], `UploadError::Http` for
    /// any other status, and `UploadError::Transport` when no status arrived.
    pub async fn upload(&self, config: UploadConfig) -> Result<UploadResponse> {
        self.request(config)?.outcome().await.into_result()
    }
}

async fn drive<T: Transport>(
    transport: Arc<T>,
    request: TransportRequest,
    guard: Arc<CallbackGuard>,
) -> UploadOutcome {
    if !guard.begin() {
        return UploadOutcome::Failure(UploadError::Aborted);
    }

    let sink_guard = guard.clone();
    let sink = ProgressSink::new(move |loaded, total| {
        sink_guard.progress(loaded, total);
    });

    let url = request.url.clone();
    let outcome = match transport.send(request, sink).await {
        Ok(response) if response.is_success() => {
            info!("Upload to {} completed with status {}", url, response.status);
            UploadOutcome::Success(normalize_body(response.body))
        }
        Ok(response) => {
            let body = if response.body.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&response.body).into_owned())
            };
            UploadOutcome::Failure(UploadError::http(response.status, body))
        }
        Err(err) => UploadOutcome::Failure(UploadError::Transport(err)),
    };

    guard.finish(outcome)
}

fn default_client() -> Result<&'static UploadClient<HttpTransport>> {
    DEFAULT_CLIENT.get_or_try_init(UploadClient::<HttpTransport>::new)
}

/// Start an upload through the shared default HTTP transport
///
/// The transport is built on first use with the default configuration and
/// reused by every later call.
///
/// # Arguments
///
/// * `config` - Destination, file part, extra fields and callbacks
///
/// # Returns
///
/// A handle to inspect, abort or await the running upload
///
/// # Errors
///
/// `UploadError::ConfigError` if the default HTTP client cannot be built,
/// otherwise the misuse errors of [`UploadClient::request`].
pub fn request(config: UploadConfig) -> Result<UploadHandle> {
    default_client()?.request(config)
}

/// Upload through the shared default HTTP transport and wait for the outcome
///
/// # Arguments
///
/// * `config` - Destination, file part, extra fields and callbacks
///
/// # Returns
///
/// The normalized response body of a 2xx completion
///
/// # Errors
///
/// Same as [`UploadClient::upload`], plus `UploadError::ConfigError` if the
/// default HTTP client cannot be built.
pub async fn upload(config: UploadConfig) -> Result<UploadResponse> {
    default_client()?.upload(config).await
}
