use crate::error::{Result, UploadError};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Binary payload attached under the configured field name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub data: Vec<u8>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

impl UploadFile {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            file_name: None,
            mime_type: None,
        }
    }

    /// Read a file from disk, keeping its file name for the part header
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(UploadError::invalid_parameter(
                "file",
                format!("File does not exist: {}", path.display()),
            ));
        }

        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        Ok(Self {
            data,
            file_name,
            mime_type: None,
        })
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn content_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE)
    }
}

/// One progress notification; `percent` is `loaded / total * 100`, unclamped
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
    pub percent: f64,
}

impl UploadProgress {
    pub fn new(loaded: u64, total: u64) -> Self {
        Self {
            loaded,
            total,
            percent: loaded as f64 / total as f64 * 100.0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.loaded == self.total
    }
}

/// Normalized body of a successful upload
#[derive(Debug, Clone, PartialEq)]
pub enum UploadResponse {
    /// Text body that parsed as JSON
    Parsed(Value),
    /// Text body that is not JSON, delivered unchanged
    Raw(String),
    /// Non-text body, delivered verbatim
    Passthrough(Vec<u8>),
}

impl UploadResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            UploadResponse::Parsed(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            UploadResponse::Raw(text) => Some(text),
            _ => None,
        }
    }

    /// Whether the server sent no body at all
    pub fn is_empty(&self) -> bool {
        match self {
            UploadResponse::Raw(text) => text.is_empty(),
            UploadResponse::Passthrough(bytes) => bytes.is_empty(),
            UploadResponse::Parsed(_) => false,
        }
    }
}

/// Terminal outcome of one upload
#[derive(Debug, Clone)]
pub enum UploadOutcome {
    Success(UploadResponse),
    Failure(UploadError),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<UploadResponse> {
        match self {
            UploadOutcome::Success(response) => Ok(response),
            UploadOutcome::Failure(err) => Err(err),
        }
    }
}

/// Lifecycle of one upload call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Sending,
    Succeeded,
    Failed,
    Aborted,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Succeeded | UploadState::Failed | UploadState::Aborted
        )
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadState::Idle => write!(f, "idle"),
            UploadState::Sending => write!(f, "sending"),
            UploadState::Succeeded => write!(f, "succeeded"),
            UploadState::Failed => write!(f, "failed"),
            UploadState::Aborted => write!(f, "aborted"),
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;
pub type SuccessCallback = Arc<dyn Fn(UploadResponse) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(UploadError) + Send + Sync>;

/// Everything needed for one upload call
#[derive(Clone)]
pub struct UploadConfig {
    pub url: String,
    pub field_name: String,
    pub file: UploadFile,
    pub extra_fields: Vec<(String, String)>,
    pub on_progress: Option<ProgressCallback>,
    pub on_success: Option<SuccessCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl std::fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadConfig")
            .field("url", &self.url)
            .field("field_name", &self.field_name)
            .field("file_len", &self.file.len())
            .field("file_name", &self.file.file_name)
            .field("extra_fields", &self.extra_fields)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl UploadConfig {
    pub fn new(url: impl Into<String>, field_name: impl Into<String>, file: UploadFile) -> Self {
        Self {
            url: url.into(),
            field_name: field_name.into(),
            file,
            extra_fields: Vec::new(),
            on_progress: None,
            on_success: None,
            on_error: None,
        }
    }

    /// Append an extra form field; the value is string-coerced
    pub fn field(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.extra_fields.push((name.into(), value.to_string()));
        self
    }

    pub fn fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.extra_fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(UploadResponse) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(UploadError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(UploadError::invalid_parameter(
                "url",
                "URL cannot be empty",
            ));
        }

        if self.field_name.is_empty() {
            return Err(UploadError::invalid_parameter(
                "field_name",
                "Field name cannot be empty",
            ));
        }

        if let Some(index) = self.extra_fields.iter().position(|(name, _)| name.is_empty()) {
            return Err(UploadError::invalid_parameter(
                "extra_fields",
                format!("Extra field #{} has an empty name", index),
            ));
        }

        Ok(())
    }
}
