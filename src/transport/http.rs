//! HTTP transport backed by reqwest
//!
//! The encoded body is streamed in `chunk-size` slices; each slice handed to
//! the connection produces one progress report. No timeout is applied unless
//! the configuration sets one, and redirects are never followed: a 3xx answer
//! is handed back as the response of the single request.

use crate::error::{Result, TransportError, UploadError};
use crate::transport::{ProgressSink, Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use log::{debug, trace};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Configuration for the HTTP transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpTransportConfig {
    /// Bytes handed to the connection per progress report (default: 64 KiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Whole-request timeout in seconds (default: none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Connect timeout in seconds (default: none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,

    /// User agent sent with every request (default: reqwest's)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: None,
            connect_timeout: None,
            user_agent: None,
        }
    }
}

impl HttpTransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout = Some(secs);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(UploadError::invalid_parameter(
                "chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if self.timeout == Some(0) {
            return Err(UploadError::invalid_parameter(
                "timeout",
                "Timeout must be greater than 0",
            ));
        }

        if self.connect_timeout == Some(0) {
            return Err(UploadError::invalid_parameter(
                "connect_timeout",
                "Connect timeout must be greater than 0",
            ));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(UploadError::from)
    }
}

/// Transport that performs real HTTP requests
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    chunk_size: usize,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(secs) = config.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        let client = builder.build().map_err(|e| {
            UploadError::config_error(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            chunk_size: config.chunk_size,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// Split `payload` into views of at most `chunk_size` bytes over the same buffer
fn body_chunks(payload: Bytes, chunk_size: usize) -> impl Iterator<Item = Bytes> + Send {
    (0..payload.len())
        .step_by(chunk_size)
        .map(move |start| payload.slice(start..(start + chunk_size).min(payload.len())))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: TransportRequest,
        progress: ProgressSink,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let total = request.body_len();
        let chunks = body_chunks(Bytes::from(request.body), self.chunk_size);

        let mut loaded = 0u64;
        let body = stream::iter(chunks)
            .map(Ok::<Bytes, std::io::Error>)
            .inspect(move |chunk| {
                if let Ok(chunk) = chunk {
                    loaded += chunk.len() as u64;
                    trace!("Streamed {}/{} bytes", loaded, total);
                    progress.report(loaded, total);
                }
            });

        debug!("POST {} ({} bytes)", request.url, total);
        let response = self
            .client
            .post(&request.url)
            .header(CONTENT_TYPE, request.content_type)
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!("POST {} completed with status {}", request.url, status);

        Ok(TransportResponse::new(status, Vec::from(body)))
    }
}
