//! Transport abstraction
//!
//! A transport posts one encoded multipart body, reports progress through a
//! [`ProgressSink`] while the body is being sent, and resolves with the
//! response status and body, or with its own error when no status could be
//! obtained.

pub mod http;
pub mod scripted;

use crate::error::TransportError;
use async_trait::async_trait;
use std::sync::Arc;

pub use http::{HttpTransport, HttpTransportConfig};
pub use scripted::{ScriptStep, ScriptedTransport};

/// One POST request ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl TransportRequest {
    pub fn body_len(&self) -> u64 {
        self.body.len() as u64
    }
}

/// Completed response, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Upload-side progress channel handed to a transport
#[derive(Clone)]
pub struct ProgressSink {
    inner: Arc<dyn Fn(u64, u64) + Send + Sync>,
}

impl ProgressSink {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(callback),
        }
    }

    pub fn noop() -> Self {
        Self::new(|_, _| {})
    }

    pub fn report(&self, loaded: u64, total: u64) {
        (self.inner)(loaded, total)
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}

/// Sends a multipart request and observes its lifecycle
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(
        &self,
        request: TransportRequest,
        progress: ProgressSink,
    ) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        request: TransportRequest,
        progress: ProgressSink,
    ) -> Result<TransportResponse, TransportError> {
        (**self).send(request, progress).await
    }
}
