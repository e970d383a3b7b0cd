//! In-process transport that replays a fixed script
//!
//! Useful wherever an upload has to be exercised without a network: the
//! script lists the progress ticks and pauses to emit, then the transport
//! resolves with the configured response or error. Every request it receives
//! is recorded for inspection.

use crate::error::TransportError;
use crate::transport::{ProgressSink, Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Report exactly these counters
    Progress { loaded: u64, total: u64 },
    /// Report the request body in slices of this size
    Body { chunk_size: usize },
    /// Sleep before the next step
    Delay(Duration),
}

#[derive(Debug)]
pub struct ScriptedTransport {
    steps: Vec<ScriptStep>,
    result: Result<TransportResponse, TransportError>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn responding(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::with_result(Ok(TransportResponse::new(status, body)))
    }

    pub fn failing(error: TransportError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: Result<TransportResponse, TransportError>) -> Self {
        Self {
            steps: Vec::new(),
            result,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn progress(mut self, loaded: u64, total: u64) -> Self {
        self.steps.push(ScriptStep::Progress { loaded, total });
        self
    }

    pub fn body_progress(mut self, chunk_size: usize) -> Self {
        self.steps.push(ScriptStep::Body { chunk_size });
        self
    }

    pub fn delay(mut self, duration: Duration) -> Self {
        self.steps.push(ScriptStep::Delay(duration));
        self
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: TransportRequest,
        progress: ProgressSink,
    ) -> Result<TransportResponse, TransportError> {
        let total = request.body_len();
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        for step in &self.steps {
            match step {
                ScriptStep::Progress { loaded, total } => progress.report(*loaded, *total),
                ScriptStep::Body { chunk_size } => {
                    let step = (*chunk_size).max(1) as u64;
                    let mut loaded = 0u64;
                    while loaded < total {
                        loaded = (loaded + step).min(total);
                        progress.report(loaded, total);
                    }
                }
                ScriptStep::Delay(duration) => tokio::time::sleep(*duration).await,
            }
        }

        self.result.clone()
    }
}
