//! Callback delivery for a single upload
//!
//! [`CallbackGuard`] owns the caller's three callbacks and the upload state
//! machine (`Idle -> Sending -> Succeeded | Failed`, plus `Aborted` through
//! the handle). Progress is forwarded only while `Sending` and only when
//! `loaded` does not go backwards; the terminal callback fires at most once
//! and nothing is forwarded after it.

use crate::error::UploadError;
use crate::upload::types::{
    ErrorCallback, ProgressCallback, SuccessCallback, UploadOutcome, UploadProgress, UploadState,
};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking user callback must not wedge the state machine.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct CallbackGuard {
    state: Mutex<UploadState>,
    /// Held while a callback runs; stores the last forwarded `loaded`.
    delivery: Mutex<Option<u64>>,
    on_progress: Option<ProgressCallback>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl CallbackGuard {
    pub fn new(
        on_progress: Option<ProgressCallback>,
        on_success: Option<SuccessCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        Self {
            state: Mutex::new(UploadState::Idle),
            delivery: Mutex::new(None),
            on_progress,
            on_success,
            on_error,
        }
    }

    pub fn state(&self) -> UploadState {
        *lock(&self.state)
    }

    /// Move from `Idle` to `Sending`; false if the upload already ended
    pub fn begin(&self) -> bool {
        let mut state = lock(&self.state);
        match *state {
            UploadState::Idle => {
                *state = UploadState::Sending;
                true
            }
            other => {
                debug!("Upload cannot start from state {}", other);
                false
            }
        }
    }

    /// Forward one transport progress tick
    pub fn progress(&self, loaded: u64, total: u64) -> bool {
        let mut last_loaded = lock(&self.delivery);

        if self.state() != UploadState::Sending {
            debug!(
                "Dropping progress {}/{} outside of sending state",
                loaded, total
            );
            return false;
        }

        if matches!(*last_loaded, Some(last) if loaded < last) {
            debug!(
                "Dropping out-of-order progress {}/{} (last was {:?})",
                loaded, total, *last_loaded
            );
            return false;
        }
        *last_loaded = Some(loaded);

        if let Some(callback) = &self.on_progress {
            callback(UploadProgress::new(loaded, total));
        }
        true
    }

    /// Record the terminal outcome and fire the matching callback once
    ///
    /// Returns the outcome that actually ended the upload: when the upload
    /// was already aborted, that is `Failure(Aborted)` and no callback fires.
    pub fn finish(&self, outcome: UploadOutcome) -> UploadOutcome {
        let _delivery = lock(&self.delivery);

        {
            let mut state = lock(&self.state);
            if state.is_terminal() {
                debug!("Upload already {}, discarding late outcome", *state);
                return UploadOutcome::Failure(UploadError::Aborted);
            }
            *state = match outcome {
                UploadOutcome::Success(_) => UploadState::Succeeded,
                UploadOutcome::Failure(_) => UploadState::Failed,
            };
        }

        match &outcome {
            UploadOutcome::Success(response) => {
                info!("Upload succeeded");
                if let Some(callback) = &self.on_success {
                    callback(response.clone());
                }
            }
            UploadOutcome::Failure(err) => {
                warn!("Upload failed: {}", err);
                if let Some(callback) = &self.on_error {
                    callback(err.clone());
                }
            }
        }

        outcome
    }

    /// Mark the upload aborted; false once a terminal state was reached
    pub fn abort(&self) -> bool {
        let mut state = lock(&self.state);
        if state.is_terminal() {
            return false;
        }
        *state = UploadState::Aborted;
        true
    }
}

impl std::fmt::Debug for CallbackGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackGuard")
            .field("state", &self.state())
            .field("on_progress", &self.on_progress.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Handle to an in-flight upload, returned as soon as the upload is spawned
///
/// Dropping the handle does not cancel the upload.
#[derive(Debug)]
pub struct UploadHandle {
    url: String,
    guard: Arc<CallbackGuard>,
    task: JoinHandle<UploadOutcome>,
}

impl UploadHandle {
    pub(crate) fn new(
        url: String,
        guard: Arc<CallbackGuard>,
        task: JoinHandle<UploadOutcome>,
    ) -> Self {
        Self { url, guard, task }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> UploadState {
        self.guard.state()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Cancel the upload task
    ///
    /// After a successful abort no further callback starts; a callback that
    /// is already running completes. Returns false when the upload had
    /// already reached a terminal state.
    pub fn abort(&self) -> bool {
        if !self.guard.abort() {
            return false;
        }
        info!("Aborting upload to {}", self.url);
        self.task.abort();
        true
    }

    /// Wait for the terminal outcome
    pub async fn outcome(self) -> UploadOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => UploadOutcome::Failure(UploadError::Aborted),
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        }
    }
}
