//! Run State — single-run completion signal.
//!
//! One `RunHandle` is shared by every worker of a run (cloned handles point
//! at the same state). The first `set_result` / `set_error` wins; later
//! writes are logged and dropped. Overlapping runs must each use their own
//! handle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(String),
    Failed(String),
}

/// What `await_completion` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub success: bool,
    pub text: String,
}

impl Completion {
    fn timed_out() -> Self {
        Self {
            success: false,
            text: "timed out".to_string(),
        }
    }
}

impl From<RunOutcome> for Completion {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed(text) => Completion {
                success: true,
                text,
            },
            RunOutcome::Failed(text) => Completion {
                success: false,
                text,
            },
        }
    }
}

struct Inner {
    id: std::sync::Mutex<(Uuid, DateTime<Utc>)>,
    outcome: watch::Sender<Option<RunOutcome>>,
}

/// Cloneable handle on one run's completion state.
#[derive(Clone)]
pub struct RunHandle {
    inner: Arc<Inner>,
}

impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("run_id", &self.run_id())
            .field("outcome", &self.outcome())
            .finish()
    }
}

impl RunHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                id: std::sync::Mutex::new((Uuid::new_v4(), Utc::now())),
                outcome: tx,
            }),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.inner.id.lock().map(|g| g.0).unwrap_or_default()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner
            .id
            .lock()
            .map(|g| g.1)
            .unwrap_or_else(|_| Utc::now())
    }

    /// Clear to pending and start a new run id.
    pub fn reset(&self) {
        if let Ok(mut id) = self.inner.id.lock() {
            *id = (Uuid::new_v4(), Utc::now());
        }
        self.inner.outcome.send_replace(None);
        tracing::debug!("[RunState] Reset run {}", self.run_id());
    }

    pub fn set_result(&self, text: impl Into<String>) -> bool {
        self.complete(RunOutcome::Completed(text.into()))
    }

    pub fn set_error(&self, text: impl Into<String>) -> bool {
        self.complete(RunOutcome::Failed(text.into()))
    }

    /// Record the terminal state. Returns `false` when one was already set.
    fn complete(&self, outcome: RunOutcome) -> bool {
        let mut incoming = Some(outcome);
        let stored = self.inner.outcome.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = incoming.take();
            true
        });
        if let Some(dropped) = incoming {
            tracing::debug!(
                "[RunState] Run {} already completed, ignoring {:?}",
                self.run_id(),
                dropped
            );
        }
        stored
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.inner.outcome.borrow().clone()
    }

    pub fn is_completed(&self) -> bool {
        self.inner.outcome.borrow().is_some()
    }

    /// Wait until a terminal state is set or `timeout` elapses.
    ///
    /// Expiry only stops waiting; in-flight workers keep running.
    pub async fn await_completion(&self, timeout: Duration) -> Completion {
        let mut rx = self.inner.outcome.subscribe();
        let wait = async {
            match rx.wait_for(|o| o.is_some()).await {
                Ok(outcome) => outcome.clone(),
                Err(_) => None,
            }
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(Some(outcome)) => outcome.into(),
            Ok(None) | Err(_) => {
                tracing::warn!(
                    "[RunState] Run {} did not complete within {:?}",
                    self.run_id(),
                    timeout
                );
                Completion::timed_out()
            }
        }
    }
}
