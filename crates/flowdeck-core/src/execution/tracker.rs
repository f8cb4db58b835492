//! Execution tracker
//!
//! Mirrors one run's record and logs until the run reaches a terminal
//! status. Polling runs as a spawned task owned by the [`PollHandle`]
//! returned from [`ExecutionTracker::start`].
//!
//! Every start bumps an epoch. Fetch results are applied under the state
//! lock only if their epoch is still current and their handle has not been
//! cancelled, so late responses from a superseded or cancelled run are
//! dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

use super::api::ExecutionApi;
use super::output;
use super::types::{ExecutionRecord, ExecutionStatus, LogEntry};
use crate::config::TrackerConfig;
use crate::error::{FlowError, Result, TransportError};
use crate::events::{EventSink, TrackerEvent};

/// Local view of a tracked run
///
/// Mirrors the remote status, plus `Idle` before any run is tracked and
/// `Error` when the run could not be fetched at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerPhase {
    Idle,
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Error,
}

impl From<ExecutionStatus> for TrackerPhase {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Pending => Self::Pending,
            ExecutionStatus::Running => Self::Running,
            ExecutionStatus::Completed => Self::Completed,
            ExecutionStatus::Failed => Self::Failed,
            ExecutionStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// Point-in-time copy of the tracker state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub execution_id: Option<String>,
    pub record: Option<ExecutionRecord>,
    pub logs: Vec<LogEntry>,
    pub phase: TrackerPhase,
    /// Most recent fetch failure, cleared by the next clean fetch
    pub last_error: Option<String>,
    pub auto_refresh: bool,
}

struct TrackerState {
    epoch: u64,
    execution_id: Option<String>,
    record: Option<ExecutionRecord>,
    logs: Vec<LogEntry>,
    phase: TrackerPhase,
    last_error: Option<String>,
}

struct FetchOutcome {
    record: std::result::Result<ExecutionRecord, TransportError>,
    logs: std::result::Result<Vec<LogEntry>, TransportError>,
}

struct TrackerInner {
    api: Arc<dyn ExecutionApi>,
    events: Arc<dyn EventSink>,
    poll_interval: Duration,
    state: Mutex<TrackerState>,
    auto_refresh: watch::Sender<bool>,
    active: Mutex<Option<AbortHandle>>,
}

/// Follows one submitted run through the execution backend
pub struct ExecutionTracker {
    inner: Arc<TrackerInner>,
}

impl ExecutionTracker {
    pub fn new(
        api: Arc<dyn ExecutionApi>,
        config: TrackerConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let (auto_refresh, _) = watch::channel(config.auto_refresh);
        Self {
            inner: Arc::new(TrackerInner {
                api,
                events,
                poll_interval: config.poll_interval,
                state: Mutex::new(TrackerState {
                    epoch: 0,
                    execution_id: None,
                    record: None,
                    logs: Vec::new(),
                    phase: TrackerPhase::Idle,
                    last_error: None,
                }),
                auto_refresh,
                active: Mutex::new(None),
            }),
        }
    }

    /// Begin tracking a run
    ///
    /// Fetches immediately, then every poll interval while auto-refresh is
    /// enabled, until the run is terminal or the handle is cancelled.
    /// Starting another run supersedes this one. Must be called within a
    /// tokio runtime.
    pub fn start(&self, execution_id: impl Into<String>) -> PollHandle {
        let execution_id = execution_id.into();
        let cancelled = Arc::new(AtomicBool::new(false));

        let epoch = {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            state.execution_id = Some(execution_id.clone());
            state.record = None;
            state.logs.clear();
            state.phase = TrackerPhase::Pending;
            state.last_error = None;
            state.epoch
        };

        if let Some(previous) = self.inner.active.lock().take() {
            previous.abort();
        }

        log::info!("Tracking execution '{}'", execution_id);
        self.inner.emit(vec![TrackerEvent::TrackingStarted {
            execution_id: execution_id.clone(),
        }]);

        let task = tokio::spawn(poll_loop(
            self.inner.clone(),
            execution_id.clone(),
            epoch,
            cancelled.clone(),
        ));
        *self.inner.active.lock() = Some(task.abort_handle());

        PollHandle {
            execution_id,
            cancelled,
            task,
            inner: self.inner.clone(),
        }
    }

    /// Ask the backend to cancel a run, then re-fetch it
    ///
    /// Does not assume the cancellation took effect; the returned status
    /// is whatever the re-fetch (or, failing that, the backend) reported.
    /// A failed request leaves local state untouched.
    pub async fn cancel_execution(&self, execution_id: &str) -> Result<Option<ExecutionStatus>> {
        let reported = self
            .inner
            .api
            .cancel_execution(execution_id)
            .await
            .map_err(|e| {
                log::warn!("Cancel request for execution '{}' failed: {}", execution_id, e);
                FlowError::Transport(e)
            })?;
        log::info!("Cancellation requested for execution '{}'", execution_id);

        let epoch = {
            let state = self.inner.state.lock();
            (state.execution_id.as_deref() == Some(execution_id)).then_some(state.epoch)
        };
        let Some(epoch) = epoch else {
            return Ok(reported);
        };

        let outcome = self.inner.fetch(execution_id).await;
        Ok(self.inner.apply(epoch, None, outcome).or(reported))
    }

    /// Enable or disable repeating fetches
    ///
    /// Already-fetched state is kept either way.
    pub fn set_auto_refresh(&self, enabled: bool) {
        log::debug!(
            "Execution auto-refresh {}",
            if enabled { "enabled" } else { "disabled" }
        );
        self.inner.auto_refresh.send_replace(enabled);
    }

    /// Fetch the tracked run once, outside the polling schedule
    pub async fn refresh(&self) -> Result<Option<ExecutionStatus>> {
        let (execution_id, epoch) = {
            let state = self.inner.state.lock();
            let execution_id = state.execution_id.clone().ok_or(FlowError::NotTracking)?;
            (execution_id, state.epoch)
        };

        let outcome = self.inner.fetch(&execution_id).await;
        Ok(self.inner.apply(epoch, None, outcome))
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let state = self.inner.state.lock();
        TrackerSnapshot {
            execution_id: state.execution_id.clone(),
            record: state.record.clone(),
            logs: state.logs.clone(),
            phase: state.phase,
            last_error: state.last_error.clone(),
            auto_refresh: *self.inner.auto_refresh.borrow(),
        }
    }

    pub fn phase(&self) -> TrackerPhase {
        self.inner.state.lock().phase
    }

    /// Canonical stdout of the tracked run
    pub fn extract_stdout(&self) -> String {
        let state = self.inner.state.lock();
        output::extract_stdout(state.record.as_ref(), &state.logs)
    }

    /// Canonical stderr of the tracked run
    pub fn extract_stderr(&self) -> String {
        let state = self.inner.state.lock();
        output::extract_stderr(state.record.as_ref(), &state.logs)
    }
}

impl Drop for ExecutionTracker {
    fn drop(&mut self) {
        if let Some(task) = self.inner.active.lock().take() {
            log::debug!("Tracker dropped, stopping poll task");
            task.abort();
        }
    }
}

/// Handle to a running poll task
///
/// Dropping the handle alone does not stop polling; call
/// [`PollHandle::cancel`] or drop the [`ExecutionTracker`].
pub struct PollHandle {
    execution_id: String,
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
    inner: Arc<TrackerInner>,
}

impl PollHandle {
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Stop polling immediately
    ///
    /// No fetch is issued after this returns, and results of a fetch
    /// already in flight are discarded.
    pub fn cancel(&self) {
        let already = {
            // Serializes with result application.
            let _state = self.inner.state.lock();
            self.cancelled.swap(true, Ordering::SeqCst)
        };
        let finished = self.task.is_finished();
        self.task.abort();

        if !already && !finished {
            log::info!("Stopped tracking execution '{}'", self.execution_id);
            self.inner.emit(vec![TrackerEvent::TrackingCancelled {
                execution_id: self.execution_id.clone(),
            }]);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the poll task has exited (terminal status, cancel, or superseded)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn poll_loop(
    inner: Arc<TrackerInner>,
    execution_id: String,
    epoch: u64,
    cancelled: Arc<AtomicBool>,
) {
    let mut auto_refresh = inner.auto_refresh.subscribe();
    let mut ticker = tokio::time::interval(inner.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut first = true;

    loop {
        ticker.tick().await;

        if !first {
            let mut parked = false;
            while !*auto_refresh.borrow_and_update() {
                parked = true;
                if auto_refresh.changed().await.is_err() {
                    return;
                }
            }
            if parked {
                // Re-align the schedule so the resumed fetch happens now.
                continue;
            }
        }
        first = false;

        if !inner.is_live(epoch, &cancelled) {
            return;
        }

        log::debug!("Polling execution '{}'", execution_id);
        let outcome = inner.fetch(&execution_id).await;
        if inner
            .apply(epoch, Some(&cancelled), outcome)
            .is_some_and(|s| s.is_terminal())
        {
            return;
        }
    }
}

impl TrackerInner {
    async fn fetch(&self, execution_id: &str) -> FetchOutcome {
        let (record, logs) = tokio::join!(
            self.api.fetch_execution(execution_id),
            self.api.fetch_logs(execution_id)
        );
        FetchOutcome { record, logs }
    }

    /// Whether the loop for `epoch` should keep fetching
    fn is_live(&self, epoch: u64, cancelled: &AtomicBool) -> bool {
        let state = self.state.lock();
        if state.epoch != epoch || cancelled.load(Ordering::SeqCst) {
            return false;
        }
        !state.record.as_ref().is_some_and(|r| r.status.is_terminal())
    }

    /// Apply a fetch result if it still belongs to the current run
    ///
    /// Returns the mirrored status afterwards, or `None` if the result
    /// was discarded or no record has been fetched yet.
    fn apply(
        &self,
        epoch: u64,
        cancelled: Option<&AtomicBool>,
        outcome: FetchOutcome,
    ) -> Option<ExecutionStatus> {
        let mut events = Vec::new();

        let status = {
            let mut state = self.state.lock();
            if state.epoch != epoch || cancelled.is_some_and(|c| c.load(Ordering::SeqCst)) {
                log::debug!("Discarding stale execution fetch result");
                return None;
            }
            let execution_id = state.execution_id.clone().unwrap_or_default();
            let mut failure = None;

            match outcome.logs {
                Ok(logs) => {
                    if logs != state.logs {
                        events.push(TrackerEvent::LogsUpdated {
                            execution_id: execution_id.clone(),
                            count: logs.len(),
                        });
                        state.logs = logs;
                    }
                }
                Err(e) => failure = Some(e),
            }

            match outcome.record {
                Ok(record) => {
                    let previous = state.record.as_ref().map(|r| r.status);
                    let status = record.status;
                    if previous != Some(status) {
                        log::info!("Execution '{}' is {}", execution_id, status);
                        events.push(TrackerEvent::StatusChanged {
                            execution_id: execution_id.clone(),
                            previous,
                            status,
                        });
                        if status.is_terminal() {
                            events.push(TrackerEvent::TrackingFinished {
                                execution_id: execution_id.clone(),
                                status,
                            });
                        }
                    }
                    state.phase = status.into();
                    state.record = Some(record);
                }
                Err(e) => failure = Some(e),
            }

            match failure {
                Some(e) => {
                    log::warn!("Fetching execution '{}' failed: {}", execution_id, e);
                    if state.record.is_none() {
                        state.phase = TrackerPhase::Error;
                    }
                    state.last_error = Some(e.to_string());
                    events.push(TrackerEvent::FetchFailed {
                        execution_id,
                        error: e.to_string(),
                    });
                }
                None => state.last_error = None,
            }

            state.record.as_ref().map(|r| r.status)
        };

        self.emit(events);
        status
    }

    fn emit(&self, events: Vec<TrackerEvent>) {
        for event in events {
            if let Err(e) = self.events.send(event) {
                log::warn!("Dropping tracker event: {}", e);
            }
        }
    }
}
