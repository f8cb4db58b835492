//! Execution tracking
//!
//! Follows one submitted run from creation to a terminal state by polling
//! the execution backend, and normalizes its output into a canonical
//! stdout/stderr view.

mod api;
pub mod output;
mod tracker;
mod types;

pub use api::ExecutionApi;
pub use output::{extract_stderr, extract_stdout, OutputPayload};
pub use tracker::{ExecutionTracker, PollHandle, TrackerPhase, TrackerSnapshot};
pub use types::{ExecutionRecord, ExecutionStatus, LogEntry, LogLevel};
