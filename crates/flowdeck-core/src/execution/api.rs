//! Execution backend consumed by the tracker

use async_trait::async_trait;

use super::types::{ExecutionRecord, ExecutionStatus, LogEntry};
use crate::error::TransportError;

/// Remote execution backend
///
/// The record fetch and the logs fetch are independent calls.
#[async_trait]
pub trait ExecutionApi: Send + Sync {
    /// Fetch the current record of a run
    async fn fetch_execution(&self, execution_id: &str) -> Result<ExecutionRecord, TransportError>;

    /// Fetch the full log list of a run
    async fn fetch_logs(&self, execution_id: &str) -> Result<Vec<LogEntry>, TransportError>;

    /// Ask the backend to cancel a run
    ///
    /// Returns the status the backend reported, if any.
    async fn cancel_execution(
        &self,
        execution_id: &str,
    ) -> Result<Option<ExecutionStatus>, TransportError>;
}
