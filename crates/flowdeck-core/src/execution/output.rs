//! Canonical stdout/stderr view over heterogeneous run output
//!
//! `outputData` has no fixed shape. It is classified once into an
//! [`OutputPayload`], then an ordered list of strategies is tried until one
//! yields text. The order of [`STDOUT_STRATEGIES`] and
//! [`STDERR_STRATEGIES`] is the contract downstream log viewers rely on.
//!
//! Empty strings count as absent. `results` entries are joined in the
//! map's key order, which is document order (serde_json `preserve_order`).

use serde_json::{Map, Value};

use super::types::{ExecutionRecord, LogEntry, LogLevel};
use crate::constants::markers;

/// Known shapes of `outputData`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputPayload<'a> {
    /// Missing, null, or a shape carrying no readable fields
    Empty,
    /// The whole payload is a string
    RawString(&'a str),
    /// An object with top-level fields only
    DirectFields(&'a Map<String, Value>),
    /// An object with a `results` map keyed by node id
    ResultsMap {
        fields: &'a Map<String, Value>,
        results: &'a Map<String, Value>,
    },
}

impl<'a> OutputPayload<'a> {
    pub fn classify(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::String(s)) => Self::RawString(s),
            Some(Value::Object(fields)) => match fields.get("results") {
                Some(Value::Object(results)) => Self::ResultsMap { fields, results },
                _ => Self::DirectFields(fields),
            },
            _ => Self::Empty,
        }
    }

    fn fields(&self) -> Option<&'a Map<String, Value>> {
        match self {
            Self::DirectFields(fields) | Self::ResultsMap { fields, .. } => Some(fields),
            _ => None,
        }
    }

    fn results(&self) -> Option<&'a Map<String, Value>> {
        match self {
            Self::ResultsMap { results, .. } => Some(results),
            _ => None,
        }
    }
}

/// Everything an extraction strategy may read
#[derive(Debug, Clone, Copy)]
pub struct OutputSource<'a> {
    pub payload: OutputPayload<'a>,
    pub error_message: Option<&'a str>,
    pub logs: &'a [LogEntry],
}

impl<'a> OutputSource<'a> {
    pub fn new(record: Option<&'a ExecutionRecord>, logs: &'a [LogEntry]) -> Self {
        Self {
            payload: OutputPayload::classify(record.and_then(|r| r.output_data.as_ref())),
            error_message: record.and_then(|r| r.error_message.as_deref()),
            logs,
        }
    }
}

/// One way of reading stdout, tried in [`STDOUT_STRATEGIES`] order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdoutStrategy {
    RawString,
    DirectStdout,
    ResultsStdout,
    ResultsResult,
    DirectResult,
    NodeInfoLogs,
    NonErrorLogs,
}

pub const STDOUT_STRATEGIES: &[StdoutStrategy] = &[
    StdoutStrategy::RawString,
    StdoutStrategy::DirectStdout,
    StdoutStrategy::ResultsStdout,
    StdoutStrategy::ResultsResult,
    StdoutStrategy::DirectResult,
    StdoutStrategy::NodeInfoLogs,
    StdoutStrategy::NonErrorLogs,
];

impl StdoutStrategy {
    pub fn apply(&self, source: &OutputSource<'_>) -> Option<String> {
        match self {
            Self::RawString => match source.payload {
                OutputPayload::RawString(s) => non_empty(s),
                _ => None,
            },
            Self::DirectStdout => source.payload.fields().and_then(|f| text_field(f, "stdout")),
            Self::ResultsStdout => {
                join_results(source.payload.results()?, |entry| text_field(entry, "stdout"))
            }
            Self::ResultsResult => join_results(source.payload.results()?, |entry| {
                entry.get("result").and_then(coerce)
            }),
            Self::DirectResult => source.payload.fields()?.get("result").and_then(coerce),
            Self::NodeInfoLogs => join_logs(source.logs, |e| {
                e.level == LogLevel::Info && e.node_id.is_some()
            }),
            Self::NonErrorLogs => join_logs(source.logs, |e| e.level != LogLevel::Error),
        }
    }
}

/// One way of reading stderr, tried in [`STDERR_STRATEGIES`] order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrStrategy {
    DirectStderr,
    ResultsStderr,
    ErrorMessage,
    ErrorLogs,
}

pub const STDERR_STRATEGIES: &[StderrStrategy] = &[
    StderrStrategy::DirectStderr,
    StderrStrategy::ResultsStderr,
    StderrStrategy::ErrorMessage,
    StderrStrategy::ErrorLogs,
];

impl StderrStrategy {
    pub fn apply(&self, source: &OutputSource<'_>) -> Option<String> {
        match self {
            Self::DirectStderr => source.payload.fields().and_then(|f| text_field(f, "stderr")),
            Self::ResultsStderr => {
                join_results(source.payload.results()?, |entry| text_field(entry, "stderr"))
            }
            Self::ErrorMessage => source.error_message.and_then(non_empty),
            Self::ErrorLogs => join_logs(source.logs, |e| e.level == LogLevel::Error),
        }
    }
}

/// Canonical stdout for a run; never empty
pub fn extract_stdout(record: Option<&ExecutionRecord>, logs: &[LogEntry]) -> String {
    let source = OutputSource::new(record, logs);
    STDOUT_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.apply(&source))
        .unwrap_or_else(|| markers::NO_OUTPUT.to_string())
}

/// Canonical stderr for a run; never empty
pub fn extract_stderr(record: Option<&ExecutionRecord>, logs: &[LogEntry]) -> String {
    let source = OutputSource::new(record, logs);
    STDERR_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.apply(&source))
        .unwrap_or_else(|| markers::NO_ERRORS.to_string())
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).and_then(non_empty)
}

/// Strings as-is, other non-null values as compact JSON
fn coerce(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => non_empty(s),
        other => Some(other.to_string()),
    }
}

fn join_results<F>(results: &Map<String, Value>, pick: F) -> Option<String>
where
    F: Fn(&Map<String, Value>) -> Option<String>,
{
    let parts: Vec<String> = results
        .values()
        .filter_map(Value::as_object)
        .filter_map(pick)
        .collect();
    (!parts.is_empty()).then(|| parts.join("\n"))
}

fn join_logs<F>(logs: &[LogEntry], keep: F) -> Option<String>
where
    F: Fn(&LogEntry) -> bool,
{
    let lines: Vec<&str> = logs
        .iter()
        .filter(|e| keep(e))
        .map(|e| e.message.as_str())
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}
