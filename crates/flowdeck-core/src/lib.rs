//! Flowdeck Core - Client-side authoring and tracking for step workflows
//!
//! This crate holds the state of a workflow editor that talks to a
//! separate execution backend. It never runs step logic itself. It
//! provides:
//!
//! - A registry of dynamically discovered step types, compiled from
//!   schema-based descriptors
//! - An ordered step sequence with a linear-chain persisted form
//! - Variable scopes available to each step position
//! - An execution tracker that polls a run to a terminal state and
//!   normalizes its output
//!
//! # Architecture
//!
//! External services sit behind async traits so the core stays transport
//! agnostic:
//!
//! - `DescriptorSource`: supplies node descriptors to the `NodeRegistry`
//! - `ExecutionApi`: record, logs and cancel calls for the `ExecutionTracker`
//! - `EventSink`: receives tracker progress events
//!
//! `EditorSession` ties the registry and the sequence together for one
//! authenticated session.
//!
//! # Example
//!
//! ```ignore
//! use flowdeck_core::{EditorSession, StepTemplate, StaticDescriptorSource};
//!
//! let mut session = EditorSession::new(Arc::new(StaticDescriptorSource::default()));
//! session.sync_registry().await?;
//! session.sequence_mut().insert(StepTemplate::new("script").labeled("Fetch"), None);
//! let graph = session.save_graph();
//! ```

pub mod compiler;
pub mod config;
pub mod constants;
pub mod definition;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod execution;
pub mod registry;
pub mod sequence;
pub mod session;
pub mod source;
pub mod step_types;
pub mod types;
pub mod validation;
pub mod variables;

// Re-export key types
pub use config::TrackerConfig;
pub use definition::{
    FieldSpec, FieldWidget, NodeDefinition, ParameterKind, ParameterSpec, StyleHint,
};
pub use descriptor::NodeDescriptor;
pub use error::{FlowError, Result, TransportError};
pub use events::{EventError, EventSink, NullEventSink, TrackerEvent, VecEventSink};
pub use execution::{
    ExecutionApi, ExecutionRecord, ExecutionStatus, ExecutionTracker, LogEntry, LogLevel,
    PollHandle, TrackerPhase, TrackerSnapshot,
};
pub use registry::{ListenerError, NodeRegistry, RegistryListener, SubscriptionId};
pub use sequence::StepSequence;
pub use session::EditorSession;
pub use source::{DescriptorSource, StaticDescriptorSource};
pub use step_types::{BuiltinStepType, StepDisplay};
pub use types::{
    GraphEdge, GraphNode, Position, Step, StepConfig, StepId, StepTemplate, WorkflowGraph,
};
pub use validation::{ValidationIssue, validate_graph, validate_sequence};
pub use variables::{VariableBinding, VariableContext, VariableScope};
