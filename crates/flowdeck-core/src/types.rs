//! Core types for step sequences and the persisted workflow format
//!
//! A workflow being edited is an ordered list of steps. It is persisted as
//! a graph of nodes and edges, which for this model is always a linear
//! chain.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique identifier for a step
pub type StepId = String;

/// Step configuration payload
pub type StepConfig = Map<String, Value>;

/// One ordered unit of a workflow being authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: StepId,
    /// Built-in type tag or dynamic definition id
    pub type_tag: String,
    /// Display label, also the source of the step's variable slug
    pub label: String,
    /// Position in the sequence; `0..N-1` once a mutation settles
    pub order: usize,
    #[serde(default)]
    pub config: StepConfig,
}

impl Step {
    /// Create a step with an explicit id (hydration, tests)
    pub fn new(
        id: impl Into<String>,
        type_tag: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
            label: label.into(),
            order: 0,
            config: StepConfig::new(),
        }
    }

    /// Set the configuration payload
    pub fn with_config(mut self, config: StepConfig) -> Self {
        self.config = config;
        self
    }
}

/// What the user picked from the palette when adding a step
#[derive(Debug, Clone, PartialEq)]
pub struct StepTemplate {
    pub type_tag: String,
    /// Label override; defaults to the type's display label
    pub label: Option<String>,
    /// Merged over the type's default configuration
    pub config: Option<StepConfig>,
}

impl StepTemplate {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            label: None,
            config: None,
        }
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_config(mut self, config: StepConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Cosmetic canvas position of a persisted node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node of the persisted workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: StepId,
    /// Step type tag
    #[serde(rename = "type")]
    pub node_type: String,
    /// `{ label, config }`
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub position: Position,
}

/// An edge connecting two consecutive steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: StepId,
    pub target: StepId,
}

/// Persisted workflow format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl WorkflowGraph {
    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Get the edges going out of a node
    pub fn outgoing_edges<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Get the edges coming into a node
    pub fn incoming_edges<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }
}
