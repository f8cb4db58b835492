//! Advisory validation for step sequences and persisted graphs
//!
//! Nothing here blocks editing or saving; issues are surfaced to the user.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::registry::NodeRegistry;
use crate::step_types::BuiltinStepType;
use crate::types::{Step, WorkflowGraph};
use crate::variables::slugify;

/// Validation issue with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Step type is neither built-in nor registered
    UnknownStepType { step_id: String, type_tag: String },
    /// A required parameter of a dynamic type is absent or empty
    MissingRequiredParameter { step_id: String, parameter: String },
    /// Several steps publish their result under the same slug
    DuplicateSlug { slug: String, step_ids: Vec<String> },
    /// An edge references a node that does not exist
    UnknownNode { edge_id: String, node_id: String },
    /// A node has more than one incoming or outgoing edge
    BranchingNode { node_id: String },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStepType { step_id, type_tag } => {
                write!(f, "Unknown step type '{}' for step '{}'", type_tag, step_id)
            }
            Self::MissingRequiredParameter { step_id, parameter } => {
                write!(
                    f,
                    "Required parameter '{}' on step '{}' is not set",
                    parameter, step_id
                )
            }
            Self::DuplicateSlug { slug, step_ids } => {
                write!(
                    f,
                    "Steps {} all publish as 'steps.{}'",
                    step_ids.join(", "),
                    slug
                )
            }
            Self::UnknownNode { edge_id, node_id } => {
                write!(f, "Edge '{}' references unknown node '{}'", edge_id, node_id)
            }
            Self::BranchingNode { node_id } => {
                write!(f, "Node '{}' branches; only linear chains are supported", node_id)
            }
        }
    }
}

impl std::error::Error for ValidationIssue {}

/// Validate a step list against the registry
///
/// Returns all issues found (not just the first).
pub fn validate_sequence(steps: &[Step], registry: &NodeRegistry) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    validate_step_types(steps, registry, &mut issues);
    detect_duplicate_slugs(steps, &mut issues);

    issues
}

/// Validate the structure of a persisted graph before hydration
pub fn validate_graph(graph: &WorkflowGraph) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

    for edge in &graph.edges {
        for node_id in [&edge.source, &edge.target] {
            if !node_ids.contains(node_id.as_str()) {
                issues.push(ValidationIssue::UnknownNode {
                    edge_id: edge.id.clone(),
                    node_id: node_id.clone(),
                });
            }
        }
    }

    for node in &graph.nodes {
        if graph.outgoing_edges(&node.id).count() > 1
            || graph.incoming_edges(&node.id).count() > 1
        {
            issues.push(ValidationIssue::BranchingNode {
                node_id: node.id.clone(),
            });
        }
    }

    issues
}

fn validate_step_types(steps: &[Step], registry: &NodeRegistry, issues: &mut Vec<ValidationIssue>) {
    for step in steps {
        if BuiltinStepType::from_tag(&step.type_tag).is_some() {
            continue;
        }

        let Some(definition) = registry.get(&step.type_tag) else {
            issues.push(ValidationIssue::UnknownStepType {
                step_id: step.id.clone(),
                type_tag: step.type_tag.clone(),
            });
            continue;
        };

        for param in definition.inputs.iter().filter(|p| p.required) {
            let missing = match step.config.get(&param.name) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            };
            if missing {
                issues.push(ValidationIssue::MissingRequiredParameter {
                    step_id: step.id.clone(),
                    parameter: param.name.clone(),
                });
            }
        }
    }
}

fn detect_duplicate_slugs(steps: &[Step], issues: &mut Vec<ValidationIssue>) {
    let mut by_slug: HashMap<String, Vec<String>> = HashMap::new();
    let mut first_seen = Vec::new();
    for step in steps {
        let slug = slugify(&step.label);
        let ids = by_slug.entry(slug.clone()).or_default();
        if ids.is_empty() {
            first_seen.push(slug);
        }
        ids.push(step.id.clone());
    }

    for slug in first_seen {
        if let Some(step_ids) = by_slug.remove(&slug) {
            if step_ids.len() > 1 {
                issues.push(ValidationIssue::DuplicateSlug { slug, step_ids });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticDescriptorSource;
    use crate::types::{GraphEdge, StepConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> NodeRegistry {
        let registry = NodeRegistry::new(Arc::new(StaticDescriptorSource::default()));
        registry
            .register_value(&json!({
                "id": "translate",
                "inputSchema": {
                    "properties": {"text": {"type": "string"}, "lang": {"type": "string"}},
                    "required": ["text", "lang"]
                }
            }))
            .unwrap();
        registry
    }

    #[test]
    fn test_valid_sequence() {
        let mut config = StepConfig::new();
        config.insert("text".to_string(), json!("{{input.body}}"));
        config.insert("lang".to_string(), json!("de"));

        let steps = vec![
            Step::new("a", "script", "Fetch"),
            Step::new("b", "translate", "Translate").with_config(config),
        ];
        assert!(validate_sequence(&steps, &registry()).is_empty());
    }

    #[test]
    fn test_unknown_type_and_missing_parameters() {
        let mut config = StepConfig::new();
        config.insert("text".to_string(), json!("  "));

        let steps = vec![
            Step::new("a", "vanished", "Old"),
            Step::new("b", "translate", "Translate").with_config(config),
        ];
        let issues = validate_sequence(&steps, &registry());

        assert_eq!(
            issues,
            vec![
                ValidationIssue::UnknownStepType {
                    step_id: "a".to_string(),
                    type_tag: "vanished".to_string()
                },
                ValidationIssue::MissingRequiredParameter {
                    step_id: "b".to_string(),
                    parameter: "text".to_string()
                },
                ValidationIssue::MissingRequiredParameter {
                    step_id: "b".to_string(),
                    parameter: "lang".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_duplicate_slugs_reported() {
        let steps = vec![
            Step::new("a", "script", "Process"),
            Step::new("b", "delay", "Wait"),
            Step::new("c", "script", "process"),
        ];
        let issues = validate_sequence(&steps, &registry());

        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0],
            ValidationIssue::DuplicateSlug {
                slug: "process".to_string(),
                step_ids: vec!["a".to_string(), "c".to_string()]
            }
        );
        assert!(issues[0].to_string().contains("steps.process"));
    }

    #[test]
    fn test_graph_structure_issues() {
        let mut graph: WorkflowGraph = serde_json::from_value(json!({
            "nodes": [
                {"id": "a", "type": "script"},
                {"id": "b", "type": "script"},
                {"id": "c", "type": "script"}
            ],
            "edges": [
                {"id": "e1", "source": "a", "target": "b"},
                {"id": "e2", "source": "a", "target": "c"}
            ]
        }))
        .unwrap();

        assert_eq!(
            validate_graph(&graph),
            vec![ValidationIssue::BranchingNode {
                node_id: "a".to_string()
            }]
        );

        graph.edges = vec![GraphEdge {
            id: "e3".to_string(),
            source: "a".to_string(),
            target: "ghost".to_string(),
        }];
        assert_eq!(
            validate_graph(&graph),
            vec![ValidationIssue::UnknownNode {
                edge_id: "e3".to_string(),
                node_id: "ghost".to_string()
            }]
        );
    }
}
