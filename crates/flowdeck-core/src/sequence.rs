//! Ordered step sequence for the workflow being edited
//!
//! All structural mutations renumber `order` afterwards, so after any call
//! returns the steps carry exactly `0..N-1` in list order. Lookups and
//! mutations addressed by an unknown id are no-ops reported through the
//! return value, never errors.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::constants::layout;
use crate::registry::NodeRegistry;
use crate::step_types::{self, StepDisplay};
use crate::types::{GraphEdge, GraphNode, Position, Step, StepConfig, StepTemplate, WorkflowGraph};

/// The ordered list of steps for one workflow
pub struct StepSequence {
    registry: Arc<NodeRegistry>,
    steps: Vec<Step>,
}

impl StepSequence {
    /// Create an empty sequence resolving dynamic types through `registry`
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            steps: Vec::new(),
        }
    }

    /// Create a sequence hydrated from a persisted workflow
    pub fn from_graph(registry: Arc<NodeRegistry>, graph: &WorkflowGraph) -> Self {
        let mut sequence = Self::new(registry);
        sequence.load_graph(graph);
        sequence
    }

    /// Steps in order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// An empty sequence is valid; the editor shows its empty state
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Find a step by ID
    pub fn get(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Current index of a step
    pub fn index_of(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    /// Replace every step (switching workflows); list order becomes `order`
    ///
    /// Later duplicates of an id are dropped so ids stay unique.
    pub fn replace_all(&mut self, steps: Vec<Step>) {
        let mut seen = HashSet::new();
        self.steps = steps
            .into_iter()
            .filter(|step| {
                let fresh = seen.insert(step.id.clone());
                if !fresh {
                    log::warn!("Dropping duplicate step id '{}' during replace", step.id);
                }
                fresh
            })
            .collect();
        self.renumber();
    }

    /// Create a step from a palette template
    ///
    /// Appends when `at_index` is `None` or past the end. The step gets a
    /// fresh id and its type's default configuration, with any template
    /// config merged on top.
    pub fn insert(&mut self, template: StepTemplate, at_index: Option<usize>) -> &Step {
        let mut config = step_types::default_config(&template.type_tag, &self.registry);
        if let Some(overrides) = template.config {
            config.extend(overrides);
        }

        let label = template
            .label
            .unwrap_or_else(|| step_types::describe(&template.type_tag, &self.registry).label);

        let step = Step {
            id: format!("step-{}", uuid::Uuid::new_v4()),
            type_tag: template.type_tag,
            label,
            order: 0,
            config,
        };

        let index = at_index.unwrap_or(self.steps.len()).min(self.steps.len());
        log::debug!("Inserting {} step '{}' at {}", step.type_tag, step.id, index);
        self.steps.insert(index, step);
        self.renumber();
        &self.steps[index]
    }

    /// Move a step to `target_index` (drag-and-drop); clamps past the end
    pub fn move_to(&mut self, step_id: &str, target_index: usize) -> bool {
        let Some(current) = self.index_of(step_id) else {
            return false;
        };

        let step = self.steps.remove(current);
        let target = target_index.min(self.steps.len());
        self.steps.insert(target, step);
        self.renumber();
        true
    }

    /// Delete a step; returns whether it existed
    pub fn remove(&mut self, step_id: &str) -> bool {
        let Some(index) = self.index_of(step_id) else {
            return false;
        };

        self.steps.remove(index);
        self.renumber();
        true
    }

    /// Shallow-merge `partial` into a step's config; order is unchanged
    pub fn update(&mut self, step_id: &str, partial: StepConfig) -> bool {
        match self.steps.iter_mut().find(|s| s.id == step_id) {
            Some(step) => {
                step.config.extend(partial);
                true
            }
            None => false,
        }
    }

    /// Change a step's display label
    pub fn rename(&mut self, step_id: &str, label: impl Into<String>) -> bool {
        match self.steps.iter_mut().find(|s| s.id == step_id) {
            Some(step) => {
                step.label = label.into();
                true
            }
            None => false,
        }
    }

    /// Display metadata for a step's type
    pub fn display(&self, step_id: &str) -> Option<StepDisplay> {
        self.get(step_id)
            .map(|step| step_types::describe(&step.type_tag, &self.registry))
    }

    /// Persisted form: N nodes chained by N-1 edges
    pub fn to_persistable_graph(&self) -> WorkflowGraph {
        let nodes = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| GraphNode {
                id: step.id.clone(),
                node_type: step.type_tag.clone(),
                data: json!({
                    "label": step.label,
                    "config": step.config,
                }),
                position: Position {
                    x: layout::STEP_X,
                    y: index as f64 * layout::STEP_SPACING_Y,
                },
            })
            .collect();

        let edges = self
            .steps
            .windows(2)
            .map(|pair| GraphEdge {
                id: format!("e-{}-{}", pair[0].id, pair[1].id),
                source: pair[0].id.clone(),
                target: pair[1].id.clone(),
            })
            .collect();

        WorkflowGraph { nodes, edges }
    }

    /// Replace the sequence with the steps of a persisted workflow
    pub fn load_graph(&mut self, graph: &WorkflowGraph) {
        let steps = self.steps_from_graph(graph);
        log::debug!("Hydrated {} steps from persisted graph", steps.len());
        self.replace_all(steps);
    }

    /// Recover step order from a persisted graph
    ///
    /// Follows the edge chain from its head; graphs whose edges do not form
    /// one chain over every node fall back to vertical position.
    fn steps_from_graph(&self, graph: &WorkflowGraph) -> Vec<Step> {
        let ordered = chain_order(graph).unwrap_or_else(|| position_order(graph));

        ordered
            .into_iter()
            .map(|node| {
                let label = node
                    .data
                    .get("label")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| step_types::describe(&node.node_type, &self.registry).label);
                let config = node
                    .data
                    .get("config")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();

                Step::new(node.id.clone(), node.node_type.clone(), label).with_config(config)
            })
            .collect()
    }

    fn renumber(&mut self) {
        for (index, step) in self.steps.iter_mut().enumerate() {
            step.order = index;
        }
    }
}

fn chain_order(graph: &WorkflowGraph) -> Option<Vec<&GraphNode>> {
    let mut heads = graph
        .nodes
        .iter()
        .filter(|n| graph.incoming_edges(&n.id).next().is_none());
    let head = heads.next()?;
    if heads.next().is_some() {
        return None;
    }

    let mut visited = HashSet::new();
    let mut ordered = Vec::with_capacity(graph.nodes.len());
    let mut current = head;
    loop {
        visited.insert(current.id.as_str());
        ordered.push(current);

        let next = graph
            .outgoing_edges(&current.id)
            .filter_map(|e| graph.find_node(&e.target))
            .find(|n| !visited.contains(n.id.as_str()));
        match next {
            Some(node) => current = node,
            None => break,
        }
    }

    (ordered.len() == graph.nodes.len()).then_some(ordered)
}

fn position_order(graph: &WorkflowGraph) -> Vec<&GraphNode> {
    let mut nodes: Vec<&GraphNode> = graph.nodes.iter().collect();
    nodes.sort_by(|a, b| {
        a.position
            .y
            .partial_cmp(&b.position.y)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticDescriptorSource;

    fn sequence() -> StepSequence {
        StepSequence::new(Arc::new(NodeRegistry::new(Arc::new(
            StaticDescriptorSource::default(),
        ))))
    }

    fn assert_ordered(seq: &StepSequence) {
        let ids: HashSet<_> = seq.steps().iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids.len(), seq.len(), "step ids must be unique");
        for (index, step) in seq.steps().iter().enumerate() {
            assert_eq!(step.order, index);
        }
    }

    fn labels(seq: &StepSequence) -> Vec<&str> {
        seq.steps().iter().map(|s| s.label.as_str()).collect()
    }

    #[test]
    fn test_insert_applies_type_defaults() {
        let mut seq = sequence();
        let step = seq.insert(StepTemplate::new("script"), None);

        assert!(step.id.starts_with("step-"));
        assert_eq!(step.label, "Script");
        assert_eq!(step.config["scriptType"], "javascript");
        assert_eq!(step.config["timeout"], 30);
        assert_eq!(step.config["onError"], "stop");
    }

    #[test]
    fn test_insert_template_config_overrides_defaults() {
        let mut seq = sequence();
        let mut overrides = StepConfig::new();
        overrides.insert("timeout".to_string(), json!(90));

        let step = seq.insert(StepTemplate::new("script").with_config(overrides), None);
        assert_eq!(step.config["timeout"], 90);
        assert_eq!(step.config["scriptType"], "javascript");
    }

    #[test]
    fn test_insert_at_index_shifts_following_steps() {
        let mut seq = sequence();
        seq.insert(StepTemplate::new("script").labeled("A"), None);
        seq.insert(StepTemplate::new("script").labeled("C"), None);
        seq.insert(StepTemplate::new("delay").labeled("B"), Some(1));
        seq.insert(StepTemplate::new("delay").labeled("D"), Some(99));

        assert_eq!(labels(&seq), vec!["A", "B", "C", "D"]);
        assert_ordered(&seq);
    }

    #[test]
    fn test_move_to_reorders_and_clamps() {
        let mut seq = sequence();
        let a = seq.insert(StepTemplate::new("script").labeled("A"), None).id.clone();
        seq.insert(StepTemplate::new("script").labeled("B"), None);
        let c = seq.insert(StepTemplate::new("script").labeled("C"), None).id.clone();

        assert!(seq.move_to(&c, 0));
        assert_eq!(labels(&seq), vec!["C", "A", "B"]);

        assert!(seq.move_to(&a, 42));
        assert_eq!(labels(&seq), vec!["C", "B", "A"]);
        assert_ordered(&seq);

        assert!(!seq.move_to("ghost", 0));
    }

    #[test]
    fn test_remove_is_noop_for_unknown_id() {
        let mut seq = sequence();
        let a = seq.insert(StepTemplate::new("script").labeled("A"), None).id.clone();
        seq.insert(StepTemplate::new("script").labeled("B"), None);

        assert!(!seq.remove("ghost"));
        assert_eq!(seq.len(), 2);

        assert!(seq.remove(&a));
        assert_eq!(labels(&seq), vec!["B"]);
        assert_ordered(&seq);
    }

    #[test]
    fn test_update_merges_shallowly() {
        let mut seq = sequence();
        let id = seq.insert(StepTemplate::new("http_request"), None).id.clone();

        let mut partial = StepConfig::new();
        partial.insert("url".to_string(), json!("https://example.com"));
        partial.insert("headers".to_string(), json!({"X-Trace": "1"}));
        partial.insert("retries".to_string(), json!(true));
        assert!(seq.update(&id, partial));

        let step = seq.get(&id).unwrap();
        assert_eq!(step.config["url"], "https://example.com");
        assert_eq!(step.config["method"], "GET");
        assert_eq!(step.config["headers"], json!({"X-Trace": "1"}));
        assert_eq!(step.order, 0);

        assert!(!seq.update("ghost", StepConfig::new()));
    }

    #[test]
    fn test_random_mutations_keep_order_invariant() {
        let mut seq = sequence();
        let mut state: u64 = 0x5eed;
        let mut next = move |bound: usize| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) as usize) % bound.max(1)
        };

        for _ in 0..500 {
            match next(3) {
                0 => {
                    let at = next(3);
                    let index = if at == 0 { None } else { Some(next(seq.len() + 3)) };
                    seq.insert(StepTemplate::new("script"), index);
                }
                1 if !seq.is_empty() => {
                    let id = seq.steps()[next(seq.len())].id.clone();
                    seq.remove(&id);
                }
                _ if !seq.is_empty() => {
                    let id = seq.steps()[next(seq.len())].id.clone();
                    let target = next(seq.len() + 3);
                    seq.move_to(&id, target);
                }
                _ => {}
            }
            assert_ordered(&seq);
        }
    }

    #[test]
    fn test_replace_all_renumbers_and_dedupes() {
        let mut seq = sequence();
        let mut stray = Step::new("b", "delay", "B");
        stray.order = 7;

        seq.replace_all(vec![
            Step::new("a", "script", "A"),
            stray,
            Step::new("a", "script", "Again"),
        ]);

        assert_eq!(labels(&seq), vec!["A", "B"]);
        assert_ordered(&seq);
    }

    #[test]
    fn test_persistable_graph_is_linear_chain() {
        let mut seq = sequence();
        seq.replace_all(vec![
            Step::new("s1", "script", "Fetch"),
            Step::new("s2", "transform", "Parse"),
            Step::new("s3", "delay", "Wait"),
        ]);

        let graph = seq.to_persistable_graph();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!((graph.edges[0].source.as_str(), graph.edges[0].target.as_str()), ("s1", "s2"));
        assert_eq!((graph.edges[1].source.as_str(), graph.edges[1].target.as_str()), ("s2", "s3"));
        assert_eq!(graph.nodes[2].position.y, 2.0 * layout::STEP_SPACING_Y);
        assert_eq!(graph.nodes[0].data["label"], "Fetch");

        seq.replace_all(Vec::new());
        let empty = seq.to_persistable_graph();
        assert!(empty.nodes.is_empty());
        assert!(empty.edges.is_empty());
    }

    #[test]
    fn test_load_graph_follows_edge_chain() {
        let mut seq = sequence();
        seq.replace_all(vec![
            Step::new("s1", "script", "Fetch"),
            Step::new("s2", "transform", "Parse"),
            Step::new("s3", "delay", "Wait"),
        ]);
        let mut graph = seq.to_persistable_graph();
        graph.nodes.reverse();

        let mut restored = sequence();
        restored.load_graph(&graph);
        assert_eq!(labels(&restored), vec!["Fetch", "Parse", "Wait"]);
        assert_eq!(restored.get("s2").unwrap().type_tag, "transform");
        assert_ordered(&restored);
    }

    #[test]
    fn test_load_graph_falls_back_to_position() {
        let graph: WorkflowGraph = serde_json::from_value(json!({
            "nodes": [
                {"id": "late", "type": "delay", "data": {}, "position": {"x": 0, "y": 240}},
                {
                    "id": "early",
                    "type": "script",
                    "data": {"label": "First", "config": {"timeout": 5}},
                    "position": {"x": 0, "y": 0}
                }
            ],
            "edges": []
        }))
        .unwrap();

        let mut seq = sequence();
        seq.load_graph(&graph);

        assert_eq!(labels(&seq), vec!["First", "Delay"]);
        assert_eq!(seq.get("early").unwrap().config["timeout"], 5);
    }

    #[test]
    fn test_display_for_step() {
        let mut seq = sequence();
        let id = seq.insert(StepTemplate::new("http_request"), None).id.clone();

        assert_eq!(seq.display(&id).unwrap().icon, "globe");
        assert!(seq.display("ghost").is_none());
    }
}
