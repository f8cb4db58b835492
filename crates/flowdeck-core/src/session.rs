//! Editor session
//!
//! Composition root for one authenticated editing session: owns the node
//! registry and the sequence of the workflow being edited. Loss of the
//! session clears the registry so no stale dynamic type stays selectable.

use std::sync::Arc;

use crate::error::Result;
use crate::registry::NodeRegistry;
use crate::sequence::StepSequence;
use crate::source::DescriptorSource;
use crate::types::WorkflowGraph;
use crate::validation::{self, ValidationIssue};
use crate::variables::{VariableContext, VariableScope};

pub struct EditorSession {
    registry: Arc<NodeRegistry>,
    sequence: StepSequence,
}

impl EditorSession {
    pub fn new(source: Arc<dyn DescriptorSource>) -> Self {
        let registry = Arc::new(NodeRegistry::new(source));
        Self {
            sequence: StepSequence::new(registry.clone()),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn sequence(&self) -> &StepSequence {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut StepSequence {
        &mut self.sequence
    }

    /// Refresh the registry from its source
    ///
    /// A session-loss failure ends the session before the error is
    /// returned; any other failure leaves everything as it was.
    pub async fn sync_registry(&mut self) -> Result<usize> {
        match self.registry.sync().await {
            Ok(count) => Ok(count),
            Err(e) => {
                if e.transport().is_some_and(|t| t.is_session_loss()) {
                    log::warn!("Session lost during registry sync");
                    self.end_session();
                }
                Err(e)
            }
        }
    }

    /// Load a persisted workflow for editing
    ///
    /// Structural problems are returned but do not prevent loading.
    pub fn open_workflow(&mut self, graph: &WorkflowGraph) -> Vec<ValidationIssue> {
        let issues = validation::validate_graph(graph);
        for issue in &issues {
            log::warn!("Opening workflow: {}", issue);
        }
        self.sequence.load_graph(graph);
        issues
    }

    /// Start an empty workflow
    pub fn new_workflow(&mut self) {
        self.sequence.replace_all(Vec::new());
    }

    /// Persisted form of the workflow being edited
    pub fn save_graph(&self) -> WorkflowGraph {
        self.sequence.to_persistable_graph()
    }

    /// Variables available to the step at `cursor`
    pub fn variables(&self, cursor: usize, filter: Option<&str>) -> Vec<VariableScope> {
        VariableContext::new(self.sequence.steps()).resolve(cursor, filter)
    }

    /// Advisory issues for the workflow being edited
    pub fn validate(&self) -> Vec<ValidationIssue> {
        validation::validate_sequence(self.sequence.steps(), &self.registry)
    }

    /// Drop everything tied to the authenticated session
    pub fn end_session(&mut self) {
        log::info!("Ending editor session");
        self.registry.clear();
        self.sequence.replace_all(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FlowError, TransportError};
    use crate::source::StaticDescriptorSource;
    use crate::types::StepTemplate;
    use serde_json::json;

    fn session() -> (EditorSession, Arc<StaticDescriptorSource>) {
        let source = Arc::new(StaticDescriptorSource::new(vec![json!({
            "id": "sentiment",
            "name": "Sentiment",
            "category": "ai"
        })]));
        (EditorSession::new(source.clone()), source)
    }

    #[tokio::test]
    async fn test_open_edit_save() {
        let (mut session, _source) = session();
        tokio_test::assert_ok!(session.sync_registry().await);

        let sequence = session.sequence_mut();
        sequence.insert(StepTemplate::new("script").labeled("Fetch"), None);
        sequence.insert(StepTemplate::new("sentiment"), None);

        let graph = session.save_graph();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);

        session.new_workflow();
        assert!(session.sequence().is_empty());

        assert!(session.open_workflow(&graph).is_empty());
        assert_eq!(session.sequence().len(), 2);
        assert_eq!(session.sequence().steps()[1].label, "Sentiment");
        assert!(session.validate().is_empty());

        let scopes = session.variables(1, None);
        assert!(scopes.iter().any(|s| s.name == "steps.fetch"));
    }

    #[tokio::test]
    async fn test_unauthorized_sync_ends_session() {
        let (mut session, source) = session();
        session.sync_registry().await.unwrap();
        session
            .sequence_mut()
            .insert(StepTemplate::new("sentiment"), None);

        source.fail_with(Some(TransportError::Unauthorized));
        let err = session.sync_registry().await.unwrap_err();

        assert!(matches!(err, FlowError::RegistryFetch(TransportError::Unauthorized)));
        assert!(session.registry().is_empty());
        assert!(session.sequence().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure_keeps_session() {
        let (mut session, source) = session();
        session.sync_registry().await.unwrap();
        session
            .sequence_mut()
            .insert(StepTemplate::new("sentiment"), None);

        source.fail_with(Some(TransportError::Timeout));
        tokio_test::assert_err!(session.sync_registry().await);

        assert!(session.registry().contains("sentiment"));
        assert_eq!(session.sequence().len(), 1);
    }
}
