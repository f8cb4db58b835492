//! Node descriptor registry
//!
//! Single source of truth for dynamically discovered step types. The
//! registry is an explicit service instance: the composition root creates
//! it with a [`DescriptorSource`] and hands `Arc<NodeRegistry>` to every
//! consumer.
//!
//! # Usage
//!
//! ```ignore
//! use flowdeck_core::{NodeRegistry, StaticDescriptorSource};
//!
//! let registry = Arc::new(NodeRegistry::new(Arc::new(source)));
//! let subscription = registry.subscribe(Arc::new(|defs: &[Arc<NodeDefinition>]| {
//!     println!("{} node types available", defs.len());
//!     Ok(())
//! }));
//! registry.sync().await?;
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::compiler;
use crate::definition::NodeDefinition;
use crate::descriptor::NodeDescriptor;
use crate::error::{FlowError, Result};
use crate::source::DescriptorSource;

/// Observer notified with the full definition list after every change
///
/// Implemented for any `Fn(&[Arc<NodeDefinition>]) -> Result<(), ListenerError>`.
pub trait RegistryListener: Send + Sync {
    fn definitions_changed(
        &self,
        definitions: &[Arc<NodeDefinition>],
    ) -> std::result::Result<(), ListenerError>;
}

impl<F> RegistryListener for F
where
    F: Fn(&[Arc<NodeDefinition>]) -> std::result::Result<(), ListenerError> + Send + Sync,
{
    fn definitions_changed(
        &self,
        definitions: &[Arc<NodeDefinition>],
    ) -> std::result::Result<(), ListenerError> {
        self(definitions)
    }
}

/// Error reported by a listener; logged and otherwise ignored
#[derive(Debug, Clone)]
pub struct ListenerError {
    pub message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Listener error: {}", self.message)
    }
}

impl std::error::Error for ListenerError {}

/// Handle returned by [`NodeRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registry of compiled node definitions
pub struct NodeRegistry {
    source: Arc<dyn DescriptorSource>,
    definitions: RwLock<IndexMap<String, Arc<NodeDefinition>>>,
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn RegistryListener>)>>,
    next_subscription: AtomicU64,
    /// Bumped by every sync request and by `clear`; only the latest sync may apply
    generation: AtomicU64,
}

impl NodeRegistry {
    /// Create an empty registry backed by `source`
    pub fn new(source: Arc<dyn DescriptorSource>) -> Self {
        Self {
            source,
            definitions: RwLock::new(IndexMap::new()),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            generation: AtomicU64::new(0),
        }
    }

    /// Fetch every descriptor and atomically replace the definition map
    ///
    /// On fetch failure the previous map is kept and no listener fires.
    /// A sync that is overtaken by a newer `sync` (or a `clear`) while its
    /// fetch is in flight discards its result and returns
    /// [`FlowError::SyncSuperseded`]. Returns the number of definitions.
    pub async fn sync(&self) -> Result<usize> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let raw = self.source.fetch_descriptors().await.map_err(|e| {
            log::warn!("Node descriptor fetch failed: {}", e);
            FlowError::RegistryFetch(e)
        })?;

        let compiled = compile_all(&raw);
        let count = compiled.len();
        {
            let mut definitions = self.definitions.write();
            if self.generation.load(Ordering::SeqCst) != generation {
                log::debug!("Discarding superseded registry sync (generation {})", generation);
                return Err(FlowError::SyncSuperseded);
            }
            *definitions = compiled;
        }

        log::info!("Registry synced: {} node definitions", count);
        self.notify();
        Ok(count)
    }

    /// Compile and upsert a single locally known descriptor
    pub fn register(&self, descriptor: &NodeDescriptor) -> Arc<NodeDefinition> {
        let definition = Arc::new(compiler::compile(descriptor));
        self.definitions
            .write()
            .insert(definition.definition_id.clone(), definition.clone());

        log::debug!("Registered node definition '{}'", definition.definition_id);
        self.notify();
        definition
    }

    /// Parse, compile and upsert an untyped descriptor
    pub fn register_value(&self, value: &Value) -> Result<Arc<NodeDefinition>> {
        let descriptor = NodeDescriptor::parse(value)?;
        Ok(self.register(&descriptor))
    }

    /// Remove a definition; returns whether anything was removed
    pub fn remove(&self, definition_id: &str) -> bool {
        let removed = self
            .definitions
            .write()
            .shift_remove(definition_id)
            .is_some();

        if removed {
            log::debug!("Removed node definition '{}'", definition_id);
            self.notify();
        }
        removed
    }

    /// Drop every definition (session ended) and supersede in-flight syncs
    pub fn clear(&self) {
        {
            let mut definitions = self.definitions.write();
            self.generation.fetch_add(1, Ordering::SeqCst);
            definitions.clear();
        }

        log::info!("Registry cleared");
        self.notify();
    }

    /// Look up a definition by id
    pub fn get(&self, definition_id: &str) -> Option<Arc<NodeDefinition>> {
        self.definitions.read().get(definition_id).cloned()
    }

    /// Check if a definition id is registered
    pub fn contains(&self, definition_id: &str) -> bool {
        self.definitions.read().contains_key(definition_id)
    }

    /// All definitions in insertion order
    pub fn list_all(&self) -> Vec<Arc<NodeDefinition>> {
        self.definitions.read().values().cloned().collect()
    }

    /// Definitions grouped by category, categories in first-seen order
    pub fn list_by_category(&self) -> IndexMap<String, Vec<Arc<NodeDefinition>>> {
        let mut grouped: IndexMap<String, Vec<Arc<NodeDefinition>>> = IndexMap::new();
        for definition in self.definitions.read().values() {
            grouped
                .entry(definition.category.clone())
                .or_default()
                .push(definition.clone());
        }
        grouped
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }

    /// Register a listener for change notifications
    pub fn subscribe(&self, listener: Arc<dyn RegistryListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Remove a listener; returns whether it was subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    /// Deliver the current list to every listener, isolating failures
    ///
    /// Called with no lock held, so listeners may query or subscribe.
    fn notify(&self) {
        let definitions = self.list_all();
        let listeners: Vec<_> = self
            .listeners
            .lock()
            .iter()
            .map(|(id, l)| (*id, l.clone()))
            .collect();

        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.definitions_changed(&definitions))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("Registry listener {:?} failed: {}", id, e),
                Err(_) => log::error!("Registry listener {:?} panicked", id),
            }
        }
    }
}

/// Compile a fetched batch, skipping entries that cannot be indexed
fn compile_all(raw: &[Value]) -> IndexMap<String, Arc<NodeDefinition>> {
    let mut compiled = IndexMap::with_capacity(raw.len());
    for value in raw {
        match compiler::compile_value(value) {
            Ok(definition) => {
                compiled.insert(definition.definition_id.clone(), Arc::new(definition));
            }
            Err(e) => log::warn!("Skipping node descriptor: {}", e),
        }
    }
    compiled
}
