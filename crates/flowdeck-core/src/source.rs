//! Descriptor sources consumed by the registry
//!
//! The registry treats whatever a source returns as the complete current
//! set of descriptors; there is no pagination.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::TransportError;

/// Remote (or local) provider of node descriptors
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    /// Fetch the full current descriptor set as untyped JSON
    async fn fetch_descriptors(&self) -> Result<Vec<Value>, TransportError>;
}

/// In-memory descriptor source
///
/// Used for offline operation and tests. The descriptor list and an
/// optional failure can be swapped at any time.
#[derive(Default)]
pub struct StaticDescriptorSource {
    descriptors: Mutex<Vec<Value>>,
    failure: Mutex<Option<TransportError>>,
}

impl StaticDescriptorSource {
    /// Create a source serving the given descriptors
    pub fn new(descriptors: Vec<Value>) -> Self {
        Self {
            descriptors: Mutex::new(descriptors),
            failure: Mutex::new(None),
        }
    }

    /// Replace the served descriptors
    pub fn set(&self, descriptors: Vec<Value>) {
        *self.descriptors.lock() = descriptors;
    }

    /// Make every subsequent fetch fail with `error` until cleared
    pub fn fail_with(&self, error: Option<TransportError>) {
        *self.failure.lock() = error;
    }
}

#[async_trait]
impl DescriptorSource for StaticDescriptorSource {
    async fn fetch_descriptors(&self) -> Result<Vec<Value>, TransportError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        Ok(self.descriptors.lock().clone())
    }
}
