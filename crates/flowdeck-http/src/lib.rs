//! Flowdeck HTTP - REST adapter for the Flowdeck services
//!
//! Implements the core crate's `DescriptorSource` and `ExecutionApi`
//! traits over HTTP with reqwest:
//!
//! - `GET {base}/api/node-definitions`
//! - `GET {base}/api/executions/{id}`
//! - `GET {base}/api/executions/{id}/logs`
//! - `POST {base}/api/executions/{id}/cancel`
//!
//! # Example
//!
//! ```ignore
//! use flowdeck_http::{HttpBackend, HttpConfig};
//!
//! let backend = Arc::new(HttpBackend::new(HttpConfig::from_env()));
//! let session = EditorSession::new(backend.clone());
//! let tracker = ExecutionTracker::new(backend, TrackerConfig::default(), Arc::new(NullEventSink));
//! ```

mod client;
mod config;

pub use client::HttpBackend;
pub use config::HttpConfig;
