//! HTTP adapter configuration

use std::time::Duration;

/// Endpoint and timeout settings for [`crate::HttpBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    /// Service root, without trailing slash
    pub base_url: String,
    pub request_timeout: Duration,
    pub node_definitions_path: String,
    /// Prefix for `/{id}`, `/{id}/logs` and `/{id}/cancel`
    pub executions_path: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout: Duration::from_secs(30),
            node_definitions_path: "/api/node-definitions".to_string(),
            executions_path: "/api/executions".to_string(),
        }
    }
}

impl HttpConfig {
    /// Defaults overridden by `FLOWDECK_API_URL` and `FLOWDECK_HTTP_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("FLOWDECK_API_URL") {
            self.base_url = val;
        }
        if let Some(val) = lookup("FLOWDECK_HTTP_TIMEOUT_SECS") {
            match val.parse() {
                Ok(secs) => self.request_timeout = Duration::from_secs(secs),
                Err(_) => log::warn!("Ignoring invalid FLOWDECK_HTTP_TIMEOUT_SECS '{}'", val),
            }
        }
    }
}
