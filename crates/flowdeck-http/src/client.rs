//! reqwest-backed implementation of the core service traits

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use flowdeck_core::{
    DescriptorSource, ExecutionApi, ExecutionRecord, ExecutionStatus, LogEntry, TransportError,
};

use crate::config::HttpConfig;

/// HTTP client for the node definition and execution services
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpBackend {
    pub fn new(config: HttpConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self::with_client(client, config)
    }

    /// Use a preconfigured client (shared pool, auth headers)
    pub fn with_client(client: reqwest::Client, config: HttpConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn node_definitions_url(&self) -> String {
        format!("{}{}", self.base_url(), self.config.node_definitions_path)
    }

    fn execution_url(&self, execution_id: &str) -> String {
        format!("{}{}/{}", self.base_url(), self.config.executions_path, execution_id)
    }

    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        response.json().await.map_err(map_reqwest_error)
    }
}

#[async_trait]
impl DescriptorSource for HttpBackend {
    async fn fetch_descriptors(&self) -> Result<Vec<Value>, TransportError> {
        let body = self.get_json(&self.node_definitions_url()).await?;
        unwrap_list(body, &["data", "nodes"])
    }
}

#[async_trait]
impl ExecutionApi for HttpBackend {
    async fn fetch_execution(&self, execution_id: &str) -> Result<ExecutionRecord, TransportError> {
        let body = self.get_json(&self.execution_url(execution_id)).await?;
        decode(unwrap_object(body))
    }

    async fn fetch_logs(&self, execution_id: &str) -> Result<Vec<LogEntry>, TransportError> {
        let url = format!("{}/logs", self.execution_url(execution_id));
        let body = self.get_json(&url).await?;
        unwrap_list(body, &["data", "logs"])?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn cancel_execution(
        &self,
        execution_id: &str,
    ) -> Result<Option<ExecutionStatus>, TransportError> {
        let url = format!("{}/cancel", self.execution_url(execution_id));
        log::debug!("POST {}", url);
        let response = self.client.post(&url).send().await.map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let text = response.text().await.map_err(map_reqwest_error)?;
        Ok(reported_status(&text))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_decode() {
        TransportError::Decode(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: String) -> TransportError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportError::Unauthorized,
        status => TransportError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

/// Accept a bare array or an object wrapping one under any of `keys`
fn unwrap_list(body: Value, keys: &[&str]) -> Result<Vec<Value>, TransportError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => keys
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| {
                TransportError::Decode(format!("expected a list under one of {:?}", keys))
            }),
        other => Err(TransportError::Decode(format!("expected a list, got {}", other))),
    }
}

/// Strip a `{ "data": { ... } }` envelope if present
fn unwrap_object(body: Value) -> Value {
    match body {
        Value::Object(mut map) if matches!(map.get("data"), Some(Value::Object(_))) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Status carried by a cancel response, if the body has one
fn reported_status(text: &str) -> Option<ExecutionStatus> {
    let body: Value = serde_json::from_str(text).ok()?;
    let status = unwrap_object(body).get("status")?.clone();
    serde_json::from_value(status).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(HttpConfig::default().with_base_url(base_url))
    }

    #[test]
    fn test_urls() {
        let backend = backend("https://flows.example.com/");
        assert_eq!(
            backend.node_definitions_url(),
            "https://flows.example.com/api/node-definitions"
        );
        assert_eq!(
            backend.execution_url("exec-1"),
            "https://flows.example.com/api/executions/exec-1"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            TransportError::Unauthorized
        );
        assert_eq!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            TransportError::Unauthorized
        );
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, "upstream down".to_string()),
            TransportError::Status {
                status: 502,
                body: "upstream down".to_string()
            }
        );
    }

    #[test]
    fn test_descriptor_list_shapes() {
        let keys = ["data", "nodes"];
        assert_eq!(unwrap_list(json!([{"id": "a"}]), &keys).unwrap().len(), 1);
        let wrapped = json!({"data": [{"id": "a"}, {"id": "b"}]});
        assert_eq!(unwrap_list(wrapped, &keys).unwrap().len(), 2);
        assert_eq!(unwrap_list(json!({"nodes": []}), &keys).unwrap().len(), 0);
        assert!(matches!(
            unwrap_list(json!({"items": []}), &keys),
            Err(TransportError::Decode(_))
        ));
        assert!(matches!(unwrap_list(json!("nope"), &keys), Err(TransportError::Decode(_))));
    }

    #[test]
    fn test_record_envelope() {
        let body = json!({"data": {
            "executionId": "exec-1",
            "status": "running",
            "startedAt": "2024-05-01T10:00:00Z"
        }});
        let record: ExecutionRecord = decode(unwrap_object(body)).unwrap();
        assert_eq!(record.status, ExecutionStatus::Running);

        let bad: Result<ExecutionRecord, _> = decode(json!({"status": "running"}));
        assert!(matches!(bad, Err(TransportError::Decode(_))));
    }

    #[test]
    fn test_cancel_response_status() {
        assert_eq!(reported_status(""), None);
        assert_eq!(reported_status("{\"status\":\"cancelled\"}"), Some(ExecutionStatus::Cancelled));
        assert_eq!(
            reported_status("{\"data\":{\"status\":\"running\"}}"),
            Some(ExecutionStatus::Running)
        );
        assert_eq!(reported_status("{\"ok\":true}"), None);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let _ = env_logger::builder().is_test(true).try_init();
        let backend = backend("http://127.0.0.1:9");

        let err = backend.fetch_descriptors().await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
        assert!(!err.is_session_loss());
    }
}
