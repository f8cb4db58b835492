//! Built-in step types and display resolution
//!
//! Built-in types carry a fixed default configuration. Every other type tag
//! is a dynamic definition id resolved through the [`NodeRegistry`].

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::constants::descriptor_defaults;
use crate::registry::NodeRegistry;
use crate::types::StepConfig;

/// Step types known at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStepType {
    Script,
    Condition,
    HttpRequest,
    Transform,
    Delay,
}

impl BuiltinStepType {
    pub const ALL: [BuiltinStepType; 5] = [
        Self::Script,
        Self::Condition,
        Self::HttpRequest,
        Self::Transform,
        Self::Delay,
    ];

    /// Type tag stored on steps and persisted nodes
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Condition => "condition",
            Self::HttpRequest => "http_request",
            Self::Transform => "transform",
            Self::Delay => "delay",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Whether steps of this type produce an HTTP response envelope
    pub fn is_http_call(&self) -> bool {
        matches!(self, Self::HttpRequest)
    }

    pub fn display(&self) -> StepDisplay {
        let (label, icon, color) = match self {
            Self::Script => ("Script", "code", "#f59e0b"),
            Self::Condition => ("Condition", "git-branch", "#8b5cf6"),
            Self::HttpRequest => ("HTTP Request", "globe", "#3b82f6"),
            Self::Transform => ("Transform", "shuffle", "#10b981"),
            Self::Delay => ("Delay", "clock", "#6b7280"),
        };
        StepDisplay {
            label: label.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
        }
    }

    /// Fixed default configuration for a freshly inserted step
    pub fn default_config(&self) -> StepConfig {
        let value = match self {
            Self::Script => json!({
                "scriptType": "javascript",
                "code": "",
                "timeout": 30,
                "onError": "stop"
            }),
            Self::Condition => json!({
                "expression": "",
                "onError": "stop"
            }),
            Self::HttpRequest => json!({
                "method": "GET",
                "url": "",
                "headers": {},
                "body": "",
                "timeout": 30,
                "onError": "stop"
            }),
            Self::Transform => json!({
                "mapping": {},
                "onError": "stop"
            }),
            Self::Delay => json!({
                "seconds": 5
            }),
        };
        match value {
            serde_json::Value::Object(map) => map,
            _ => StepConfig::new(),
        }
    }
}

/// Label, icon and color used to render a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDisplay {
    pub label: String,
    pub icon: String,
    pub color: String,
}

/// Whether a type tag names an HTTP-call step
pub fn is_http_call(type_tag: &str) -> bool {
    BuiltinStepType::from_tag(type_tag).is_some_and(|t| t.is_http_call())
}

/// Resolve display metadata for a type tag
///
/// Unknown tags (e.g. a dynamic type removed by the last sync) render with
/// the tag itself as label and default styling.
pub fn describe(type_tag: &str, registry: &NodeRegistry) -> StepDisplay {
    if let Some(builtin) = BuiltinStepType::from_tag(type_tag) {
        return builtin.display();
    }

    match registry.get(type_tag) {
        Some(definition) => StepDisplay {
            label: definition.display_name.clone(),
            icon: definition.style_hint.icon.clone(),
            color: definition.style_hint.color.clone(),
        },
        None => StepDisplay {
            label: type_tag.to_string(),
            icon: descriptor_defaults::ICON.to_string(),
            color: descriptor_defaults::COLOR.to_string(),
        },
    }
}

/// Default configuration for a type tag
pub fn default_config(type_tag: &str, registry: &NodeRegistry) -> StepConfig {
    if let Some(builtin) = BuiltinStepType::from_tag(type_tag) {
        return builtin.default_config();
    }

    registry
        .get(type_tag)
        .map(|definition| definition.default_config())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticDescriptorSource;
    use std::sync::Arc;

    fn registry() -> NodeRegistry {
        let registry = NodeRegistry::new(Arc::new(StaticDescriptorSource::default()));
        registry
            .register_value(&json!({
                "id": "sentiment",
                "name": "Sentiment",
                "icon": "smile",
                "inputSchema": {"properties": {"model": {"type": "string", "default": "small"}}}
            }))
            .unwrap();
        registry
    }

    #[test]
    fn test_tag_round_trip() {
        for builtin in BuiltinStepType::ALL {
            assert_eq!(BuiltinStepType::from_tag(builtin.tag()), Some(builtin));
        }
        assert_eq!(BuiltinStepType::from_tag("sentiment"), None);
    }

    #[test]
    fn test_script_defaults() {
        let config = BuiltinStepType::Script.default_config();
        assert_eq!(config["scriptType"], "javascript");
        assert_eq!(config["timeout"], 30);
        assert_eq!(config["onError"], "stop");
    }

    #[test]
    fn test_http_call_policy() {
        assert!(is_http_call("http_request"));
        assert!(!is_http_call("script"));
        assert!(!is_http_call("sentiment"));
    }

    #[test]
    fn test_describe_resolves_through_registry() {
        let registry = registry();
        assert_eq!(describe("script", &registry).label, "Script");

        let dynamic = describe("sentiment", &registry);
        assert_eq!(dynamic.label, "Sentiment");
        assert_eq!(dynamic.icon, "smile");

        let unknown = describe("vanished", &registry);
        assert_eq!(unknown.label, "vanished");
        assert_eq!(unknown.icon, "puzzle");
    }

    #[test]
    fn test_dynamic_default_config() {
        let registry = registry();
        assert_eq!(default_config("sentiment", &registry)["model"], "small");
        assert!(default_config("vanished", &registry).is_empty());
    }
}
