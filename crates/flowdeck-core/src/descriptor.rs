//! Node descriptor boundary types
//!
//! Descriptors arrive from the node definition service as untyped JSON.
//! This module parses them once into known-shape values so the compiler
//! never has to probe optional chains. Parsing is deliberately lenient:
//! only a missing or empty `id` is rejected, every other malformed field
//! degrades to "absent".

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::constants::descriptor_defaults;
use crate::error::{FlowError, Result};

/// A parsed, externally supplied node descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescriptor {
    /// Stable identifier, becomes the definition id
    pub id: String,
    /// Display name (defaults to the id)
    pub name: String,
    /// Palette category (defaults to "custom")
    pub category: String,
    /// Descriptor version string
    pub version: String,
    /// Optional free-text description
    pub description: Option<String>,
    /// Schema describing the node's configuration inputs
    pub input_schema: Option<ObjectSchema>,
    /// Schema describing the node's result shape
    pub output_schema: Option<ObjectSchema>,
    /// Presentation hints
    pub ui_config: UiConfig,
    /// Icon override; wins over `ui_config.icon`
    pub icon: Option<String>,
}

/// Root of an object-typed JSON schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    /// Properties in document order
    pub properties: Vec<PropertySchema>,
    /// Keys listed in the root `required` array
    pub required: Vec<String>,
}

/// A single entry of a schema's `properties` object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySchema {
    pub name: String,
    /// Declared JSON schema type; arrays of types collapse to the first non-null entry
    pub schema_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub enum_values: Vec<Value>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// `format: "textarea"` or `multiline: true`
    pub multiline: bool,
}

/// Presentation hints from the descriptor's `uiConfig`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiConfig {
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Preferred field order; keys not present in the schema are ignored
    pub field_order: Vec<String>,
    pub fields: IndexMap<String, FieldOverride>,
}

/// Per-field presentation override
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOverride {
    pub widget: Option<String>,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
}

impl NodeDescriptor {
    /// Parse an untyped descriptor
    ///
    /// Fails only when the descriptor has no usable `id`; such an entry
    /// cannot be indexed by the registry.
    pub fn parse(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| FlowError::invalid_descriptor("descriptor is not a JSON object"))?;

        let id = text(obj, "id")
            .ok_or_else(|| FlowError::invalid_descriptor("descriptor has no usable 'id'"))?;

        Ok(Self {
            name: text(obj, "name").unwrap_or_else(|| id.clone()),
            category: text(obj, "category")
                .unwrap_or_else(|| descriptor_defaults::CATEGORY.to_string()),
            version: version(obj.get("version")),
            description: text(obj, "description"),
            input_schema: obj.get("inputSchema").and_then(ObjectSchema::parse),
            output_schema: obj.get("outputSchema").and_then(ObjectSchema::parse),
            ui_config: obj.get("uiConfig").map(UiConfig::parse).unwrap_or_default(),
            icon: text(obj, "icon"),
            id,
        })
    }
}

impl ObjectSchema {
    /// Parse a schema root; `None` when the value is not an object
    pub fn parse(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let properties = obj
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, schema)| PropertySchema::parse(name, schema))
                    .collect()
            })
            .unwrap_or_default();

        let required = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            properties,
            required,
        })
    }

    /// Whether a property key is listed in the root `required` array
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

impl PropertySchema {
    fn parse(name: &str, value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self {
                name: name.to_string(),
                ..Self::default()
            };
        };

        let schema_type = match obj.get("type") {
            Some(Value::String(t)) => Some(t.clone()),
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null")
                .map(str::to_string),
            _ => None,
        };

        let multiline = obj.get("format").and_then(Value::as_str) == Some("textarea")
            || obj.get("multiline").and_then(Value::as_bool) == Some(true);

        Self {
            name: name.to_string(),
            schema_type,
            title: text(obj, "title"),
            description: text(obj, "description"),
            default: obj.get("default").cloned(),
            enum_values: obj
                .get("enum")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            minimum: obj.get("minimum").and_then(Value::as_f64),
            maximum: obj.get("maximum").and_then(Value::as_f64),
            multiline,
        }
    }
}

impl UiConfig {
    fn parse(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let field_order = obj
            .get("fieldOrder")
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let fields = obj
            .get("fields")
            .and_then(Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|(key, field)| {
                        let field = field.as_object()?;
                        Some((
                            key.clone(),
                            FieldOverride {
                                widget: text(field, "widget"),
                                label: text(field, "label"),
                                placeholder: text(field, "placeholder"),
                                help_text: text(field, "helpText"),
                            },
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            icon: text(obj, "icon"),
            color: text(obj, "color"),
            field_order,
            fields,
        }
    }
}

/// Non-empty trimmed string field
fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Versions are sometimes published as bare numbers
fn version(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(v)) if !v.trim().is_empty() => v.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => descriptor_defaults::VERSION.to_string(),
    }
}
