//! Compiled node definitions
//!
//! A `NodeDefinition` is the internal, ready-to-use form of a dynamic step
//! type. Definitions are immutable once built; the registry replaces them
//! wholesale on re-sync and hands them out behind `Arc`.

use serde::{Deserialize, Serialize};

/// Value kind of a parameter, derived from its JSON schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// `string`, or any unknown/missing type
    Text,
    /// `number` or `integer`
    Number,
    /// `boolean`
    Toggle,
    /// `object` or `array`, edited as JSON
    Structured,
}

impl ParameterKind {
    /// Map a JSON schema type name to a parameter kind
    pub fn from_schema_type(schema_type: Option<&str>) -> Self {
        match schema_type {
            Some("number") | Some("integer") => Self::Number,
            Some("boolean") => Self::Toggle,
            Some("object") | Some("array") => Self::Structured,
            _ => Self::Text,
        }
    }
}

/// One input or output parameter of a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    /// Property key in the schema
    pub name: String,
    /// Human-readable label (schema `title`, else the key)
    pub label: String,
    pub kind: ParameterKind,
    /// Present in the schema root's `required` array
    pub required: bool,
    pub description: Option<String>,
    pub default_value: Option<serde_json::Value>,
}

/// Widget used to edit a form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum FieldWidget {
    TextInput,
    TextArea,
    NumberInput { min: Option<f64>, max: Option<f64> },
    Toggle,
    JsonEditor,
    Select { options: Vec<serde_json::Value> },
}

/// A form field rendered in the step configuration panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Config key the field writes to
    pub key: String,
    pub label: String,
    #[serde(flatten)]
    pub widget: FieldWidget,
    pub required: bool,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub default_value: Option<serde_json::Value>,
}

/// Presentation hint for palette and canvas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleHint {
    pub icon: String,
    pub color: String,
}

/// Internal definition of a dynamically discovered step type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Stable id, unique within a registry generation
    pub definition_id: String,
    pub display_name: String,
    pub category: String,
    pub version: String,
    pub description: Option<String>,
    pub inputs: Vec<ParameterSpec>,
    pub outputs: Vec<ParameterSpec>,
    pub form_fields: Vec<FieldSpec>,
    pub style_hint: StyleHint,
    /// Always true for compiled descriptors
    pub is_dynamic: bool,
}

impl NodeDefinition {
    /// False when the node has nothing to configure
    pub fn has_configuration(&self) -> bool {
        !self.form_fields.is_empty()
    }

    /// Initial step config built from parameter defaults
    pub fn default_config(&self) -> serde_json::Map<String, serde_json::Value> {
        self.inputs
            .iter()
            .filter_map(|p| p.default_value.clone().map(|v| (p.name.clone(), v)))
            .collect()
    }

    /// Find an input parameter by name
    pub fn input(&self, name: &str) -> Option<&ParameterSpec> {
        self.inputs.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_kind_mapping() {
        assert_eq!(ParameterKind::from_schema_type(Some("string")), ParameterKind::Text);
        assert_eq!(ParameterKind::from_schema_type(Some("integer")), ParameterKind::Number);
        assert_eq!(ParameterKind::from_schema_type(Some("number")), ParameterKind::Number);
        assert_eq!(ParameterKind::from_schema_type(Some("boolean")), ParameterKind::Toggle);
        assert_eq!(ParameterKind::from_schema_type(Some("array")), ParameterKind::Structured);
        assert_eq!(ParameterKind::from_schema_type(Some("object")), ParameterKind::Structured);
        assert_eq!(ParameterKind::from_schema_type(Some("uuid")), ParameterKind::Text);
        assert_eq!(ParameterKind::from_schema_type(None), ParameterKind::Text);
    }

    #[test]
    fn test_field_spec_serialization() {
        let field = FieldSpec {
            key: "retries".to_string(),
            label: "Retries".to_string(),
            widget: FieldWidget::NumberInput {
                min: Some(0.0),
                max: None,
            },
            required: false,
            placeholder: None,
            help_text: None,
            default_value: None,
        };

        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["widget"], "number_input");
        assert_eq!(json["min"], 0.0);
        assert!(json.get("helpText").is_some()); // camelCase
    }
}
