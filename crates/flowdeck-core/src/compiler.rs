//! Descriptor to definition compiler
//!
//! Pure transformation with no external state. Every parsed descriptor
//! compiles; a descriptor without a usable schema yields a definition with
//! no parameters, which the UI shows as "no configuration".

use serde_json::Value;

use crate::constants::descriptor_defaults;
use crate::definition::{
    FieldSpec, FieldWidget, NodeDefinition, ParameterKind, ParameterSpec, StyleHint,
};
use crate::descriptor::{NodeDescriptor, ObjectSchema, PropertySchema, UiConfig};
use crate::error::Result;

/// Parse and compile an untyped descriptor in one step
pub fn compile_value(value: &Value) -> Result<NodeDefinition> {
    NodeDescriptor::parse(value).map(|d| compile(&d))
}

/// Compile a parsed descriptor into a node definition
pub fn compile(descriptor: &NodeDescriptor) -> NodeDefinition {
    let inputs = parameters(descriptor.input_schema.as_ref());
    let outputs = parameters(descriptor.output_schema.as_ref());
    let form_fields = form_fields(descriptor.input_schema.as_ref(), &descriptor.ui_config);

    NodeDefinition {
        definition_id: descriptor.id.clone(),
        display_name: descriptor.name.clone(),
        category: descriptor.category.clone(),
        version: descriptor.version.clone(),
        description: descriptor.description.clone(),
        inputs,
        outputs,
        form_fields,
        style_hint: style_hint(descriptor),
        is_dynamic: true,
    }
}

fn parameters(schema: Option<&ObjectSchema>) -> Vec<ParameterSpec> {
    let Some(schema) = schema else {
        return Vec::new();
    };

    schema
        .properties
        .iter()
        .map(|prop| ParameterSpec {
            name: prop.name.clone(),
            label: prop.title.clone().unwrap_or_else(|| prop.name.clone()),
            kind: ParameterKind::from_schema_type(prop.schema_type.as_deref()),
            required: schema.is_required(&prop.name),
            description: prop.description.clone(),
            default_value: prop.default.clone(),
        })
        .collect()
}

fn form_fields(schema: Option<&ObjectSchema>, ui: &UiConfig) -> Vec<FieldSpec> {
    let Some(schema) = schema else {
        return Vec::new();
    };

    // fieldOrder entries first, then the remaining properties in schema order
    let mut ordered: Vec<&PropertySchema> = Vec::with_capacity(schema.properties.len());
    for key in &ui.field_order {
        if ordered.iter().any(|p| &p.name == key) {
            continue;
        }
        if let Some(prop) = schema.properties.iter().find(|p| &p.name == key) {
            ordered.push(prop);
        }
    }
    for prop in &schema.properties {
        if !ordered.iter().any(|p| p.name == prop.name) {
            ordered.push(prop);
        }
    }

    ordered
        .into_iter()
        .map(|prop| {
            let field_override = ui.fields.get(&prop.name);
            let widget = field_override
                .and_then(|o| o.widget.as_deref())
                .and_then(|w| widget_override(w, prop))
                .unwrap_or_else(|| default_widget(prop));

            FieldSpec {
                key: prop.name.clone(),
                label: field_override
                    .and_then(|o| o.label.clone())
                    .or_else(|| prop.title.clone())
                    .unwrap_or_else(|| prop.name.clone()),
                widget,
                required: schema.is_required(&prop.name),
                placeholder: field_override.and_then(|o| o.placeholder.clone()),
                help_text: field_override
                    .and_then(|o| o.help_text.clone())
                    .or_else(|| prop.description.clone()),
                default_value: prop.default.clone(),
            }
        })
        .collect()
}

fn default_widget(prop: &PropertySchema) -> FieldWidget {
    if !prop.enum_values.is_empty() {
        return FieldWidget::Select {
            options: prop.enum_values.clone(),
        };
    }

    match ParameterKind::from_schema_type(prop.schema_type.as_deref()) {
        ParameterKind::Text if prop.multiline => FieldWidget::TextArea,
        ParameterKind::Text => FieldWidget::TextInput,
        ParameterKind::Number => FieldWidget::NumberInput {
            min: prop.minimum,
            max: prop.maximum,
        },
        ParameterKind::Toggle => FieldWidget::Toggle,
        ParameterKind::Structured => FieldWidget::JsonEditor,
    }
}

/// Widget named in `uiConfig.fields`; unknown names fall back to the default
fn widget_override(name: &str, prop: &PropertySchema) -> Option<FieldWidget> {
    let widget = match name {
        "text" | "input" => FieldWidget::TextInput,
        "textarea" | "code" => FieldWidget::TextArea,
        "number" => FieldWidget::NumberInput {
            min: prop.minimum,
            max: prop.maximum,
        },
        "toggle" | "switch" | "checkbox" => FieldWidget::Toggle,
        "json" => FieldWidget::JsonEditor,
        "select" if !prop.enum_values.is_empty() => FieldWidget::Select {
            options: prop.enum_values.clone(),
        },
        _ => return None,
    };
    Some(widget)
}

fn style_hint(descriptor: &NodeDescriptor) -> StyleHint {
    StyleHint {
        icon: descriptor
            .icon
            .clone()
            .or_else(|| descriptor.ui_config.icon.clone())
            .unwrap_or_else(|| descriptor_defaults::ICON.to_string()),
        color: descriptor
            .ui_config
            .color
            .clone()
            .unwrap_or_else(|| descriptor_defaults::COLOR.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_parameters_and_required() {
        let definition = compile_value(&json!({
            "id": "http-poll",
            "name": "HTTP Poll",
            "inputSchema": {
                "properties": {
                    "url": {"type": "string"},
                    "interval": {"type": "integer", "default": 30},
                    "verbose": {"type": "boolean"},
                    "headers": {"type": "object"},
                    "tags": {"type": "array"},
                    "mystery": {}
                },
                "required": ["url"]
            }
        }))
        .unwrap();

        let kinds: Vec<_> = definition
            .inputs
            .iter()
            .map(|p| (p.name.as_str(), p.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("url", ParameterKind::Text),
                ("interval", ParameterKind::Number),
                ("verbose", ParameterKind::Toggle),
                ("headers", ParameterKind::Structured),
                ("tags", ParameterKind::Structured),
                ("mystery", ParameterKind::Text),
            ]
        );
        assert!(definition.input("url").unwrap().required);
        assert!(!definition.input("interval").unwrap().required);
        assert!(definition.is_dynamic);
        assert_eq!(definition.default_config()["interval"], 30);
    }

    #[test]
    fn test_required_only_from_root_array() {
        let definition = compile_value(&json!({
            "id": "nested",
            "inputSchema": {
                "properties": {
                    "config": {"type": "object", "required": ["config"]}
                }
            }
        }))
        .unwrap();

        assert!(!definition.inputs[0].required);
    }

    #[test]
    fn test_no_schema_compiles_to_empty_definition() {
        let definition = compile_value(&json!({"id": "bare", "name": "Bare"})).unwrap();

        assert!(definition.inputs.is_empty());
        assert!(definition.outputs.is_empty());
        assert!(!definition.has_configuration());
        assert_eq!(definition.style_hint.icon, "puzzle");
        assert_eq!(definition.style_hint.color, "#6366f1");
    }

    #[test]
    fn test_form_fields_follow_ui_config() {
        let definition = compile_value(&json!({
            "id": "mailer",
            "inputSchema": {
                "properties": {
                    "to": {"type": "string", "title": "Recipient"},
                    "body": {"type": "string", "format": "textarea"},
                    "priority": {"type": "string", "enum": ["low", "high"]},
                    "attempts": {"type": "number", "minimum": 1}
                }
            },
            "uiConfig": {
                "fieldOrder": ["body", "ghost"],
                "fields": {
                    "to": {"placeholder": "ops@example.com", "helpText": "Comma separated"},
                    "attempts": {"widget": "unheard-of"}
                }
            }
        }))
        .unwrap();

        let keys: Vec<_> = definition.form_fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["body", "to", "priority", "attempts"]);

        assert_eq!(definition.form_fields[0].widget, FieldWidget::TextArea);
        assert_eq!(definition.form_fields[1].label, "Recipient");
        assert_eq!(
            definition.form_fields[1].placeholder.as_deref(),
            Some("ops@example.com")
        );
        assert!(matches!(definition.form_fields[2].widget, FieldWidget::Select { .. }));
        assert_eq!(
            definition.form_fields[3].widget,
            FieldWidget::NumberInput {
                min: Some(1.0),
                max: None
            }
        );
    }

    #[test]
    fn test_repeated_field_order_key_yields_one_field() {
        let definition = compile_value(&json!({
            "id": "webhook",
            "inputSchema": {
                "properties": {
                    "url": {"type": "string"},
                    "body": {"type": "string", "format": "textarea"}
                }
            },
            "uiConfig": {"fieldOrder": ["body", "body", "url", "body"]}
        }))
        .unwrap();

        let keys: Vec<_> = definition.form_fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["body", "url"]);
    }

    #[test]
    fn test_icon_precedence() {
        let definition = compile_value(&json!({
            "id": "a",
            "icon": "bolt",
            "uiConfig": {"icon": "star", "color": "#000000"}
        }))
        .unwrap();
        assert_eq!(definition.style_hint.icon, "bolt");
        assert_eq!(definition.style_hint.color, "#000000");

        let definition = compile_value(&json!({"id": "b", "uiConfig": {"icon": "star"}})).unwrap();
        assert_eq!(definition.style_hint.icon, "star");
    }
}
