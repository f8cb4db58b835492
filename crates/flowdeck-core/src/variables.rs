//! Variable resolution context
//!
//! Computes which `{{scope.path}}` variables a step may reference, as a pure
//! function of the step list and the cursor position. Values are resolved
//! by the execution backend; this layer only documents availability and
//! inserts template tokens.
//!
//! Slugs are not deduplicated: two steps labelled "Process" both publish
//! `steps.process.result`. [`crate::validation`] reports such collisions.

use serde::{Deserialize, Serialize};

use crate::constants::scopes;
use crate::step_types;
use crate::types::Step;

/// Rough value type of a variable, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Object,
    Any,
}

/// A single addressable variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableBinding {
    /// Owning scope name (`input`, `previous`, `steps.<slug>`, `context`, `env`)
    pub scope_name: String,
    /// Fully qualified path, e.g. `steps.fetch.result`
    pub path: String,
    pub value_type: ValueType,
    pub description: String,
}

/// A named group of variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableScope {
    pub name: String,
    pub label: String,
    pub variables: Vec<VariableBinding>,
}

const INPUT_VARIABLES: &[(&str, ValueType, &str)] = &[
    ("data", ValueType::Object, "Full payload the workflow was launched with"),
    ("body", ValueType::Any, "Request body of the launching call"),
    ("headers", ValueType::Object, "Headers of the launching call"),
    ("query", ValueType::Object, "Query parameters of the launching call"),
];

const PREVIOUS_VARIABLES: &[(&str, ValueType, &str)] = &[
    ("result", ValueType::Any, "Result of the immediately preceding step"),
    ("status", ValueType::String, "Completion status of the preceding step"),
    ("error", ValueType::String, "Error message if the preceding step failed"),
];

const CONTEXT_VARIABLES: &[(&str, ValueType, &str)] = &[
    ("execution_id", ValueType::String, "Identifier of the current run"),
    ("workflow_id", ValueType::String, "Identifier of the running workflow"),
    ("user_id", ValueType::String, "User who started the run"),
    ("timestamp", ValueType::String, "Time the run started (ISO 8601)"),
    ("step_index", ValueType::Number, "Zero-based index of the current step"),
];

const ENV_VARIABLES: &[(&str, ValueType, &str)] = &[
    ("ENVIRONMENT", ValueType::String, "Deployment environment name"),
    ("API_BASE_URL", ValueType::String, "Base URL of the platform API"),
    ("TIMEZONE", ValueType::String, "Default timezone of the workspace"),
];

/// Variables addressable from a position in a step list
pub struct VariableContext<'a> {
    steps: &'a [Step],
}

impl<'a> VariableContext<'a> {
    pub fn new(steps: &'a [Step]) -> Self {
        Self { steps }
    }

    /// Every scope visible from the step at `cursor`
    ///
    /// `filter` narrows all scopes by case-insensitive substring match on a
    /// variable's path or description; scopes left empty are omitted. A
    /// cursor past the end is treated as "after the last step".
    pub fn resolve(&self, cursor: usize, filter: Option<&str>) -> Vec<VariableScope> {
        let cursor = cursor.min(self.steps.len());

        let mut all = vec![fixed_scope(scopes::INPUT, "Workflow Input", INPUT_VARIABLES)];
        if cursor > 0 {
            all.push(fixed_scope(scopes::PREVIOUS, "Previous Step", PREVIOUS_VARIABLES));
        }
        all.extend(self.steps[..cursor].iter().map(step_scope));
        all.push(fixed_scope(scopes::CONTEXT, "Run Context", CONTEXT_VARIABLES));
        all.push(fixed_scope(scopes::ENV, "Environment", ENV_VARIABLES));

        let needle = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);
        let Some(needle) = needle else {
            return all;
        };

        all.into_iter()
            .filter_map(|mut scope| {
                scope.variables.retain(|v| {
                    v.path.to_lowercase().contains(&needle)
                        || v.description.to_lowercase().contains(&needle)
                });
                (!scope.variables.is_empty()).then_some(scope)
            })
            .collect()
    }

    /// Flat list of every visible variable path
    pub fn paths(&self, cursor: usize) -> Vec<String> {
        self.resolve(cursor, None)
            .into_iter()
            .flat_map(|scope| scope.variables.into_iter().map(|v| v.path))
            .collect()
    }
}

/// Normalize a step label into a variable slug
///
/// Lower-cased, every whitespace run collapsed to a single `_`. Leading
/// and trailing runs are kept, so `" Fetch "` becomes `_fetch_`.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut in_whitespace = false;
    for c in label.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('_');
            }
            in_whitespace = true;
        } else {
            slug.extend(c.to_lowercase());
            in_whitespace = false;
        }
    }
    slug
}

/// Template token for a variable path
pub fn template_token(path: &str) -> String {
    format!("{{{{{}}}}}", path)
}

/// Append a variable token to a field's current value
///
/// Plain concatenation; well-formedness is checked at execution time.
pub fn insert_variable(current: &str, path: &str) -> String {
    format!("{}{}", current, template_token(path))
}

fn fixed_scope(name: &str, label: &str, variables: &[(&str, ValueType, &str)]) -> VariableScope {
    VariableScope {
        name: name.to_string(),
        label: label.to_string(),
        variables: variables
            .iter()
            .map(|(key, value_type, description)| VariableBinding {
                scope_name: name.to_string(),
                path: format!("{}.{}", name, key),
                value_type: *value_type,
                description: description.to_string(),
            })
            .collect(),
    }
}

fn step_scope(step: &Step) -> VariableScope {
    let name = format!("{}.{}", scopes::STEPS, slugify(&step.label));
    let (property, description) = if step_types::is_http_call(&step.type_tag) {
        ("response", format!("HTTP response of \"{}\"", step.label))
    } else {
        ("result", format!("Result of \"{}\"", step.label))
    };

    VariableScope {
        label: format!("Step: {}", step.label),
        variables: vec![VariableBinding {
            scope_name: name.clone(),
            path: format!("{}.{}", name, property),
            value_type: ValueType::Any,
            description,
        }],
        name,
    }
}
