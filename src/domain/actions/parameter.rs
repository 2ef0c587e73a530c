//! Parameter schemas - recursive, typed descriptions of action inputs.
//!
//! A schema is a [`ParameterKind`] (tagged by `type`) plus the attributes every
//! kind shares (`required`, `default`, `enum`, `description`). Arrays and
//! objects nest further schemas through `items` and `properties`.
//!
//! Nesting is bounded by [`MAX_PARAMETER_DEPTH`]; deeper schemas are rejected
//! when the configuration file is loaded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Maximum nesting depth of parameter schemas (a top-level parameter is depth 1).
pub const MAX_PARAMETER_DEPTH: usize = 8;

/// Parameter type names accepted in configuration files.
pub const PARAMETER_TYPES: &[&str] = &[
    "string", "number", "integer", "boolean", "array", "object", "any",
];

/// Schema for a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSchema {
    /// Type-specific constraints.
    #[serde(flatten)]
    pub kind: ParameterKind,

    /// Whether the caller must supply this parameter.
    #[serde(default)]
    pub required: bool,

    /// Value used when an optional parameter is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Closed set of permitted values.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,

    /// Human-readable description exposed in tool listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Type tag and type-specific constraints of a parameter.
///
/// For strings `min`/`max` bound the character count, for numbers the value
/// and for arrays the number of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParameterKind {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Boolean,
    Array {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Box<ParameterSchema>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
    Object {
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        properties: BTreeMap<String, ParameterSchema>,
    },
    Any,
}

impl ParameterSchema {
    /// Creates an optional parameter of the given kind.
    pub fn new(kind: ParameterKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            allowed_values: None,
            description: None,
        }
    }

    /// Unconstrained string parameter.
    pub fn string() -> Self {
        Self::new(ParameterKind::String {
            min: None,
            max: None,
            pattern: None,
        })
    }

    /// Unconstrained integer parameter.
    pub fn integer() -> Self {
        Self::new(ParameterKind::Integer { min: None, max: None })
    }

    /// Parameter accepting any JSON value.
    pub fn any() -> Self {
        Self::new(ParameterKind::Any)
    }

    /// Marks the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Restricts the parameter to a closed set of values.
    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    /// Type name as written in configuration files.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Collects every regex pattern declared in this schema and its children.
    pub fn patterns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_patterns(&mut out);
        out
    }

    fn collect_patterns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.kind {
            ParameterKind::String {
                pattern: Some(p), ..
            } => out.push(p.as_str()),
            ParameterKind::Array {
                items: Some(items), ..
            } => items.collect_patterns(out),
            ParameterKind::Object { properties } => {
                for child in properties.values() {
                    child.collect_patterns(out);
                }
            }
            _ => {}
        }
    }

    /// Renders the schema as JSON Schema for tool listings.
    pub fn to_json_schema(&self) -> Value {
        let mut schema = Map::new();
        if let Some(type_name) = self.kind.json_schema_type() {
            schema.insert("type".to_string(), json!(type_name));
        }
        if let Some(description) = &self.description {
            schema.insert("description".to_string(), json!(description));
        }
        if let Some(values) = &self.allowed_values {
            schema.insert("enum".to_string(), json!(values));
        }
        if let Some(default) = &self.default {
            schema.insert("default".to_string(), default.clone());
        }

        match &self.kind {
            ParameterKind::String { min, max, pattern } => {
                insert_opt(&mut schema, "minLength", min.map(|v| json!(v)));
                insert_opt(&mut schema, "maxLength", max.map(|v| json!(v)));
                insert_opt(&mut schema, "pattern", pattern.as_ref().map(|v| json!(v)));
            }
            ParameterKind::Number { min, max } => {
                insert_opt(&mut schema, "minimum", min.map(|v| json!(v)));
                insert_opt(&mut schema, "maximum", max.map(|v| json!(v)));
            }
            ParameterKind::Integer { min, max } => {
                insert_opt(&mut schema, "minimum", min.map(|v| json!(v)));
                insert_opt(&mut schema, "maximum", max.map(|v| json!(v)));
            }
            ParameterKind::Array { items, min, max } => {
                insert_opt(&mut schema, "items", items.as_ref().map(|s| s.to_json_schema()));
                insert_opt(&mut schema, "minItems", min.map(|v| json!(v)));
                insert_opt(&mut schema, "maxItems", max.map(|v| json!(v)));
            }
            ParameterKind::Object { properties } => {
                let object = parameters_to_json_schema(properties);
                if let Value::Object(object) = object {
                    for (key, value) in object {
                        if key != "type" {
                            schema.insert(key, value);
                        }
                    }
                }
            }
            ParameterKind::Boolean | ParameterKind::Any => {}
        }

        Value::Object(schema)
    }
}

impl ParameterKind {
    /// Type name as written in configuration files.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterKind::String { .. } => "string",
            ParameterKind::Number { .. } => "number",
            ParameterKind::Integer { .. } => "integer",
            ParameterKind::Boolean => "boolean",
            ParameterKind::Array { .. } => "array",
            ParameterKind::Object { .. } => "object",
            ParameterKind::Any => "any",
        }
    }

    fn json_schema_type(&self) -> Option<&'static str> {
        match self {
            ParameterKind::Any => None,
            other => Some(other.type_name()),
        }
    }
}

/// Renders a parameter map as a JSON Schema `object`.
pub fn parameters_to_json_schema(parameters: &BTreeMap<String, ParameterSchema>) -> Value {
    let properties: Map<String, Value> = parameters
        .iter()
        .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
        .collect();
    let required: Vec<&str> = parameters
        .iter()
        .filter(|(_, schema)| schema.required)
        .map(|(name, _)| name.as_str())
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn insert_opt(schema: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        schema.insert(key.to_string(), value);
    }
}
