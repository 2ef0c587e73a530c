//! Renders action results into stream content according to `response.format`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use super::{ResponseFormat, ResponsePolicy};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("placeholder pattern must compile")
});

/// Renders `data` as text for a `content` event.
pub fn render(policy: &ResponsePolicy, data: &Value) -> String {
    match policy.format() {
        ResponseFormat::Text => render_text(data),
        ResponseFormat::Markdown => render_markdown(data),
        ResponseFormat::Json => serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()),
        ResponseFormat::Custom => match &policy.template {
            Some(template) => render_template(template, data),
            None => render_text(data),
        },
    }
}

/// Replaces `{{field}}` with the matching top-level field of `data`.
///
/// Missing fields render as an empty string.
pub fn render_template(template: &str, data: &Value) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            data.get(&caps[1]).map(scalar).unwrap_or_default()
        })
        .into_owned()
}

fn render_text(data: &Value) -> String {
    match data {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{}: {}", key, scalar(value)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join("\n"),
        other => scalar(other),
    }
}

fn render_markdown(data: &Value) -> String {
    match data {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("- **{}**: {}", key, scalar(value)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Array(items) => items
            .iter()
            .map(|item| format!("- {}", scalar(item)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => scalar(other),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        nested => nested.to_string(),
    }
}
