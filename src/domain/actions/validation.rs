//! Runtime validation of invocation parameters.
//!
//! [`validate_parameters`] checks caller-supplied values against the merged
//! parameter schemas and fills declared defaults. [`InputGuard`] applies the
//! action's `inputValidation` policy to every string in the payload.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde_json::{Map, Value};

use super::errors::ParameterViolation;
use super::structure::compile_banned_pattern;
use super::{InputValidation, ParameterKind, ParameterSchema};

/// Regexes compiled once per registry build, keyed by their source.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    compiled: HashMap<String, Regex>,
}

impl PatternSet {
    /// Compiles every pattern declared anywhere in `parameters`.
    ///
    /// Returns the offending pattern with its error on the first failure.
    pub fn for_parameters(
        parameters: &BTreeMap<String, ParameterSchema>,
    ) -> Result<Self, (String, regex::Error)> {
        let mut compiled = HashMap::new();
        for schema in parameters.values() {
            for pattern in schema.patterns() {
                if compiled.contains_key(pattern) {
                    continue;
                }
                let regex = Regex::new(pattern).map_err(|e| (pattern.to_string(), e))?;
                compiled.insert(pattern.to_string(), regex);
            }
        }
        Ok(Self { compiled })
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    fn is_match(&self, pattern: &str, value: &str) -> Result<bool, String> {
        match self.compiled.get(pattern) {
            Some(regex) => Ok(regex.is_match(value)),
            None => Regex::new(pattern)
                .map(|regex| regex.is_match(value))
                .map_err(|e| e.to_string()),
        }
    }
}

/// Validates `params` against `schema`, returning the normalized parameters.
///
/// Omitted optional parameters receive their declared default; `null` counts
/// as omitted. Parameters not declared in the schema pass through unchanged.
/// Every violation is collected before returning.
pub fn validate_parameters(
    schema: &BTreeMap<String, ParameterSchema>,
    params: &Value,
    patterns: &PatternSet,
) -> Result<Value, Vec<ParameterViolation>> {
    let empty = Map::new();
    let supplied = match params {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(vec![ParameterViolation::new(
                "$",
                format!("parameters must be an object, got {}", json_type(other)),
            )])
        }
    };

    let mut violations = Vec::new();
    let normalized = check_properties("", schema, supplied, patterns, &mut violations);

    if violations.is_empty() {
        Ok(Value::Object(normalized))
    } else {
        Err(violations)
    }
}

fn check_properties(
    prefix: &str,
    schema: &BTreeMap<String, ParameterSchema>,
    supplied: &Map<String, Value>,
    patterns: &PatternSet,
    violations: &mut Vec<ParameterViolation>,
) -> Map<String, Value> {
    let mut out = supplied.clone();

    for (name, param) in schema {
        let path = join(prefix, name);
        match supplied.get(name).filter(|v| !v.is_null()) {
            Some(value) => {
                if let Some(value) = check_value(&path, param, value, patterns, violations) {
                    out.insert(name.clone(), value);
                }
            }
            None if param.required => {
                violations.push(ParameterViolation::new(path, "is required"));
            }
            None => match &param.default {
                Some(default) => {
                    out.insert(name.clone(), default.clone());
                }
                None => {
                    out.remove(name);
                }
            },
        }
    }

    out
}

fn check_value(
    path: &str,
    schema: &ParameterSchema,
    value: &Value,
    patterns: &PatternSet,
    violations: &mut Vec<ParameterViolation>,
) -> Option<Value> {
    let before = violations.len();

    let normalized = match &schema.kind {
        ParameterKind::Any => value.clone(),

        ParameterKind::String { min, max, pattern } => {
            let Some(s) = value.as_str() else {
                violations.push(type_mismatch(path, "string", value));
                return None;
            };
            let length = s.chars().count();
            if let Some(min) = min {
                if length < *min {
                    violations.push(ParameterViolation::new(
                        path,
                        format!("must be at least {} characters", min),
                    ));
                }
            }
            if let Some(max) = max {
                if length > *max {
                    violations.push(ParameterViolation::new(
                        path,
                        format!("must be at most {} characters", max),
                    ));
                }
            }
            if let Some(pattern) = pattern {
                match patterns.is_match(pattern, s) {
                    Ok(true) => {}
                    Ok(false) => violations.push(ParameterViolation::new(
                        path,
                        format!("does not match pattern '{}'", pattern),
                    )),
                    Err(e) => violations.push(ParameterViolation::new(
                        path,
                        format!("pattern '{}' is invalid: {}", pattern, e),
                    )),
                }
            }
            value.clone()
        }

        ParameterKind::Number { min, max } => {
            let Some(n) = value.as_f64() else {
                violations.push(type_mismatch(path, "number", value));
                return None;
            };
            check_range(path, n, *min, *max, violations);
            value.clone()
        }

        ParameterKind::Integer { min, max } => {
            let Some(n) = as_integer(value) else {
                violations.push(type_mismatch(path, "integer", value));
                return None;
            };
            check_range(path, n, *min, *max, violations);
            Value::from(n)
        }

        ParameterKind::Boolean => {
            if !value.is_boolean() {
                violations.push(type_mismatch(path, "boolean", value));
                return None;
            }
            value.clone()
        }

        ParameterKind::Array { items, min, max } => {
            let Some(elements) = value.as_array() else {
                violations.push(type_mismatch(path, "array", value));
                return None;
            };
            if let Some(min) = min {
                if elements.len() < *min {
                    violations.push(ParameterViolation::new(
                        path,
                        format!("must contain at least {} items", min),
                    ));
                }
            }
            if let Some(max) = max {
                if elements.len() > *max {
                    violations.push(ParameterViolation::new(
                        path,
                        format!("must contain at most {} items", max),
                    ));
                }
            }
            match items {
                Some(item_schema) => Value::Array(
                    elements
                        .iter()
                        .enumerate()
                        .map(|(i, element)| {
                            let item_path = format!("{}[{}]", path, i);
                            check_value(&item_path, item_schema, element, patterns, violations)
                                .unwrap_or_else(|| element.clone())
                        })
                        .collect(),
                ),
                None => value.clone(),
            }
        }

        ParameterKind::Object { properties } => {
            let Some(map) = value.as_object() else {
                violations.push(type_mismatch(path, "object", value));
                return None;
            };
            Value::Object(check_properties(path, properties, map, patterns, violations))
        }
    };

    if let Some(allowed) = &schema.allowed_values {
        if !allowed.iter().any(|candidate| values_equal(candidate, &normalized)) {
            violations.push(ParameterViolation::new(
                path,
                format!("must be one of {}", Value::Array(allowed.clone())),
            ));
        }
    }

    (violations.len() == before).then_some(normalized)
}

fn check_range<T: PartialOrd + std::fmt::Display + Copy>(
    path: &str,
    n: T,
    min: Option<T>,
    max: Option<T>,
    violations: &mut Vec<ParameterViolation>,
) {
    if let Some(min) = min {
        if n < min {
            violations.push(ParameterViolation::new(path, format!("must be >= {}", min)));
        }
    }
    if let Some(max) = max {
        if n > max {
            violations.push(ParameterViolation::new(path, format!("must be <= {}", max)));
        }
    }
}

/// Accepts integral floats such as `2.0`, which some callers emit for integers.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64).then_some(f as i64)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn type_mismatch(path: &str, expected: &str, value: &Value) -> ParameterViolation {
    ParameterViolation::new(
        path,
        format!("expected {}, got {}", expected, json_type(value)),
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Compiled form of an action's `inputValidation` policy.
#[derive(Debug, Clone, Default)]
pub struct InputGuard {
    max_length: Option<usize>,
    banned: Vec<Regex>,
    allowed_domains: Vec<String>,
}

impl InputGuard {
    /// Compiles banned patterns case-insensitively.
    pub fn compile(policy: &InputValidation) -> Result<Self, (String, regex::Error)> {
        let banned = policy
            .banned_patterns
            .iter()
            .map(|p| compile_banned_pattern(p).map_err(|e| (p.clone(), e)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            max_length: policy.max_length,
            banned,
            allowed_domains: policy
                .allowed_domains
                .iter()
                .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        })
    }

    /// Checks every string reachable from `params`.
    pub fn check(&self, params: &Value) -> Result<(), Vec<ParameterViolation>> {
        let mut violations = Vec::new();
        self.walk("", params, &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn walk(&self, path: &str, value: &Value, violations: &mut Vec<ParameterViolation>) {
        match value {
            Value::String(s) => self.check_string(path, s, violations),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.walk(&format!("{}[{}]", path, i), item, violations);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    self.walk(&join(path, key), item, violations);
                }
            }
            _ => {}
        }
    }

    fn check_string(&self, path: &str, s: &str, violations: &mut Vec<ParameterViolation>) {
        let path = if path.is_empty() { "$" } else { path };

        if let Some(max) = self.max_length {
            if s.chars().count() > max {
                violations.push(ParameterViolation::new(
                    path,
                    format!("exceeds maximum length of {}", max),
                ));
            }
        }

        if self.banned.iter().any(|regex| regex.is_match(s)) {
            violations.push(ParameterViolation::new(path, "contains disallowed content"));
        }

        if !self.allowed_domains.is_empty() {
            if let Some(host) = url_host(s) {
                if !self.domain_allowed(&host) {
                    violations.push(ParameterViolation::new(
                        path,
                        format!("domain '{}' is not allowed", host),
                    ));
                }
            }
        }
    }

    fn domain_allowed(&self, host: &str) -> bool {
        self.allowed_domains.iter().any(|domain| {
            host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .map_or(false, |rest| rest.ends_with('.'))
        })
    }
}

/// Host of `s` when it is an absolute http(s) URL.
fn url_host(s: &str) -> Option<String> {
    let url = url::Url::parse(s.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str().map(|h| h.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: Value) -> BTreeMap<String, ParameterSchema> {
        serde_json::from_value(value).unwrap()
    }

    fn validate(schema_json: Value, params: Value) -> Result<Value, Vec<ParameterViolation>> {
        let schema = schema(schema_json);
        let patterns = PatternSet::for_parameters(&schema).unwrap();
        validate_parameters(&schema, &params, &patterns)
    }

    fn violation_paths(violations: &[ParameterViolation]) -> Vec<&str> {
        violations.iter().map(|v| v.path.as_str()).collect()
    }

    #[test]
    fn missing_required_parameter_is_reported() {
        let err = validate(json!({ "query": { "type": "string", "required": true } }), json!({}))
            .unwrap_err();

        assert_eq!(violation_paths(&err), vec!["query"]);
        assert_eq!(err[0].message, "is required");
    }

    #[test]
    fn null_counts_as_missing() {
        let result = validate(
            json!({ "limit": { "type": "integer", "default": 10 } }),
            json!({ "limit": null }),
        )
        .unwrap();

        assert_eq!(result, json!({ "limit": 10 }));
    }

    #[test]
    fn defaults_fill_omitted_optional_parameters() {
        let result = validate(
            json!({
                "query": { "type": "string", "required": true },
                "limit": { "type": "integer", "default": 20 },
                "sort": { "type": "string" }
            }),
            json!({ "query": "boots" }),
        )
        .unwrap();

        assert_eq!(result, json!({ "query": "boots", "limit": 20 }));
    }

    #[test]
    fn undeclared_parameters_pass_through() {
        let result = validate(json!({}), json!({ "extra": [1, 2] })).unwrap();
        assert_eq!(result, json!({ "extra": [1, 2] }));
    }

    #[test]
    fn collects_every_violation() {
        let err = validate(
            json!({
                "query": { "type": "string", "min": 3 },
                "quantity": { "type": "integer", "min": 1, "max": 99 },
                "express": { "type": "boolean" }
            }),
            json!({ "query": "ab", "quantity": 120, "express": "yes" }),
        )
        .unwrap_err();

        assert_eq!(violation_paths(&err), vec!["express", "quantity", "query"]);
    }

    #[test]
    fn integral_floats_are_accepted_as_integers() {
        let result = validate(
            json!({ "quantity": { "type": "integer" } }),
            json!({ "quantity": 2.0 }),
        )
        .unwrap();
        assert_eq!(result["quantity"], json!(2));

        let err = validate(
            json!({ "quantity": { "type": "integer" } }),
            json!({ "quantity": 2.5 }),
        )
        .unwrap_err();
        assert_eq!(err[0].message, "expected integer, got number");
    }

    #[test]
    fn enum_restricts_values() {
        let schema = json!({ "sort": { "type": "string", "enum": ["price", "relevance"] } });

        assert!(validate(schema.clone(), json!({ "sort": "price" })).is_ok());
        let err = validate(schema, json!({ "sort": "newest" })).unwrap_err();
        assert!(err[0].message.starts_with("must be one of"));
    }

    #[test]
    fn pattern_uses_partial_match() {
        let schema = json!({ "sku": { "type": "string", "pattern": "[A-Z]{3}-\\d+" } });

        assert!(validate(schema.clone(), json!({ "sku": "item ABC-42" })).is_ok());
        assert!(validate(schema, json!({ "sku": "abc-42" })).is_err());
    }

    #[test]
    fn nested_objects_and_arrays_are_validated_with_paths() {
        let err = validate(
            json!({
                "lines": {
                    "type": "array",
                    "min": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "productId": { "type": "string", "required": true },
                            "quantity": { "type": "integer", "min": 1 }
                        }
                    }
                }
            }),
            json!({ "lines": [ { "productId": "p1", "quantity": 2 }, { "quantity": 0 } ] }),
        )
        .unwrap_err();

        assert_eq!(
            violation_paths(&err),
            vec!["lines[1].productId", "lines[1].quantity"]
        );
    }

    #[test]
    fn nested_defaults_are_applied() {
        let result = validate(
            json!({
                "address": {
                    "type": "object",
                    "properties": { "country": { "type": "string", "default": "US" } }
                }
            }),
            json!({ "address": { "city": "Austin" } }),
        )
        .unwrap();

        assert_eq!(result, json!({ "address": { "city": "Austin", "country": "US" } }));
    }

    #[test]
    fn non_object_params_are_rejected() {
        let err = validate(json!({}), json!("boots")).unwrap_err();
        assert_eq!(err[0].path, "$");
    }

    fn guard(policy: Value) -> InputGuard {
        let policy: InputValidation = serde_json::from_value(policy).unwrap();
        InputGuard::compile(&policy).unwrap()
    }

    #[test]
    fn guard_enforces_max_length_on_nested_strings() {
        let guard = guard(json!({ "maxLength": 5 }));

        assert!(guard.check(&json!({ "q": "boots" })).is_ok());
        let err = guard.check(&json!({ "notes": ["short", "much too long"] })).unwrap_err();
        assert_eq!(violation_paths(&err), vec!["notes[1]"]);
    }

    #[test]
    fn guard_matches_banned_patterns_case_insensitively() {
        let guard = guard(json!({ "bannedPatterns": ["<script", "drop\\s+table"] }));

        let err = guard
            .check(&json!({ "q": "<SCRIPT>alert(1)</script>", "r": "Drop Table users" }))
            .unwrap_err();
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn guard_restricts_url_domains_including_subdomains() {
        let guard = guard(json!({ "allowedDomains": ["shop.example"] }));

        assert!(guard.check(&json!({ "u": "https://shop.example/p/1" })).is_ok());
        assert!(guard.check(&json!({ "u": "https://cdn.shop.example/a.png" })).is_ok());
        assert!(guard.check(&json!({ "u": "not a url" })).is_ok());

        let err = guard.check(&json!({ "u": "https://evilshop.example/" })).unwrap_err();
        assert_eq!(err[0].message, "domain 'evilshop.example' is not allowed");
    }

    #[test]
    fn invalid_banned_pattern_fails_compilation() {
        let policy: InputValidation =
            serde_json::from_value(json!({ "bannedPatterns": ["(open"] })).unwrap();
        let (pattern, _) = InputGuard::compile(&policy).unwrap_err();
        assert_eq!(pattern, "(open");
    }
}
