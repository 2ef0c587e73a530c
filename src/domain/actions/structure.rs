//! Structural validation of untyped configuration documents.
//!
//! Runs before deserialization so that every problem in a file is reported at
//! once, each with the dotted path of the offending field.

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use super::configuration::CONFIG_ENVIRONMENTS;
use super::errors::SchemaViolation;
use super::{ACTION_CATEGORIES, MAX_PARAMETER_DEPTH, PARAMETER_TYPES, RESPONSE_FORMATS};

const IMPLEMENTATION_TYPES: &[&str] = &["function", "composed", "external"];
const MODES: &[&str] = &["b2c", "b2b"];
const HTTP_METHODS: &[&str] = &["GET", "POST"];
const NON_OVERRIDABLE: &[&str] = &["id", "modes", "implementation"];

/// Collects every structural violation in a configuration document.
pub fn check_document(document: &Value) -> Vec<SchemaViolation> {
    let mut checker = Checker::default();
    checker.document(document);
    checker.violations
}

/// Compiles a banned-input pattern the way the registry does at build time.
pub fn compile_banned_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[derive(Default)]
struct Checker {
    violations: Vec<SchemaViolation>,
    production: bool,
}

impl Checker {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(SchemaViolation::new(path, message));
    }

    fn document(&mut self, document: &Value) {
        let Some(root) = self.object("$", document) else {
            return;
        };

        match root.get("version") {
            Some(Value::String(v)) if !v.trim().is_empty() => {}
            Some(Value::Number(_)) => self.push("version", "must be a string (quote numeric versions)"),
            Some(_) => self.push("version", "must be a non-empty string"),
            None => self.push("version", "is required"),
        }

        if let Some(env) = self.optional_str(root, "environment", "environment") {
            self.one_of("environment", env, CONFIG_ENVIRONMENTS);
            self.production = env == "production";
        }

        if let Some(globals) = root.get("globals") {
            if let Some(globals) = self.object("globals", globals) {
                self.policies(globals, "globals");
            }
        }

        match root.get("actions") {
            Some(Value::Array(actions)) => {
                for (index, action) in actions.iter().enumerate() {
                    self.action(&format!("actions[{}]", index), action);
                }
            }
            Some(_) => self.push("actions", "must be an array"),
            None => self.push("actions", "is required"),
        }
    }

    fn action(&mut self, path: &str, action: &Value) {
        let Some(action) = self.object(path, action) else {
            return;
        };

        let id = self.required_str(action, "id", path);
        self.required_str(action, "name", path);
        match action.get("description") {
            Some(Value::String(_)) => {}
            Some(_) => self.push(format!("{}.description", path), "must be a string"),
            None => self.push(format!("{}.description", path), "is required"),
        }

        if let Some(category) = self.required_str(action, "category", path) {
            self.one_of(&format!("{}.category", path), category, ACTION_CATEGORIES);
        }

        match action.get("implementation") {
            Some(implementation) => {
                self.implementation(&format!("{}.implementation", path), implementation, id)
            }
            None => self.push(format!("{}.implementation", path), "is required"),
        }

        self.optional_bool(action, "enabled", path);

        if let Some(parameters) = action.get("parameters") {
            self.parameters(&format!("{}.parameters", path), parameters);
        }

        if let Some(modes) = action.get("modes") {
            let modes_path = format!("{}.modes", path);
            if let Some(modes) = self.object(&modes_path, modes) {
                for (mode, config) in modes {
                    let mode_path = format!("{}.{}", modes_path, mode);
                    self.one_of(&mode_path, mode, MODES);
                    self.mode(&mode_path, config);
                }
            }
        }

        self.policies(action, path);

        for (index, dependency) in self.string_array(action, "dependencies", path) {
            if Some(dependency) == id {
                self.push(
                    format!("{}.dependencies[{}]", path, index),
                    "action cannot depend on itself",
                );
            }
        }

        if let Some(metadata) = action.get("metadata") {
            self.object(&format!("{}.metadata", path), metadata);
        }
    }

    fn implementation(&mut self, path: &str, implementation: &Value, id: Option<&str>) {
        let Some(implementation) = self.object(path, implementation) else {
            return;
        };
        let Some(kind) = self.required_str(implementation, "type", path) else {
            return;
        };
        if !self.one_of(&format!("{}.type", path), kind, IMPLEMENTATION_TYPES) {
            return;
        }

        match kind {
            "function" => {
                self.required_str(implementation, "handler", path);
            }
            "composed" => {
                let steps_path = format!("{}.steps", path);
                match implementation.get("steps") {
                    Some(Value::Array(steps)) if !steps.is_empty() => {
                        for (index, step) in steps.iter().enumerate() {
                            let step_path = format!("{}[{}]", steps_path, index);
                            match step.as_str() {
                                Some(s) if s.is_empty() => {
                                    self.push(step_path, "must be a non-empty string")
                                }
                                Some(s) if Some(s) == id => {
                                    self.push(step_path, "composed action cannot include itself")
                                }
                                Some(_) => {}
                                None => self.push(step_path, "must be a string"),
                            }
                        }
                    }
                    Some(Value::Array(_)) => self.push(steps_path, "must list at least one step"),
                    Some(_) => self.push(steps_path, "must be an array"),
                    None => self.push(steps_path, "is required"),
                }
            }
            _ => {
                if let Some(endpoint) = self.required_str(implementation, "endpoint", path) {
                    self.endpoint(&format!("{}.endpoint", path), endpoint);
                }
                if let Some(method) = self.optional_str(implementation, "method", path) {
                    self.one_of(&format!("{}.method", path), method, HTTP_METHODS);
                }
            }
        }
    }

    fn endpoint(&mut self, path: &str, endpoint: &str) {
        match url::Url::parse(endpoint) {
            Ok(url) if url.scheme() == "https" => {}
            Ok(url) if url.scheme() == "http" => {
                if self.production {
                    self.push(path, "must use https in production");
                }
            }
            Ok(url) => self.push(path, format!("unsupported scheme '{}'", url.scheme())),
            Err(e) => self.push(path, format!("invalid URL: {}", e)),
        }
    }

    fn mode(&mut self, path: &str, config: &Value) {
        let Some(config) = self.object(path, config) else {
            return;
        };
        self.optional_bool(config, "enabled", path);
        self.string_array(config, "requiredFields", path);

        if let Some(overrides) = config.get("overrides") {
            let overrides_path = format!("{}.overrides", path);
            let Some(overrides) = self.object(&overrides_path, overrides) else {
                return;
            };
            for key in NON_OVERRIDABLE {
                if overrides.contains_key(*key) {
                    self.push(format!("{}.{}", overrides_path, key), "cannot be overridden per mode");
                }
            }
            if let Some(parameters) = overrides.get("parameters") {
                self.parameters(&format!("{}.parameters", overrides_path), parameters);
            }
            if let Some(category) = self.optional_str(overrides, "category", &overrides_path) {
                self.one_of(&format!("{}.category", overrides_path), category, ACTION_CATEGORIES);
            }
            self.optional_bool(overrides, "enabled", &overrides_path);
            self.policies(overrides, &overrides_path);
        }
    }

    fn policies(&mut self, owner: &Map<String, Value>, path: &str) {
        if let Some(security) = owner.get("security") {
            self.security(&format!("{}.security", path), security);
        }
        if let Some(performance) = owner.get("performance") {
            self.performance(&format!("{}.performance", path), performance);
        }
        if let Some(observability) = owner.get("observability") {
            self.observability(&format!("{}.observability", path), observability);
        }
        if let Some(response) = owner.get("response") {
            self.response(&format!("{}.response", path), response);
        }
    }

    fn security(&mut self, path: &str, security: &Value) {
        let Some(security) = self.object(path, security) else {
            return;
        };
        self.optional_bool(security, "requiresAuth", path);
        self.string_array(security, "requiredPermissions", path);

        if let Some(rate_limit) = security.get("rateLimit") {
            let rl_path = format!("{}.rateLimit", path);
            if let Some(rate_limit) = self.object(&rl_path, rate_limit) {
                self.required_uint(rate_limit, "requests", &rl_path, 1, u32::MAX as u64);
                self.required_uint(rate_limit, "windowMs", &rl_path, 1, u64::MAX);
            }
        }

        if let Some(input) = security.get("inputValidation") {
            let iv_path = format!("{}.inputValidation", path);
            if let Some(input) = self.object(&iv_path, input) {
                self.optional_uint(input, "maxLength", &iv_path, 1, u64::MAX);
                for (index, pattern) in self.string_array(input, "bannedPatterns", &iv_path) {
                    if let Err(e) = compile_banned_pattern(pattern) {
                        self.push(
                            format!("{}.bannedPatterns[{}]", iv_path, index),
                            format!("invalid regex: {}", e),
                        );
                    }
                }
                for (index, domain) in self.string_array(input, "allowedDomains", &iv_path) {
                    if domain.trim().is_empty() {
                        self.push(
                            format!("{}.allowedDomains[{}]", iv_path, index),
                            "must be a non-empty string",
                        );
                    }
                }
            }
        }
    }

    fn performance(&mut self, path: &str, performance: &Value) {
        let Some(performance) = self.object(path, performance) else {
            return;
        };
        self.optional_uint(performance, "timeoutMs", path, 1, u64::MAX);
        self.optional_uint(performance, "retries", path, 0, u32::MAX as u64);
        self.optional_uint(performance, "backoffMs", path, 0, u64::MAX);

        if let Some(parallelism) = performance.get("parallelism") {
            let p_path = format!("{}.parallelism", path);
            if let Some(parallelism) = self.object(&p_path, parallelism) {
                self.optional_uint(parallelism, "maxConcurrent", &p_path, 1, u32::MAX as u64);
                self.optional_uint(parallelism, "batchSize", &p_path, 1, u32::MAX as u64);
            }
        }
    }

    fn observability(&mut self, path: &str, observability: &Value) {
        let Some(observability) = self.object(path, observability) else {
            return;
        };
        self.optional_bool(observability, "logInvocations", path);
        self.optional_bool(observability, "logParameters", path);
        self.string_array(observability, "tags", path);
    }

    fn response(&mut self, path: &str, response: &Value) {
        let Some(response) = self.object(path, response) else {
            return;
        };
        if let Some(format) = self.optional_str(response, "format", path) {
            self.one_of(&format!("{}.format", path), format, RESPONSE_FORMATS);
        }
        self.optional_str(response, "template", path);
    }

    fn parameters(&mut self, path: &str, parameters: &Value) {
        if let Some(parameters) = self.object(path, parameters) {
            for (name, schema) in parameters {
                self.parameter(&format!("{}.{}", path, name), schema, 1);
            }
        }
    }

    fn parameter(&mut self, path: &str, schema: &Value, depth: usize) {
        if depth > MAX_PARAMETER_DEPTH {
            self.push(
                path,
                format!("nesting exceeds maximum depth of {}", MAX_PARAMETER_DEPTH),
            );
            return;
        }
        let Some(schema) = self.object(path, schema) else {
            return;
        };
        let Some(kind) = self.required_str(schema, "type", path) else {
            return;
        };
        if !self.one_of(&format!("{}.type", path), kind, PARAMETER_TYPES) {
            return;
        }

        self.optional_bool(schema, "required", path);
        self.optional_str(schema, "description", path);

        if let Some(values) = schema.get("enum") {
            match values {
                Value::Array(values) if !values.is_empty() => {
                    for (index, value) in values.iter().enumerate() {
                        if !value_matches_type(kind, value) {
                            self.push(
                                format!("{}.enum[{}]", path, index),
                                format!("does not match type '{}'", kind),
                            );
                        }
                    }
                }
                _ => self.push(format!("{}.enum", path), "must be a non-empty array"),
            }
        }

        if let Some(default) = schema.get("default") {
            if !value_matches_type(kind, default) {
                self.push(
                    format!("{}.default", path),
                    format!("does not match type '{}'", kind),
                );
            }
        }

        self.bounds(path, schema, kind);

        match (kind, schema.get("pattern")) {
            (_, None) => {}
            ("string", Some(Value::String(pattern))) => {
                if let Err(e) = Regex::new(pattern) {
                    self.push(format!("{}.pattern", path), format!("invalid regex: {}", e));
                }
            }
            ("string", Some(_)) => self.push(format!("{}.pattern", path), "must be a string"),
            (_, Some(_)) => self.push(
                format!("{}.pattern", path),
                "only applies to string parameters",
            ),
        }

        match (kind, schema.get("items")) {
            (_, None) => {}
            ("array", Some(items)) => self.parameter(&format!("{}.items", path), items, depth + 1),
            (_, Some(_)) => self.push(format!("{}.items", path), "only applies to array parameters"),
        }

        match (kind, schema.get("properties")) {
            (_, None) => {}
            ("object", Some(properties)) => {
                let props_path = format!("{}.properties", path);
                if let Some(properties) = self.object(&props_path, properties) {
                    for (name, child) in properties {
                        self.parameter(&format!("{}.{}", props_path, name), child, depth + 1);
                    }
                }
            }
            (_, Some(_)) => self.push(
                format!("{}.properties", path),
                "only applies to object parameters",
            ),
        }
    }

    fn bounds(&mut self, path: &str, schema: &Map<String, Value>, kind: &str) {
        let mut read = |checker: &mut Checker, key: &str| -> Option<f64> {
            let value = schema.get(key)?;
            let key_path = format!("{}.{}", path, key);
            match kind {
                "string" | "array" => match value.as_u64() {
                    Some(n) => Some(n as f64),
                    None => {
                        checker.push(key_path, "must be a non-negative integer");
                        None
                    }
                },
                "integer" => match value.as_i64() {
                    Some(n) => Some(n as f64),
                    None => {
                        checker.push(key_path, "must be an integer");
                        None
                    }
                },
                "number" => match value.as_f64() {
                    Some(n) => Some(n),
                    None => {
                        checker.push(key_path, "must be a number");
                        None
                    }
                },
                _ => {
                    checker.push(key_path, format!("does not apply to '{}' parameters", kind));
                    None
                }
            }
        };

        let min = read(self, "min");
        let max = read(self, "max");
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                self.push(format!("{}.min", path), "must not exceed max");
            }
        }
    }

    fn object<'v>(&mut self, path: &str, value: &'v Value) -> Option<&'v Map<String, Value>> {
        match value.as_object() {
            Some(map) => Some(map),
            None => {
                self.push(path, "must be an object");
                None
            }
        }
    }

    fn required_str<'v>(
        &mut self,
        owner: &'v Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<&'v str> {
        let field_path = format!("{}.{}", path, key);
        match owner.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            Some(_) => {
                self.push(field_path, "must be a non-empty string");
                None
            }
            None => {
                self.push(field_path, "is required");
                None
            }
        }
    }

    fn optional_str<'v>(
        &mut self,
        owner: &'v Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<&'v str> {
        match owner.get(key) {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                self.push(format!("{}.{}", path, key), "must be a string");
                None
            }
            None => None,
        }
    }

    fn optional_bool(&mut self, owner: &Map<String, Value>, key: &str, path: &str) {
        if let Some(value) = owner.get(key) {
            if !value.is_boolean() {
                self.push(format!("{}.{}", path, key), "must be a boolean");
            }
        }
    }

    fn optional_uint(
        &mut self,
        owner: &Map<String, Value>,
        key: &str,
        path: &str,
        min: u64,
        max: u64,
    ) -> Option<u64> {
        let value = owner.get(key)?;
        match value.as_u64() {
            Some(n) if n >= min && n <= max => Some(n),
            _ => {
                self.push(
                    format!("{}.{}", path, key),
                    format!("must be an integer between {} and {}", min, max),
                );
                None
            }
        }
    }

    fn required_uint(
        &mut self,
        owner: &Map<String, Value>,
        key: &str,
        path: &str,
        min: u64,
        max: u64,
    ) -> Option<u64> {
        if owner.contains_key(key) {
            self.optional_uint(owner, key, path, min, max)
        } else {
            self.push(format!("{}.{}", path, key), "is required");
            None
        }
    }

    fn string_array<'v>(
        &mut self,
        owner: &'v Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Vec<(usize, &'v str)> {
        let field_path = format!("{}.{}", path, key);
        match owner.get(key) {
            None => Vec::new(),
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    match item.as_str() {
                        Some(s) => out.push((index, s)),
                        None => self.push(format!("{}[{}]", field_path, index), "must be a string"),
                    }
                }
                out
            }
            Some(_) => {
                self.push(field_path, "must be an array of strings");
                Vec::new()
            }
        }
    }

    fn one_of(&mut self, path: &str, value: &str, allowed: &[&str]) -> bool {
        if allowed.contains(&value) {
            true
        } else {
            self.push(
                path,
                format!("'{}' is not one of [{}]", value, allowed.join(", ")),
            );
            false
        }
    }
}

fn value_matches_type(kind: &str, value: &Value) -> bool {
    match kind {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}
