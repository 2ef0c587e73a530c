//! Action definitions - declarative capability descriptors.
//!
//! Policies (`security`, `performance`, `observability`, `response`) keep every
//! field optional so that globals and built-in defaults can be layered under
//! the action's own settings. After [`super::apply_defaults`] every field is
//! populated; the accessors still fall back to built-in defaults so a
//! hand-constructed definition behaves the same way.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ParameterSchema;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 1_000;

/// Declarative description of a callable capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    /// Unique identifier (primary key within a configuration file).
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ActionCategory,

    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSchema>,

    pub implementation: Implementation,

    /// Disabled actions never appear in any tool list.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-mode adjustments layered over the base definition.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modes: BTreeMap<Mode, ModeConfig>,

    #[serde(default)]
    pub security: SecurityPolicy,

    #[serde(default)]
    pub performance: PerformancePolicy,

    #[serde(default)]
    pub observability: ObservabilityPolicy,

    #[serde(default)]
    pub response: ResponsePolicy,

    /// Ids of actions that must exist (and be enabled) alongside this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl ActionDefinition {
    /// Whether the action is enabled for `mode`, both globally and at mode level.
    pub fn is_enabled_for(&self, mode: Mode) -> bool {
        self.enabled && self.modes.get(&mode).map_or(true, |m| m.enabled)
    }
}

/// Functional grouping of actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionCategory {
    Search,
    Cart,
    Customer,
    Checkout,
    B2b,
    Support,
}

pub const ACTION_CATEGORIES: &[&str] = &["search", "cart", "customer", "checkout", "b2b", "support"];

/// Behavioral variant of the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    B2c,
    B2b,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::B2c => write!(f, "b2c"),
            Mode::B2b => write!(f, "b2b"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "b2c" => Ok(Mode::B2c),
            "b2b" => Ok(Mode::B2b),
            other => Err(format!("unknown mode '{}', expected b2c or b2b", other)),
        }
    }
}

/// How an action is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Implementation {
    /// A named handler from the injected handler map.
    Function { handler: String },
    /// An ordered pipeline of other actions.
    Composed { steps: Vec<String> },
    /// A remote endpoint.
    External {
        endpoint: String,
        #[serde(default)]
        method: HttpMethod,
    },
}

/// HTTP method used by external actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

/// Mode-specific adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Top-level fields replacing the base definition's fields in this mode.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub overrides: Map<String, Value>,

    /// Parameters that become mandatory in this mode only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            overrides: Map::new(),
            required_fields: Vec::new(),
        }
    }
}

/// Access and input policy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_validation: Option<InputValidation>,
}

impl SecurityPolicy {
    /// Fills unset fields from `other`.
    pub fn fill_from(&mut self, other: &SecurityPolicy) {
        fill(&mut self.requires_auth, &other.requires_auth);
        fill(&mut self.required_permissions, &other.required_permissions);
        fill(&mut self.rate_limit, &other.rate_limit);
        fill(&mut self.input_validation, &other.input_validation);
    }

    /// Built-in defaults. Rate limits and input validation stay opt-in.
    pub fn builtin() -> Self {
        Self {
            requires_auth: Some(false),
            required_permissions: Some(Vec::new()),
            rate_limit: None,
            input_validation: None,
        }
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth.unwrap_or(false)
    }

    pub fn required_permissions(&self) -> &[String] {
        self.required_permissions.as_deref().unwrap_or(&[])
    }
}

/// Fixed-window request limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicy {
    pub requests: u32,
    pub window_ms: u64,
}

impl RateLimitPolicy {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Checks applied to every string in an invocation's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regexes (case-insensitive) that must not match any input string.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub banned_patterns: Vec<String>,
    /// Hosts that URL inputs may point to; subdomains are accepted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_domains: Vec<String>,
}

/// Timeout, retry and fan-out policy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformancePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<Parallelism>,
}

impl PerformancePolicy {
    /// Fills unset fields from `other`.
    pub fn fill_from(&mut self, other: &PerformancePolicy) {
        fill(&mut self.timeout_ms, &other.timeout_ms);
        fill(&mut self.retries, &other.retries);
        fill(&mut self.backoff_ms, &other.backoff_ms);
        fill(&mut self.parallelism, &other.parallelism);
    }

    pub fn builtin() -> Self {
        Self {
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            retries: Some(DEFAULT_RETRIES),
            backoff_ms: Some(DEFAULT_BACKOFF_MS),
            parallelism: Some(Parallelism::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    pub fn retries(&self) -> u32 {
        self.retries.unwrap_or(DEFAULT_RETRIES)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms.unwrap_or(DEFAULT_BACKOFF_MS))
    }

    pub fn parallelism(&self) -> Parallelism {
        self.parallelism.unwrap_or_default()
    }
}

/// Advisory fan-out limits for a handler's own implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parallelism {
    #[serde(default = "default_one")]
    pub max_concurrent: u32,
    #[serde(default = "default_one")]
    pub batch_size: u32,
}

impl Default for Parallelism {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            batch_size: 1,
        }
    }
}

/// Controls the audit record written for each invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_invocations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_parameters: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ObservabilityPolicy {
    pub fn fill_from(&mut self, other: &ObservabilityPolicy) {
        fill(&mut self.log_invocations, &other.log_invocations);
        fill(&mut self.log_parameters, &other.log_parameters);
        fill(&mut self.tags, &other.tags);
    }

    pub fn builtin() -> Self {
        Self {
            log_invocations: Some(true),
            log_parameters: Some(false),
            tags: Some(Vec::new()),
        }
    }

    pub fn log_invocations(&self) -> bool {
        self.log_invocations.unwrap_or(true)
    }

    pub fn log_parameters(&self) -> bool {
        self.log_parameters.unwrap_or(false)
    }
}

/// Output format of an action's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    Markdown,
    Json,
    Custom,
}

pub const RESPONSE_FORMATS: &[&str] = &["text", "markdown", "json", "custom"];

/// How results are rendered into stream content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ResponseFormat>,
    /// Template for `custom` format; `{{field}}` is replaced by result fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl ResponsePolicy {
    pub fn fill_from(&mut self, other: &ResponsePolicy) {
        fill(&mut self.format, &other.format);
        fill(&mut self.template, &other.template);
    }

    pub fn builtin() -> Self {
        Self {
            format: Some(ResponseFormat::Text),
            template: None,
        }
    }

    pub fn format(&self) -> ResponseFormat {
        self.format.unwrap_or_default()
    }
}

fn fill<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if target.is_none() {
        target.clone_from(source);
    }
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}
