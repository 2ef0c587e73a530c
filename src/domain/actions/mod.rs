//! Actions module - declarative action definitions and their validation.
//!
//! A configuration file declares every action the assistant may call. This
//! module owns the typed model ([`ActionDefinition`], [`ParameterSchema`]),
//! the load-time validation pipeline ([`ConfigurationFile::from_value`]) and
//! the invocation-time checks ([`validate_parameters`], [`InputGuard`]).

mod configuration;
mod definition;
mod errors;
mod parameter;
mod response;
mod structure;
mod validation;

pub use configuration::{apply_defaults, ConfigEnvironment, ConfigurationFile, Globals, CONFIG_ENVIRONMENTS};
pub use definition::{
    ActionCategory, ActionDefinition, HttpMethod, Implementation, InputValidation, Mode, ModeConfig,
    ObservabilityPolicy, Parallelism, PerformancePolicy, RateLimitPolicy, ResponseFormat, ResponsePolicy,
    SecurityPolicy, ACTION_CATEGORIES, DEFAULT_BACKOFF_MS, DEFAULT_RETRIES, DEFAULT_TIMEOUT_MS,
    RESPONSE_FORMATS,
};
pub use errors::{ActionConfigError, ParameterViolation, SchemaViolation};
pub use parameter::{parameters_to_json_schema, ParameterKind, ParameterSchema, MAX_PARAMETER_DEPTH, PARAMETER_TYPES};
pub use response::{render, render_template};
pub use structure::check_document;
pub use validation::{validate_parameters, InputGuard, PatternSet};
