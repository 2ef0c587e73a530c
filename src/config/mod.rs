//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `COMMERCE_ACTIONS` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use commerce_actions::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Serving actions from {}", config.actions.config_path);
//! ```

mod actions;
mod context;
mod error;
mod server;
mod streaming;

pub use actions::ActionsConfig;
pub use context::ContextConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use streaming::StreamingConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// development configuration. Load using [`AppConfig::load()`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Action configuration file and reload behavior
    #[serde(default)]
    pub actions: ActionsConfig,

    /// Streaming client settings
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Context assembly and preference storage
    #[serde(default)]
    pub context: ContextConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `COMMERCE_ACTIONS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `COMMERCE_ACTIONS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `COMMERCE_ACTIONS__ACTIONS__CONFIG_PATH=...` -> `actions.config_path = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("COMMERCE_ACTIONS")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.actions.validate()?;
        self.streaming.validate(self.is_production())?;
        self.context.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
