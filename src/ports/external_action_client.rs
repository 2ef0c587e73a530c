//! External Action Client Port - calls for `external` actions.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::actions::HttpMethod;
use crate::domain::resilience::OperationError;

/// A single call to a remote action endpoint.
#[derive(Clone, PartialEq)]
pub struct ExternalRequest {
    pub action_id: String,
    pub endpoint: String,
    pub method: HttpMethod,
    pub params: Value,
    /// Customer bearer token taken from the turn's context.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for ExternalRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalRequest")
            .field("action_id", &self.action_id)
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("has_access_token", &self.access_token.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Port for invoking remote action endpoints.
///
/// Failures are reported as raw [`OperationError`]s so the registry's retry
/// policy can classify them.
#[async_trait]
pub trait ExternalActionClient: Send + Sync {
    async fn call(&self, request: ExternalRequest) -> Result<Value, OperationError>;
}
