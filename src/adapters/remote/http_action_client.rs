//! HTTP Action Client - executes `external` actions over HTTP.
//!
//! `POST` sends the parameters as a JSON body; `GET` flattens top-level
//! parameters into the query string. A customer access token from the turn
//! context is sent as a bearer token; the optional service key travels in
//! `X-Api-Key`.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;

use crate::domain::actions::HttpMethod;
use crate::domain::resilience::OperationError;
use crate::ports::{ExternalActionClient, ExternalRequest};

/// Configuration for [`HttpActionClient`].
#[derive(Debug, Clone, Default)]
pub struct HttpActionClientConfig {
    api_key: Option<Secret<String>>,
}

impl HttpActionClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: Secret<String>) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

/// reqwest-backed [`ExternalActionClient`].
#[derive(Debug, Clone)]
pub struct HttpActionClient {
    client: Client,
    config: HttpActionClientConfig,
}

impl HttpActionClient {
    pub fn new(config: HttpActionClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn handle_response_status(response: Response) -> Result<Response, OperationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(OperationError::http(status.as_u16(), body))
    }
}

fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = params else {
        return Vec::new();
    };
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

#[async_trait]
impl ExternalActionClient for HttpActionClient {
    async fn call(&self, request: ExternalRequest) -> Result<Value, OperationError> {
        let builder = match request.method {
            HttpMethod::Get => self
                .client
                .get(&request.endpoint)
                .query(&query_pairs(&request.params)),
            HttpMethod::Post => self.client.post(&request.endpoint).json(&request.params),
        };

        let mut builder = builder
            .timeout(request.timeout)
            .header("Accept", "application/json");
        if let Some(token) = &request.access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = &self.config.api_key {
            builder = builder.header("X-Api-Key", key.expose_secret().as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                OperationError::timeout(request.timeout.as_millis() as u64)
            } else {
                OperationError::network(e.to_string())
            }
        })?;
        let response = Self::handle_response_status(response).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| OperationError::network(e.to_string()))?;
        if body.is_empty() {
            return Ok(Value::Null);
        }

        tracing::debug!(action = %request.action_id, bytes = body.len(), "External action responded");
        serde_json::from_slice(&body)
            .map_err(|e| OperationError::other(format!("invalid JSON from {}: {}", request.endpoint, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resilience::{classify, ErrorCode};
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn request(endpoint: String, method: HttpMethod, params: Value) -> ExternalRequest {
        ExternalRequest {
            action_id: "quote".into(),
            endpoint,
            method,
            params,
            access_token: Some("tok-123".into()),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn post_sends_body_and_credentials() {
        let router = Router::new().route(
            "/quote",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                Json(json!({
                    "auth": headers.get("authorization").and_then(|v| v.to_str().ok()),
                    "key": headers.get("x-api-key").and_then(|v| v.to_str().ok()),
                    "sku": body["sku"],
                }))
            }),
        );
        let base = serve(router).await;
        let client = HttpActionClient::new(
            HttpActionClientConfig::new().with_api_key(Secret::new("svc-key".to_string())),
        );

        let value = client
            .call(request(format!("{}/quote", base), HttpMethod::Post, json!({ "sku": "A1" })))
            .await
            .unwrap();

        assert_eq!(value, json!({ "auth": "Bearer tok-123", "key": "svc-key", "sku": "A1" }));
    }

    #[tokio::test]
    async fn get_flattens_params_into_query() {
        let router = Router::new().route(
            "/stock",
            get(|Query(q): Query<HashMap<String, String>>| async move { Json(json!(q)) }),
        );
        let base = serve(router).await;

        let value = HttpActionClient::new(HttpActionClientConfig::new())
            .call(request(
                format!("{}/stock", base),
                HttpMethod::Get,
                json!({ "sku": "A1", "qty": 3, "skip": null }),
            ))
            .await
            .unwrap();

        assert_eq!(value, json!({ "sku": "A1", "qty": "3" }));
    }

    #[tokio::test]
    async fn error_status_is_classifiable() {
        let router = Router::new().route(
            "/quote",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = serve(router).await;

        let err = HttpActionClient::new(HttpActionClientConfig::new())
            .call(request(format!("{}/quote", base), HttpMethod::Post, json!({})))
            .await
            .unwrap_err();

        assert_eq!(err, OperationError::http(429, "slow down"));
        assert_eq!(classify(&err).code, ErrorCode::RateLimit);
    }

    #[tokio::test]
    async fn empty_body_is_null() {
        let router = Router::new().route("/ping", post(|| async { StatusCode::NO_CONTENT }));
        let base = serve(router).await;

        let value = HttpActionClient::new(HttpActionClientConfig::new())
            .call(request(format!("{}/ping", base), HttpMethod::Post, json!({})))
            .await
            .unwrap();

        assert_eq!(value, Value::Null);
    }
}
