//! Axum router configuration for assistant endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    chat, get_preferences, health, list_tools, update_preferences, AssistantAppState,
};

/// Create the assistant API router.
///
/// # Routes
///
/// - `GET /tools` - List tools (query: format, mode)
/// - `POST /chat` - Run a chat turn (SSE when `stream: true`)
/// - `GET /preferences` - Current preferences
/// - `PUT /preferences` - Replace preferences
///
/// Suitable for mounting at `/api`.
pub fn assistant_routes() -> Router<AssistantAppState> {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/chat", post(chat))
        .route("/preferences", get(get_preferences).put(update_preferences))
}

/// Create the complete application router with `/api` and `/health`.
pub fn assistant_router(state: AssistantAppState) -> Router {
    Router::new()
        .nest("/api", assistant_routes())
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::commerce::InMemoryCommerceBackend;
    use crate::adapters::storage::FilePreferenceStore;
    use crate::application::{commerce_handlers, ContextAssembler, ModeRegistries, RegistryDeps, StreamActionHandler};
    use crate::domain::actions::ConfigurationFile;
    use crate::domain::context::AssistantPreferences;
    use crate::domain::streaming::{SseDecoder, SseItem};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn state(dir: &TempDir) -> AssistantAppState {
        let backend = Arc::new(InMemoryCommerceBackend::with_sample_catalog());
        let config = ConfigurationFile::from_value(json!({
            "version": "7",
            "actions": [{
                "id": "searchProducts",
                "name": "Search",
                "description": "Search the catalog",
                "category": "search",
                "parameters": { "query": { "type": "string", "required": true } },
                "implementation": { "type": "function", "handler": "searchProducts" },
                "modes": { "b2b": { "enabled": false } }
            }]
        }))
        .unwrap();
        let deps = RegistryDeps::new(commerce_handlers(backend.clone()));
        let handler = StreamActionHandler::new(
            ModeRegistries::build(&config, &deps).unwrap(),
            ContextAssembler::new(backend),
            AssistantPreferences::default(),
        );
        AssistantAppState {
            handler: Arc::new(handler),
            preferences: Arc::new(FilePreferenceStore::new(dir.path().join("prefs.yaml"))),
        }
    }

    async fn serve(dir: &TempDir) -> String {
        let state = state(dir);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, assistant_router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn lists_tools_per_mode_and_format() {
        let dir = TempDir::new().unwrap();
        let base = serve(&dir).await;
        let client = reqwest::Client::new();

        let body: Value = client
            .get(format!("{}/api/tools?format=openai", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["version"], "7");
        assert_eq!(body["tools"][0]["function"]["name"], "searchProducts");

        let body: Value = client
            .get(format!("{}/api/tools?mode=b2b", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["count"], 0);

        let status = client
            .get(format!("{}/api/tools?format=xml", base))
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn streaming_chat_ends_with_done_marker() {
        let dir = TempDir::new().unwrap();
        let base = serve(&dir).await;

        let text = reqwest::Client::new()
            .post(format!("{}/api/chat", base))
            .json(&json!({ "action": "searchProducts", "params": { "query": "boots" }, "stream": true }))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        let mut decoder = SseDecoder::new();
        let mut items = decoder.push(text.as_bytes());
        items.extend(decoder.finish());
        let kinds: Vec<&str> = items
            .iter()
            .map(|item| match item {
                SseItem::Event(e) => e.kind(),
                SseItem::Done => "[DONE]",
            })
            .collect();

        assert_eq!(kinds, vec!["metadata", "actions", "content", "done", "[DONE]"]);
    }

    #[tokio::test]
    async fn non_streaming_chat_returns_event_list() {
        let dir = TempDir::new().unwrap();
        let base = serve(&dir).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/api/chat", base))
            .json(&json!({ "action": "searchProducts", "params": {} }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let events = body["events"].as_array().unwrap();
        assert_eq!(events[2]["type"], "error");
        assert_eq!(events[2]["data"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn preferences_round_trip_and_persist() {
        let dir = TempDir::new().unwrap();
        let base = serve(&dir).await;
        let client = reqwest::Client::new();

        let response = client
            .put(format!("{}/api/preferences", base))
            .json(&json!({ "mode": "b2b", "historyLimit": 5 }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let body: Value = client
            .get(format!("{}/api/preferences", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["preferences"]["mode"], "b2b");
        assert!(dir.path().join("prefs.yaml").exists());

        let invalid = client
            .put(format!("{}/api/preferences", base))
            .json(&json!({ "historyLimit": 0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(invalid.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_version_and_modes() {
        let dir = TempDir::new().unwrap();
        let base = serve(&dir).await;

        let body: Value = reqwest::get(format!("{}/health", base)).await.unwrap().json().await.unwrap();

        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], "7");
        assert_eq!(body["modes"], json!(["b2c", "b2b"]));
    }

    #[tokio::test]
    async fn invalid_mode_query_is_rejected() {
        let dir = TempDir::new().unwrap();
        let app = assistant_router(state(&dir));

        let request = http::Request::builder()
            .uri("/api/tools?mode=b2b")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);

        let request = http::Request::builder()
            .uri("/api/tools?mode=wholesale")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
    }
}
