//! HTTP handlers for assistant endpoints.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{self, StreamExt};

use crate::application::registry::ToolFormat;
use crate::application::StreamActionHandler;
use crate::domain::context::AssistantPreferences;
use crate::domain::streaming::{ChatRequest, DONE_MARKER};
use crate::ports::PreferenceStore;

use super::dto::{
    ChatResponse, ErrorResponse, HealthResponse, ListToolsQuery, ListToolsResponse,
    PreferencesResponse,
};

/// Application state for assistant endpoints.
#[derive(Clone)]
pub struct AssistantAppState {
    /// Runs chat turns against the live registries
    pub handler: Arc<StreamActionHandler>,
    /// Persists preference changes
    pub preferences: Arc<dyn PreferenceStore>,
}

/// List the tools enabled for a mode.
///
/// GET /tools?format=openai&mode=b2b
pub async fn list_tools(
    State(state): State<AssistantAppState>,
    Query(query): Query<ListToolsQuery>,
) -> Response {
    let format = match ToolFormat::from_str(&query.format) {
        Ok(format) => format,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::bad_request(message))).into_response()
        }
    };

    let Some(registry) = state.handler.registry(query.mode) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("no registry configured for that mode")),
        )
            .into_response();
    };

    let tools = registry.tools_in_format(format);
    Json(ListToolsResponse {
        mode: registry.mode(),
        version: registry.version().to_string(),
        format: query.format,
        count: tools.len(),
        tools,
    })
    .into_response()
}

/// Run a chat turn.
///
/// POST /chat
///
/// With `stream: true` the response is `text/event-stream`, one
/// `data: <event>` line per event followed by `data: [DONE]`. Otherwise the
/// events are returned as a JSON list.
pub async fn chat(
    State(state): State<AssistantAppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if !request.stream {
        let events = state.handler.handle(request).await;
        return Json(ChatResponse { events }).into_response();
    }

    let events = state
        .handler
        .clone()
        .stream(request)
        .map(|event| Event::default().json_data(&event))
        .chain(stream::once(async {
            Ok::<_, axum::Error>(Event::default().data(DONE_MARKER))
        }));

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Current preferences.
///
/// GET /preferences
pub async fn get_preferences(State(state): State<AssistantAppState>) -> impl IntoResponse {
    Json(PreferencesResponse {
        preferences: state.handler.preferences(),
    })
}

/// Validate, persist and apply new preferences.
///
/// PUT /preferences
pub async fn update_preferences(
    State(state): State<AssistantAppState>,
    Json(preferences): Json<AssistantPreferences>,
) -> Response {
    if let Err(e) = preferences.validate() {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse::bad_request(e.to_string()))).into_response();
    }

    if let Err(e) = state.preferences.save(&preferences).await {
        tracing::error!(error = %e, "Failed to save preferences");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal("failed to save preferences")),
        )
            .into_response();
    }

    state.handler.set_preferences(preferences.clone());
    Json(PreferencesResponse { preferences }).into_response()
}

/// Liveness plus the configuration version being served.
///
/// GET /health
pub async fn health(State(state): State<AssistantAppState>) -> impl IntoResponse {
    let registry = state.handler.registry(None);
    Json(HealthResponse {
        status: "ok".to_string(),
        version: registry.map(|r| r.version().to_string()).unwrap_or_default(),
        modes: state.handler.modes(),
    })
}
