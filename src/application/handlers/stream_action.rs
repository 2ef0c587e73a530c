//! StreamActionHandler - runs one turn and produces its stream events.
//!
//! Event order for a successful turn:
//! `metadata → actions → content → [ui] → done`.
//! A failed turn emits `metadata → actions → error → done`; a request that
//! never reaches the registry skips `actions`. The `actions` event of a
//! successful turn carries the context delta for the caller's next request.

use std::sync::{Arc, RwLock};

use futures::channel::mpsc;
use futures::Stream;
use uuid::Uuid;

use crate::application::registry::{ActionRegistry, ModeRegistries};
use crate::application::ContextAssembler;
use crate::domain::actions::{render, Mode, ResponseFormat};
use crate::domain::context::{AssistantPreferences, ContextDelta};
use crate::domain::foundation::Timestamp;
use crate::domain::resilience::{ClassifiedError, ErrorCode};
use crate::domain::streaming::{
    ActionStatus, ActionsPayload, ChatRequest, InvocationStatus, MetadataPayload, StreamEvent,
    UiPayload,
};

/// Handler for chat turns.
pub struct StreamActionHandler {
    registries: ModeRegistries,
    assembler: ContextAssembler,
    preferences: RwLock<AssistantPreferences>,
}

impl StreamActionHandler {
    pub fn new(
        registries: ModeRegistries,
        assembler: ContextAssembler,
        preferences: AssistantPreferences,
    ) -> Self {
        Self {
            registries,
            assembler,
            preferences: RwLock::new(preferences),
        }
    }

    pub fn preferences(&self) -> AssistantPreferences {
        self.preferences
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Preferences used by turns that start after this call.
    pub fn set_preferences(&self, preferences: AssistantPreferences) {
        *self
            .preferences
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = preferences;
    }

    /// Registry serving `mode`, or the preferred mode when `None`.
    pub fn registry(&self, mode: Option<Mode>) -> Option<Arc<ActionRegistry>> {
        self.registries.get(mode.unwrap_or(self.preferences().mode))
    }

    /// Modes with a registry.
    pub fn modes(&self) -> Vec<Mode> {
        self.registries.modes().collect()
    }

    /// Runs the turn and returns every event at once.
    pub async fn handle(&self, request: ChatRequest) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        self.run(request, &mut |event| events.push(event)).await;
        events
    }

    /// Runs the turn on a background task, yielding events as they are produced.
    pub fn stream(self: Arc<Self>, request: ChatRequest) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let (tx, rx) = mpsc::unbounded();
        tokio::spawn(async move {
            self.run(request, &mut |event| {
                if tx.unbounded_send(event).is_err() {
                    tracing::debug!("Stream consumer went away");
                }
            })
            .await;
        });
        rx
    }

    async fn run(&self, request: ChatRequest, emit: &mut (dyn FnMut(StreamEvent) + Send)) {
        let request_id = Uuid::new_v4().to_string();
        let preferences = self.preferences();
        let mode = request.mode.unwrap_or(preferences.mode);

        emit(StreamEvent::Metadata(MetadataPayload {
            request_id: Some(request_id.clone()),
            action_id: Some(request.action.clone()),
            mode: Some(mode.to_string()),
            timestamp: Some(Timestamp::now().to_string()),
        }));

        if let Err(e) = request.validate() {
            fail(emit, &ClassifiedError::new(ErrorCode::ValidationError, e.to_string()));
            return;
        }

        let Some(registry) = self.registries.get(mode) else {
            let classified = ClassifiedError::new(
                ErrorCode::NotFound,
                format!("no registry configured for mode {}", mode),
            );
            fail(emit, &classified);
            return;
        };

        let context = self.assembler.assemble(&request, &preferences).await;
        let result = registry.invoke(&request.action, request.params.clone(), &context).await;

        let (status, delta) = match &result {
            Ok(output) => (
                InvocationStatus::Completed,
                ContextDelta::default()
                    .with_last_action(request.action.clone())
                    .merge(output.delta.clone()),
            ),
            Err(_) => (InvocationStatus::Failed, ContextDelta::default()),
        };
        emit(StreamEvent::Actions(ActionsPayload {
            actions: vec![ActionStatus {
                id: request.action.clone(),
                status,
            }],
            context: delta,
        }));

        match result {
            Ok(output) => {
                let format = registry
                    .definition(&request.action)
                    .map(|d| (d.response.format(), render(&d.response, &output.data)));
                let (format, text) = format.unwrap_or((ResponseFormat::Text, String::new()));

                emit(StreamEvent::content(text));
                if format == ResponseFormat::Json {
                    emit(StreamEvent::Ui(UiPayload {
                        component: Some(request.action.clone()),
                        data: output.data,
                    }));
                }
                emit(StreamEvent::done());
            }
            Err(e) => {
                let classified = e.classify();
                tracing::warn!(
                    request_id = %request_id,
                    action = %request.action,
                    code = %classified.code,
                    error = %classified.technical_message,
                    "Turn failed"
                );
                fail(emit, &classified);
            }
        }
    }
}

fn fail(emit: &mut (dyn FnMut(StreamEvent) + Send), classified: &ClassifiedError) {
    emit(StreamEvent::error(classified));
    emit(StreamEvent::done());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::commerce::InMemoryCommerceBackend;
    use crate::application::handlers::commerce_handlers;
    use crate::application::registry::RegistryDeps;
    use crate::domain::actions::ConfigurationFile;
    use crate::domain::context::AssistantContext;
    use crate::ports::{ActionOutput, FnHandler};
    use futures::StreamExt;
    use serde_json::json;

    fn handler() -> StreamActionHandler {
        let backend = Arc::new(InMemoryCommerceBackend::with_sample_catalog());
        let config = ConfigurationFile::from_value(json!({
            "version": "1",
            "actions": [
                {
                    "id": "searchProducts",
                    "name": "Search",
                    "description": "Search the catalog",
                    "category": "search",
                    "parameters": { "query": { "type": "string", "required": true } },
                    "implementation": { "type": "function", "handler": "searchProducts" },
                    "response": { "format": "json" }
                },
                {
                    "id": "getCart",
                    "name": "Cart",
                    "description": "Show the cart",
                    "category": "cart",
                    "implementation": { "type": "function", "handler": "getCart" },
                    "modes": { "b2b": { "enabled": false } }
                }
            ]
        }))
        .unwrap();
        let deps = RegistryDeps::new(commerce_handlers(backend.clone()));
        StreamActionHandler::new(
            ModeRegistries::build(&config, &deps).unwrap(),
            ContextAssembler::new(backend),
            AssistantPreferences::default(),
        )
    }

    fn kinds(events: &[StreamEvent]) -> Vec<&'static str> {
        events.iter().map(StreamEvent::kind).collect()
    }

    #[tokio::test]
    async fn successful_turn_emits_full_sequence() {
        let events = handler()
            .handle(ChatRequest::new("searchProducts", json!({ "query": "boots" })))
            .await;

        assert_eq!(kinds(&events), vec!["metadata", "actions", "content", "ui", "done"]);
        match &events[0] {
            StreamEvent::Metadata(m) => {
                assert_eq!(m.action_id.as_deref(), Some("searchProducts"));
                assert_eq!(m.mode.as_deref(), Some("b2c"));
                assert!(m.request_id.is_some());
            }
            other => panic!("expected metadata, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn text_format_skips_ui_event() {
        let events = handler().handle(ChatRequest::new("getCart", json!({}))).await;
        assert_eq!(kinds(&events), vec!["metadata", "actions", "content", "done"]);
    }

    #[tokio::test]
    async fn validation_failure_emits_sanitized_error() {
        let events = handler().handle(ChatRequest::new("searchProducts", json!({}))).await;

        assert_eq!(kinds(&events), vec!["metadata", "actions", "error", "done"]);
        match &events[2] {
            StreamEvent::Error(e) => {
                assert_eq!(e.code, Some(ErrorCode::ValidationError));
                assert!(!e.message.contains("query"));
                assert!(!e.recoverable);
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn request_mode_selects_registry() {
        let request = ChatRequest {
            mode: Some(Mode::B2b),
            ..ChatRequest::new("getCart", json!({}))
        };
        let events = handler().handle(request).await;

        match &events[2] {
            StreamEvent::Error(e) => assert_eq!(e.code, Some(ErrorCode::NotFound)),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn preferences_change_default_mode() {
        let handler = handler();
        handler.set_preferences(AssistantPreferences {
            mode: Mode::B2b,
            ..Default::default()
        });

        assert_eq!(handler.registry(None).unwrap().mode(), Mode::B2b);
        let events = handler.handle(ChatRequest::new("getCart", json!({}))).await;
        assert_eq!(kinds(&events), vec!["metadata", "actions", "error", "done"]);
    }

    fn turn_context(events: &[StreamEvent]) -> ContextDelta {
        events
            .iter()
            .find_map(|event| match event {
                StreamEvent::Actions(payload) => Some(payload.context.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn context_delta_flows_into_next_turn() {
        let backend = Arc::new(InMemoryCommerceBackend::with_sample_catalog());
        let config = ConfigurationFile::from_value(json!({
            "version": "1",
            "actions": [
                {
                    "id": "addToCart",
                    "name": "Add",
                    "description": "Add a product",
                    "category": "cart",
                    "parameters": {
                        "productId": { "type": "string", "required": true },
                        "quantity": { "type": "number", "default": 1 }
                    },
                    "implementation": { "type": "function", "handler": "addToCart" }
                },
                {
                    "id": "recall",
                    "name": "Recall",
                    "description": "Echo the previous action",
                    "category": "cart",
                    "implementation": { "type": "function", "handler": "recall" }
                }
            ]
        }))
        .unwrap();
        let recall = FnHandler::shared(|_: serde_json::Value, context: AssistantContext| async move {
            Ok(ActionOutput::new(json!({ "previous": context.last_action })))
        });
        let handlers = commerce_handlers(backend.clone()).with("recall", recall);
        let handler = StreamActionHandler::new(
            ModeRegistries::build(&config, &RegistryDeps::new(handlers)).unwrap(),
            ContextAssembler::new(backend),
            AssistantPreferences::default(),
        );

        let first = handler
            .handle(ChatRequest {
                session_id: Some("s-9".into()),
                ..ChatRequest::new("addToCart", json!({ "productId": "boot-001" }))
            })
            .await;
        let delta = turn_context(&first);
        assert_eq!(delta.last_action.as_deref(), Some("addToCart"));
        assert_eq!(delta.cart_items.as_ref().map(Vec::len), Some(1));

        let second = handler
            .handle(
                ChatRequest {
                    session_id: Some("s-9".into()),
                    ..ChatRequest::new("recall", json!({}))
                }
                .with_context(&delta),
            )
            .await;
        assert_eq!(kinds(&second), vec!["metadata", "actions", "content", "done"]);
        match &second[2] {
            StreamEvent::Content(c) => assert!(c.text.contains("addToCart"), "{}", c.text),
            other => panic!("expected content, got {:?}", other),
        }
        assert_eq!(turn_context(&second).last_action.as_deref(), Some("recall"));
    }

    #[tokio::test]
    async fn failed_turn_reports_no_context_change() {
        let events = handler().handle(ChatRequest::new("searchProducts", json!({}))).await;
        assert!(turn_context(&events).is_empty());
    }

    #[tokio::test]
    async fn blank_action_never_reaches_registry() {
        let events = handler().handle(ChatRequest::new(" ", json!({}))).await;
        assert_eq!(kinds(&events), vec!["metadata", "error", "done"]);
    }

    #[tokio::test]
    async fn stream_yields_same_events() {
        let handler = Arc::new(handler());
        let events: Vec<StreamEvent> = handler
            .stream(ChatRequest::new("getCart", json!({})))
            .collect()
            .await;
        assert_eq!(kinds(&events), vec!["metadata", "actions", "content", "done"]);
    }
}
