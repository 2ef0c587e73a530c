//! End-to-end streaming tests.
//!
//! A real axum server serves the shipped action configuration; the streaming
//! client consumes `/api/chat` over HTTP through `HttpStreamTransport`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use commerce_actions::adapters::action_config::load;
use commerce_actions::adapters::http::{assistant_router, AssistantAppState};
use commerce_actions::adapters::{
    FilePreferenceStore, HttpStreamTransport, HttpTransportConfig, InMemoryCommerceBackend,
};
use commerce_actions::application::{
    commerce_handlers, ContextAssembler, ModeRegistries, RegistryDeps, StreamActionHandler,
    StreamClientConfig, StreamObserver, StreamOutcome, StreamingClient,
};
use commerce_actions::domain::actions::Mode;
use commerce_actions::domain::context::AssistantPreferences;
use commerce_actions::domain::resilience::{ClassifiedError, ErrorCode};
use commerce_actions::domain::streaming::{ChatRequest, StreamEvent, StreamState};

// =============================================================================
// Test Infrastructure
// =============================================================================

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<StreamEvent>>,
    errors: Mutex<Vec<ClassifiedError>>,
    completed: Mutex<u32>,
}

impl Recorder {
    fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(StreamEvent::kind).collect()
    }
}

impl StreamObserver for Recorder {
    fn on_event(&self, event: &StreamEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn on_error(&self, error: &ClassifiedError) {
        self.errors.lock().unwrap().push(error.clone());
    }

    fn on_complete(&self) {
        *self.completed.lock().unwrap() += 1;
    }
}

async fn start_server(dir: &TempDir) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/actions.yaml");
    let config = load(&path).await.unwrap();

    let backend = Arc::new(InMemoryCommerceBackend::with_sample_catalog());
    let deps = RegistryDeps::new(commerce_handlers(backend.clone()));
    let handler = StreamActionHandler::new(
        ModeRegistries::build(&config, &deps).unwrap(),
        ContextAssembler::new(backend),
        AssistantPreferences::default(),
    );
    let state = AssistantAppState {
        handler: Arc::new(handler),
        preferences: Arc::new(FilePreferenceStore::new(dir.path().join("prefs.yaml"))),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, assistant_router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(endpoint: String) -> StreamingClient<HttpStreamTransport> {
    let transport = HttpStreamTransport::new(
        HttpTransportConfig::new(endpoint).with_timeout(Duration::from_secs(5)),
    )
    .unwrap();
    StreamingClient::new(
        transport,
        StreamClientConfig {
            retry_attempts: 1,
            retry_delay: Duration::from_millis(10),
        },
    )
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn search_turn_streams_events_in_order() {
    let dir = TempDir::new().unwrap();
    let base = start_server(&dir).await;
    let client = client(format!("{}/api/chat", base));
    let recorder = Recorder::default();

    let outcome = client
        .connect(&ChatRequest::new("searchProducts", json!({ "query": "boots" })), &recorder)
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Completed { events: 5 });
    assert_eq!(recorder.kinds(), vec!["metadata", "actions", "content", "ui", "done"]);
    assert_eq!(*recorder.completed.lock().unwrap(), 1);
    assert!(recorder.errors.lock().unwrap().is_empty());
    assert_eq!(client.state(), StreamState::Complete);

    let events = recorder.events.lock().unwrap();
    match &events[3] {
        StreamEvent::Ui(ui) => {
            assert_eq!(ui.component.as_deref(), Some("searchProducts"));
            assert_eq!(ui.data["count"], 2);
        }
        other => panic!("expected ui event, got {:?}", other),
    }
}

#[tokio::test]
async fn failed_action_arrives_as_error_event() {
    let dir = TempDir::new().unwrap();
    let base = start_server(&dir).await;
    let client = client(format!("{}/api/chat", base));
    let recorder = Recorder::default();

    let request = ChatRequest {
        mode: Some(Mode::B2b),
        ..ChatRequest::new("placeOrder", json!({}))
    };
    let outcome = client.connect(&request, &recorder).await.unwrap();

    // The turn failed, the stream did not.
    assert!(matches!(outcome, StreamOutcome::Completed { .. }));
    assert_eq!(recorder.kinds(), vec!["metadata", "actions", "error", "done"]);

    let events = recorder.events.lock().unwrap();
    match &events[2] {
        StreamEvent::Error(e) => {
            assert_eq!(e.code, Some(ErrorCode::ValidationError));
            assert!(!e.message.contains("costCenterId"));
        }
        other => panic!("expected error event, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_endpoint_fails_without_events() {
    let dir = TempDir::new().unwrap();
    let base = start_server(&dir).await;
    let client = client(format!("{}/api/nowhere", base));
    let recorder = Recorder::default();

    let outcome = client
        .connect(&ChatRequest::new("getCart", json!({})), &recorder)
        .await
        .unwrap();

    match outcome {
        StreamOutcome::Failed(error) => assert_eq!(error.code, ErrorCode::NotFound),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(recorder.kinds().is_empty());
    assert_eq!(recorder.errors.lock().unwrap().len(), 1);
    assert_eq!(client.state(), StreamState::Failed);
}

#[tokio::test]
async fn preferences_update_switches_default_mode() {
    let dir = TempDir::new().unwrap();
    let base = start_server(&dir).await;
    let http = reqwest::Client::new();

    let response = http
        .put(format!("{}/api/preferences", base))
        .json(&json!({ "mode": "b2b", "historyLimit": 10 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(dir.path().join("prefs.yaml").exists());

    let client = client(format!("{}/api/chat", base));
    let recorder = Recorder::default();
    client
        .connect(&ChatRequest::new("getCart", json!({})), &recorder)
        .await
        .unwrap();

    let events = recorder.events.lock().unwrap();
    match &events[0] {
        StreamEvent::Metadata(m) => assert_eq!(m.mode.as_deref(), Some("b2b")),
        other => panic!("expected metadata, got {:?}", other),
    }
}
