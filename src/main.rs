//! commerce-actions server and streaming client.

use std::io::Write;
use std::sync::Arc;

use axum::http::HeaderValue;
use clap::{Parser, Subcommand};
use thiserror::Error;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commerce_actions::adapters::action_config::{load, ConfigWatcher};
use commerce_actions::adapters::http::{assistant_router, AssistantAppState};
use commerce_actions::adapters::{
    FilePreferenceStore, HttpActionClient, HttpActionClientConfig, HttpStreamTransport,
    HttpTransportConfig, InMemoryCommerceBackend,
};
use commerce_actions::application::registry::RegistryError;
use commerce_actions::application::{
    commerce_handlers, ContextAssembler, ModeRegistries, RegistryDeps, StreamActionHandler,
    StreamClientConfig, StreamObserver, StreamOutcome, StreamingClient,
};
use commerce_actions::config::{AppConfig, ConfigError, ValidationError};
use commerce_actions::domain::actions::{ActionConfigError, Mode};
use commerce_actions::domain::context::AssistantPreferences;
use commerce_actions::domain::resilience::ClassifiedError;
use commerce_actions::domain::streaming::{ChatRequest, StreamEvent};
use commerce_actions::ports::{PreferenceStore, PreferenceStoreError, TransportError};

#[derive(Parser)]
#[command(name = "commerce-actions")]
#[command(about = "Configuration-driven action engine for conversational commerce", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the action API (default)
    Serve,
    /// Stream one turn from a running server and print its events
    Chat {
        /// Action id to invoke
        action: String,
        /// Action parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
        /// Mode override for this turn
        #[arg(long)]
        mode: Option<Mode>,
        /// Chat endpoint; defaults to the configured streaming endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to load action configuration: {0}")]
    Actions(#[from] ActionConfigError),

    #[error("Failed to build action registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("Failed to load preferences: {0}")]
    Preferences(#[from] PreferenceStoreError),

    #[error("Streaming transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid --params: {0}")]
    Params(#[from] serde_json::Error),

    #[error("No streaming endpoint configured; pass --endpoint or set COMMERCE_ACTIONS__STREAMING__ENDPOINT")]
    MissingEndpoint,

    #[error("Stream failed: {0}")]
    Stream(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Chat {
            action,
            params,
            mode,
            endpoint,
        } => chat(config, action, &params, mode, endpoint).await,
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(config: AppConfig) -> Result<(), StartupError> {
    let addr = config.server.socket_addr()?;

    let store = Arc::new(FilePreferenceStore::new(&config.context.preferences_path));
    let preferences = if store.path().exists() {
        store.load().await?
    } else {
        AssistantPreferences {
            mode: config.actions.mode,
            history_limit: config.context.history_limit,
            ..Default::default()
        }
    };

    let backend = Arc::new(InMemoryCommerceBackend::with_sample_catalog());
    let mut client_config = HttpActionClientConfig::new();
    if let Some(key) = config.actions.external_api_key.clone() {
        client_config = client_config.with_api_key(key);
    }
    let deps = RegistryDeps::new(commerce_handlers(backend.clone()))
        .with_external(Arc::new(HttpActionClient::new(client_config)));

    let action_path = config.actions.path();
    let actions = load(&action_path).await?;
    let registries = ModeRegistries::build(&actions, &deps)?;
    tracing::info!(
        path = %action_path.display(),
        version = %actions.version,
        modes = ?registries.modes().collect::<Vec<_>>(),
        "Action registries ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher_task = if config.actions.watch {
        let watcher = ConfigWatcher::new(
            &action_path,
            registries.clone(),
            deps,
            config.actions.watch_interval(),
        )
        .await;
        Some(tokio::spawn(async move { watcher.run(shutdown_rx).await }))
    } else {
        None
    };

    let handler = Arc::new(StreamActionHandler::new(
        registries,
        ContextAssembler::new(backend),
        preferences,
    ));
    let state = AssistantAppState {
        handler,
        preferences: store,
    };

    let app = assistant_router(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(task) = watcher_task {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Configuration watcher task ended abnormally");
        }
    }
    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .allowed_origins()
        .into_iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() && !config.is_production() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}

/// Prints each event as one JSON line.
struct PrintObserver;

impl StreamObserver for PrintObserver {
    fn on_event(&self, event: &StreamEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{}", line);
        }
    }

    fn on_error(&self, error: &ClassifiedError) {
        eprintln!("error [{}]: {}", error.code, error.user_message);
    }

    fn on_complete(&self) {}
}

async fn chat(
    config: AppConfig,
    action: String,
    params: &str,
    mode: Option<Mode>,
    endpoint: Option<String>,
) -> Result<(), StartupError> {
    let endpoint = endpoint
        .or_else(|| config.streaming.endpoint.clone())
        .ok_or(StartupError::MissingEndpoint)?;

    let transport = HttpStreamTransport::new(
        HttpTransportConfig::new(endpoint).with_timeout(config.streaming.request_timeout()),
    )?;
    let client = StreamingClient::new(
        transport,
        StreamClientConfig {
            retry_attempts: config.streaming.retry_attempts,
            retry_delay: config.streaming.retry_delay(),
        },
    );

    let request = ChatRequest {
        mode,
        ..ChatRequest::new(action, serde_json::from_str(params)?)
    };

    let outcome = tokio::select! {
        outcome = client.connect(&request, &PrintObserver) => outcome,
        _ = tokio::signal::ctrl_c() => {
            client.disconnect();
            return Ok(());
        }
    };

    match outcome {
        Ok(StreamOutcome::Completed { events }) => {
            tracing::debug!(events, "Stream complete");
            Ok(())
        }
        Ok(StreamOutcome::Aborted) => Ok(()),
        Ok(StreamOutcome::Failed(error)) => Err(StartupError::Stream(error.technical_message)),
        Err(e) => Err(StartupError::Stream(e.to_string())),
    }
}
