//! Main Entrypoint for the Front Desk API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the knowledge index and shared services.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use frontdesk_api::{config::Config, router::create_router, state::AppState};
use frontdesk_core::{
    callbacks::CallbackBridge,
    executor::ToolExecutor,
    knowledge::SnippetIndex,
    llm_client::{LlmClient, OpenAICompatibleClient},
    streamer::ResponseStreamer,
    tools::ToolRegistry,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let knowledge = SnippetIndex::from_file(&config.knowledge_path)
        .context("Failed to load the clinic knowledge file")?;
    if knowledge.is_empty() {
        warn!(
            path = %config.knowledge_path.display(),
            "Knowledge file contains no snippets; the information tool will come up empty"
        );
    }

    let http = reqwest::Client::new();
    let registry = Arc::new(ToolRegistry::standard());
    let callbacks = Arc::new(CallbackBridge::new(
        config.callback_max_wait,
        config.callback_poll_interval,
    ));

    let webhooks = config.webhook_config();
    if webhooks.is_none() {
        info!("Scheduling webhooks not configured; availability and booking run in offline mode");
    }
    let executor = Arc::new(ToolExecutor::new(
        registry.clone(),
        Arc::new(knowledge),
        callbacks.clone(),
        http.clone(),
        webhooks,
        config.top_k,
    ));

    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.llm_api_key)
        .with_api_base(&config.llm_api_base);
    let llm: Arc<dyn LlmClient> = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));
    let streamer = Arc::new(ResponseStreamer::new(llm, executor, registry));

    let app_state = Arc::new(AppState {
        streamer,
        callbacks,
        http,
        config: Arc::new(config.clone()),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server has shut down.");
    Ok(())
}
