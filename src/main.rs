use anyhow::Context;
use chat_context::{
    api::build_router, llm::LlmClient, observability::init_tracing, store::MemoryStore,
    ChatService, Config,
};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = Config::from_file(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;
    init_tracing(&config.logging);

    let llm = Arc::new(
        LlmClient::new(config.llm.clone(), config.summary.clone())
            .context("failed to build LLM client")?,
    );
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(ChatService::new(&config, store, llm.clone(), llm));

    let router = build_router(service.clone(), &config.server);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(address = %addr, "chat-context listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    service.shutdown().await;
    info!("chat-context stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
