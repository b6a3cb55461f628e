use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use reward_chat::api;
use reward_chat::config::Config;
use reward_chat::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        "Document store: {} ({}.{})",
        config.store.data_api_url,
        config.store.database,
        config.store.collection
    );
    tracing::info!(
        "Chat model: {} / classifier: {} / embeddings: {}",
        config.llm.chat_model,
        config.llm.classifier_model,
        config.llm.embedding_model
    );

    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/chat", post(api::chat::chat))
        .route("/health", get(api::chat::health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
