use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::llm::embeddings::QueryEmbedder;
use crate::llm::router::LlmRouter;
use crate::search::hybrid::HybridRetriever;
use crate::search::store::DocumentStore;

/// Shared application state.
///
/// One pooled HTTP client serves the document store, the embedding endpoint,
/// and every LLM provider; connections are reused across requests, never
/// owned per-request.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub retriever: Arc<HybridRetriever>,
    pub llm_router: Arc<LlmRouter>,
    pub chat_semaphore: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;

        let store = DocumentStore::new(http_client.clone(), config.store.clone());
        let embedder = QueryEmbedder::new(
            http_client.clone(),
            config.llm.embedding_endpoint.clone(),
            config.llm.embedding_model.clone(),
        );
        let retriever = HybridRetriever::new(store, embedder, config.retrieval.clone());
        let llm_router = LlmRouter::new(&config.llm);

        Ok(Self {
            config,
            http_client,
            retriever: Arc::new(retriever),
            llm_router: Arc::new(llm_router),
            chat_semaphore: Arc::new(tokio::sync::Semaphore::new(3)),
        })
    }
}
