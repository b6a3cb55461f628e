use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Document store (MongoDB Atlas Data API) configuration
    pub store: StoreConfig,
    /// Retrieval and fusion knobs
    pub retrieval: RetrievalConfig,
    /// Hosted LLM configuration
    pub llm: LlmConfig,
}

/// MongoDB Atlas Data API settings for the document collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Data API endpoint, e.g. "https://data.mongodb-api.com/app/<id>/endpoint/data/v1"
    pub data_api_url: String,
    /// Data API key
    pub api_key: String,
    /// Named deployment the Data API routes to
    pub data_source: String,
    pub database: String,
    pub collection: String,
    /// Atlas Vector Search index name
    pub vector_index: String,
    /// Atlas Search (keyword) index name
    pub keyword_index: String,
    /// Field holding the dense embedding
    pub embedding_field: String,
    /// Field holding the pre-tokenized text for keyword search
    pub tokenized_field: String,
    /// Internal candidate pool scanned by the ANN index before its own cutoff
    pub num_candidates: usize,
}

/// Knobs for the hybrid retriever and the rank fuser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates requested per channel and kept after fusion
    pub top_k: usize,
    /// Records actually handed to the generation prompt
    pub exact_top_k: usize,
    /// RRF rank-penalty constant
    pub rrf_c: f64,
    /// Per-list fusion weights: [vector, keyword]
    pub weights: Vec<f64>,
}

/// A provider endpoint speaking the OpenAI chat-completions wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Endpoint used when no route prefix matches a model name
    pub default_endpoint: Endpoint,
    /// Model-name-prefix routes, checked in order
    pub routes: Vec<(String, Endpoint)>,
    /// Model for the RAG yes/no classification and search-query generation
    pub classifier_model: String,
    /// Model for answer generation
    pub chat_model: String,
    /// Embedding endpoint and model for the dense query vector
    pub embedding_endpoint: Endpoint,
    pub embedding_model: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_api_url: "http://localhost:3000".to_string(),
            api_key: String::new(),
            data_source: "Cluster0".to_string(),
            database: "rewards".to_string(),
            collection: "documents".to_string(),
            vector_index: "default".to_string(),
            keyword_index: "default".to_string(),
            embedding_field: "embedding".to_string(),
            tokenized_field: "content_tokenized".to_string(),
            num_candidates: 10_000,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 100,
            exact_top_k: 15,
            rrf_c: 60.0,
            weights: vec![1.0, 1.0],
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_endpoint: Endpoint {
                base_url: "http://localhost:11434/v1".to_string(),
                api_key: None,
            },
            routes: Vec::new(),
            classifier_model: "llama3.2".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_endpoint: Endpoint {
                base_url: "http://localhost:11434/v1".to_string(),
                api_key: None,
            },
            embedding_model: "bge-m3".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            store: StoreConfig::default(),
            retrieval: RetrievalConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("CHAT_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Ok(url) = std::env::var("MONGO_DATA_API_URL") {
            config.store.data_api_url = url;
        }
        if let Ok(key) = std::env::var("MONGO_DATA_API_KEY") {
            config.store.api_key = key;
        }
        if let Ok(source) = std::env::var("MONGO_DATA_SOURCE") {
            config.store.data_source = source;
        }
        if let Ok(db) = std::env::var("MONGO_DATABASE") {
            config.store.database = db;
        }
        if let Ok(coll) = std::env::var("MONGO_COLLECTION") {
            config.store.collection = coll;
        }
        if let Ok(idx) = std::env::var("MONGO_VECTOR_INDEX") {
            config.store.vector_index = idx;
        }
        if let Ok(idx) = std::env::var("MONGO_KEYWORD_INDEX") {
            config.store.keyword_index = idx;
        }
        if let Ok(val) = std::env::var("MONGO_NUM_CANDIDATES") {
            if let Ok(v) = val.parse() {
                config.store.num_candidates = v;
            }
        }

        if let Ok(val) = std::env::var("RETRIEVAL_TOP_K") {
            if let Ok(v) = val.parse() {
                config.retrieval.top_k = v;
            }
        }
        if let Ok(val) = std::env::var("RETRIEVAL_EXACT_TOP_K") {
            if let Ok(v) = val.parse() {
                config.retrieval.exact_top_k = v;
            }
        }
        if let Ok(val) = std::env::var("RETRIEVAL_RRF_C") {
            if let Ok(v) = val.parse() {
                config.retrieval.rrf_c = v;
            }
        }
        // Comma-separated [vector, keyword] weights, e.g. "1.0,0.7"
        if let Ok(val) = std::env::var("RETRIEVAL_WEIGHTS") {
            let weights: Result<Vec<f64>, _> =
                val.split(',').map(|w| w.trim().parse()).collect();
            if let Ok(weights) = weights {
                config.retrieval.weights = weights;
            }
        }

        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.default_endpoint.base_url = url.clone();
            config.llm.embedding_endpoint.base_url = url;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.default_endpoint.api_key = Some(key.clone());
            config.llm.embedding_endpoint.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("LLM_CLASSIFIER_MODEL") {
            config.llm.classifier_model = model;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(url) = std::env::var("LLM_EMBEDDING_BASE_URL") {
            config.llm.embedding_endpoint.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }

        // Optional per-provider routes keyed by model-name prefix
        for (prefix, url_var, key_var) in [
            ("gpt-", "OPENAI_BASE_URL", "OPENAI_API_KEY"),
            ("gemini-", "GEMINI_BASE_URL", "GEMINI_API_KEY"),
            ("typhoon-", "TYPHOON_BASE_URL", "TYPHOON_API_KEY"),
        ] {
            if let Ok(key) = std::env::var(key_var) {
                let base_url = std::env::var(url_var)
                    .unwrap_or_else(|_| default_route_url(prefix).to_string());
                config
                    .llm
                    .routes
                    .push((prefix.to_string(), Endpoint { base_url, api_key: Some(key) }));
            }
        }

        config
    }
}

fn default_route_url(prefix: &str) -> &'static str {
    match prefix {
        "gpt-" => "https://api.openai.com/v1",
        "gemini-" => "https://generativelanguage.googleapis.com/v1beta/openai",
        _ => "http://localhost:11434/v1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_design_constants() {
        let config = Config::default();
        assert_eq!(config.retrieval.top_k, 100);
        assert_eq!(config.retrieval.exact_top_k, 15);
        assert_eq!(config.retrieval.rrf_c, 60.0);
        assert_eq!(config.retrieval.weights, vec![1.0, 1.0]);
        assert_eq!(config.store.num_candidates, 10_000);
        assert_eq!(config.store.tokenized_field, "content_tokenized");
    }
}
