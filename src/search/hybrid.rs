use anyhow::{Context, Result};

use crate::config::RetrievalConfig;
use crate::llm::embeddings::QueryEmbedder;
use crate::models::Document;
use crate::search::fusion::{weighted_reciprocal_rank, FusionConfig};
use crate::search::store::DocumentStore;
use crate::search::tokenize::QueryTokenizer;

/// Dual-channel retriever: dense vector search plus tokenized keyword search,
/// merged by weighted reciprocal rank fusion.
///
/// Fails soft: every downstream error (embedding, either store query, fusion
/// input) is logged with the query text and resolved to an empty result. The
/// caller must treat empty as "no relevant documents", not as a hard failure.
pub struct HybridRetriever {
    store: DocumentStore,
    embedder: QueryEmbedder,
    tokenizer: QueryTokenizer,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(store: DocumentStore, embedder: QueryEmbedder, config: RetrievalConfig) -> Self {
        Self {
            store,
            embedder,
            tokenizer: QueryTokenizer::new(),
            config,
        }
    }

    /// Minimal integration surface for the chat layer: fused content strings
    /// only, using the configured defaults for `top_k` and `exact_top_k`.
    pub async fn search_documents(&self, query: &str) -> Vec<String> {
        self.search(query, self.config.top_k, self.config.exact_top_k)
            .await
            .into_iter()
            .map(|doc| doc.content_str().to_string())
            .collect()
    }

    /// Full hybrid search. `top_k` caps each channel and the fused set;
    /// `exact_top_k` is how many records are actually returned, shrunk to the
    /// fused size when fewer unique documents exist.
    pub async fn search(&self, query: &str, top_k: usize, exact_top_k: usize) -> Vec<Document> {
        match self.try_search(query, top_k, exact_top_k).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::error!(query, "hybrid search failed: {e:#}");
                Vec::new()
            }
        }
    }

    async fn try_search(
        &self,
        query: &str,
        top_k: usize,
        exact_top_k: usize,
    ) -> Result<Vec<Document>> {
        let embedding = self
            .embedder
            .embed(query)
            .await
            .context("query embedding failed")?;
        if embedding.is_empty() {
            // No vector invalidates the dense channel; the current contract
            // treats that as a full-query failure rather than degrading to
            // sparse-only retrieval.
            tracing::error!(query, "embedder returned an empty vector, aborting search");
            return Ok(Vec::new());
        }

        let tokens = self.tokenizer.tokenize(query);
        tracing::debug!(query, ?tokens, "keyword search tokens");

        // Independent channels; fusion needs both, so wait for both.
        let (dense_raw, sparse_raw) = tokio::try_join!(
            self.store.vector_search(&embedding, top_k),
            self.store.keyword_search(&tokens, top_k),
        )?;
        tracing::info!(
            query,
            dense = dense_raw.len(),
            sparse = sparse_raw.len(),
            "hybrid channels returned"
        );

        let dense = normalize_results(dense_raw);
        let sparse = normalize_results(sparse_raw);

        let fusion = FusionConfig {
            rank_penalty: self.config.rrf_c,
            weights: self.config.weights.clone(),
        };
        let mut fused = weighted_reciprocal_rank(&[dense, sparse], &fusion, top_k);

        // Never request more than is available.
        fused.truncate(exact_top_k.min(fused.len()));
        Ok(fused)
    }
}

/// Normalize raw store documents into the uniform record shape the fuser
/// expects. Records without a usable id are dropped with a warning.
fn normalize_results(raw: Vec<serde_json::Value>) -> Vec<Document> {
    raw.into_iter().filter_map(normalize_doc).collect()
}

fn normalize_doc(raw: serde_json::Value) -> Option<Document> {
    let serde_json::Value::Object(mut fields) = raw else {
        tracing::warn!("dropping non-object store result");
        return None;
    };

    let id = match fields.remove("_id").and_then(stringify_id) {
        Some(id) => id,
        None => {
            tracing::warn!("dropping store result with missing _id");
            return None;
        }
    };

    let content = match fields.remove("content") {
        // Missing content defaults to empty; JSON null is preserved so the
        // fuser can exclude the record.
        None => Some(String::new()),
        Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => {
            tracing::warn!(%id, "coercing non-string content to its JSON form");
            Some(other.to_string())
        }
    };

    let score = fields
        .remove("score")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);

    // Whatever is left (images, raw embedding, ...) rides along untouched.
    Some(Document {
        id,
        content,
        auxiliary: fields,
        score,
    })
}

/// Stringify a raw `_id`, including the Data API's `{"$oid": "..."}` form.
fn stringify_id(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Object(map) => match map.get("$oid").and_then(|v| v.as_str()) {
            Some(oid) => Some(oid.to_string()),
            None => Some(serde_json::Value::Object(map).to_string()),
        },
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_plain_string_id() {
        let doc = normalize_doc(json!({"_id": "abc", "content": "text", "score": 0.8})).unwrap();
        assert_eq!(doc.id, "abc");
        assert_eq!(doc.content.as_deref(), Some("text"));
        assert_eq!(doc.score, 0.8);
    }

    #[test]
    fn test_normalize_oid_wrapper() {
        let doc =
            normalize_doc(json!({"_id": {"$oid": "665f1c2ab3"}, "content": "text"})).unwrap();
        assert_eq!(doc.id, "665f1c2ab3");
    }

    #[test]
    fn test_normalize_numeric_id_stringified() {
        let doc = normalize_doc(json!({"_id": 42, "content": "text"})).unwrap();
        assert_eq!(doc.id, "42");
    }

    #[test]
    fn test_normalize_missing_id_dropped() {
        assert!(normalize_doc(json!({"content": "orphan"})).is_none());
        assert!(normalize_doc(json!({"_id": null, "content": "orphan"})).is_none());
    }

    #[test]
    fn test_normalize_missing_content_defaults_empty() {
        let doc = normalize_doc(json!({"_id": "a"})).unwrap();
        assert_eq!(doc.content.as_deref(), Some(""));
    }

    #[test]
    fn test_normalize_null_content_preserved_as_none() {
        let doc = normalize_doc(json!({"_id": "a", "content": null})).unwrap();
        assert!(doc.content.is_none());
    }

    #[test]
    fn test_normalize_non_string_content_coerced() {
        let doc = normalize_doc(json!({"_id": "a", "content": {"k": 1}})).unwrap();
        assert_eq!(doc.content.as_deref(), Some(r#"{"k":1}"#));
        let doc = normalize_doc(json!({"_id": "a", "content": 7})).unwrap();
        assert_eq!(doc.content.as_deref(), Some("7"));
    }

    #[test]
    fn test_normalize_auxiliary_passthrough() {
        let doc = normalize_doc(json!({
            "_id": "a",
            "content": "text",
            "images": ["p1.png"],
            "embedding": [0.1, 0.2],
        }))
        .unwrap();
        assert_eq!(doc.auxiliary.get("images"), Some(&json!(["p1.png"])));
        assert_eq!(doc.auxiliary.get("embedding"), Some(&json!([0.1, 0.2])));
        assert!(doc.auxiliary.get("content").is_none());
        assert!(doc.auxiliary.get("score").is_none());
    }

    #[test]
    fn test_normalize_results_filters_bad_records() {
        let raw = vec![
            json!({"_id": "keep", "content": "x"}),
            json!({"content": "no id"}),
            json!("not an object"),
        ];
        let docs = normalize_results(raw);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "keep");
    }
}
