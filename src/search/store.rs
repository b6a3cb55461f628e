use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::StoreConfig;

/// MongoDB Atlas Data API client for the document collection.
///
/// Issues `aggregate` pipelines over HTTPS: one `$vectorSearch` pipeline for
/// the dense channel and one `$search` pipeline for the keyword channel. The
/// underlying `reqwest::Client` pools connections, so instances are cheap to
/// clone and share across requests.
#[derive(Clone)]
pub struct DocumentStore {
    client: reqwest::Client,
    config: StoreConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateRequest {
    data_source: String,
    database: String,
    collection: String,
    pipeline: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct AggregateResponse {
    documents: Vec<serde_json::Value>,
}

impl DocumentStore {
    pub fn new(client: reqwest::Client, config: StoreConfig) -> Self {
        Self { client, config }
    }

    /// Approximate nearest-neighbor search over the embedding field.
    ///
    /// The ANN index scans `num_candidates` internal candidates before its own
    /// top-`limit` cutoff. Returns raw documents; normalization is the
    /// retriever's concern.
    pub async fn vector_search(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<serde_json::Value>> {
        let pipeline = vec![
            json!({
                "$vectorSearch": {
                    "queryVector": embedding,
                    "path": self.config.embedding_field,
                    "numCandidates": self.config.num_candidates,
                    "limit": limit,
                    "index": self.config.vector_index,
                }
            }),
            json!({
                "$project": {
                    "_id": 1,
                    "content": 1,
                    "images": 1,
                    "embedding": 1,
                    "score": { "$meta": "vectorSearchScore" },
                }
            }),
        ];

        self.aggregate(pipeline)
            .await
            .context("vector search pipeline failed")
    }

    /// Tokenized full-text search over the pre-tokenized content field.
    pub async fn keyword_search(
        &self,
        tokens: &[String],
        limit: usize,
    ) -> Result<Vec<serde_json::Value>> {
        let pipeline = vec![
            json!({
                "$search": {
                    "index": self.config.keyword_index,
                    "text": {
                        "query": tokens,
                        "path": self.config.tokenized_field,
                    }
                }
            }),
            json!({
                "$project": {
                    "_id": 1,
                    "content": 1,
                    "images": 1,
                    "embedding": 1,
                    "score": { "$meta": "searchScore" },
                }
            }),
            json!({ "$limit": limit }),
        ];

        self.aggregate(pipeline)
            .await
            .context("keyword search pipeline failed")
    }

    async fn aggregate(&self, pipeline: Vec<serde_json::Value>) -> Result<Vec<serde_json::Value>> {
        let url = format!(
            "{}/action/aggregate",
            self.config.data_api_url.trim_end_matches('/')
        );

        let req = AggregateRequest {
            data_source: self.config.data_source.clone(),
            database: self.config.database.clone(),
            collection: self.config.collection.clone(),
            pipeline,
        };

        let resp = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&req)
            .send()
            .await
            .context("failed to reach the document store")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("document store returned {status}: {body}");
        }

        let body: AggregateResponse = resp
            .json()
            .await
            .context("failed to parse document store response")?;

        Ok(body.documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_request_uses_camel_case_wire_names() {
        let req = AggregateRequest {
            data_source: "Cluster0".into(),
            database: "rewards".into(),
            collection: "documents".into(),
            pipeline: vec![json!({ "$limit": 1 })],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("dataSource").is_some());
        assert!(json.get("data_source").is_none());
    }
}
