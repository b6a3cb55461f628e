use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::Endpoint;

/// Longest query we will send to the embedding API. Queries are conversation
/// turns, not documents, so this is generous; the cap only guards against a
/// pathological request blowing the model's context window.
const MAX_EMBED_CHARS: usize = 3_000;

/// Turns free text into a fixed-length vector via an OpenAI-compatible
/// `/embeddings` endpoint.
///
/// An explicitly constructed dependency rather than ambient global state: the
/// retriever receives an instance, which keeps it testable against a mock
/// endpoint. The contract is fallible; callers must treat an error (or an
/// empty vector) as "no dense channel".
#[derive(Clone)]
pub struct QueryEmbedder {
    client: reqwest::Client,
    endpoint: Endpoint,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

impl QueryEmbedder {
    pub fn new(client: reqwest::Client, endpoint: Endpoint, model: String) -> Self {
        Self {
            client,
            endpoint,
            model,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.endpoint.base_url.trim_end_matches('/'));
        let req = EmbedRequest {
            model: &self.model,
            input: truncate_chars(text, MAX_EMBED_CHARS),
        };

        let mut request = self.client.post(&url).json(&req);
        if let Some(key) = &self.endpoint.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let resp = request.send().await.context("failed to call embedding API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("embedding API returned {status}: {body}");
        }

        let body: EmbedResponse = resp
            .json()
            .await
            .context("failed to parse embedding response")?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .context("embedding API returned no vectors")
    }
}

/// First `max_chars` characters of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
