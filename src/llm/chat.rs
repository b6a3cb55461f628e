use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::config::Endpoint;
use crate::models::ChatMessage;

/// Stream of content delta strings, one per token/chunk.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Transient-failure retries for single-shot calls. Streaming calls are not
/// retried: once deltas have been forwarded the call is not repeatable.
const MAX_RETRIES: u32 = 2;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Single-shot chat completion against an OpenAI-compatible endpoint.
pub async fn complete(
    client: &reqwest::Client,
    endpoint: &Endpoint,
    model: &str,
    messages: &[ChatMessage],
    temperature: f32,
) -> Result<String> {
    let mut attempt = 0;
    loop {
        match complete_once(client, endpoint, model, messages, temperature).await {
            Ok(content) => return Ok(content),
            Err(e) if attempt < MAX_RETRIES => {
                attempt += 1;
                tracing::warn!(model, attempt, "chat completion failed, retrying: {e}");
                tokio::time::sleep(Duration::from_secs(3 * u64::from(attempt))).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn complete_once(
    client: &reqwest::Client,
    endpoint: &Endpoint,
    model: &str,
    messages: &[ChatMessage],
    temperature: f32,
) -> Result<String> {
    let resp = send_chat_request(client, endpoint, model, messages, temperature, false).await?;

    let body: CompletionResponse = resp
        .json()
        .await
        .context("failed to parse chat completion response")?;

    Ok(body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default())
}

/// Streaming chat completion. Returns a stream of content deltas parsed from
/// the endpoint's SSE lines.
pub async fn stream(
    client: &reqwest::Client,
    endpoint: &Endpoint,
    model: &str,
    messages: &[ChatMessage],
    temperature: f32,
) -> Result<ChatStream> {
    let resp = send_chat_request(client, endpoint, model, messages, temperature, true).await?;

    let deltas = lines_of(resp.bytes_stream()).filter_map(|line| async move {
        match line {
            Ok(line) => parse_sse_line(&line),
            Err(e) => Some(Err(e)),
        }
    });

    Ok(Box::pin(deltas))
}

async fn send_chat_request(
    client: &reqwest::Client,
    endpoint: &Endpoint,
    model: &str,
    messages: &[ChatMessage],
    temperature: f32,
    stream: bool,
) -> Result<reqwest::Response> {
    let url = format!("{}/chat/completions", endpoint.base_url.trim_end_matches('/'));
    let req = CompletionRequest {
        model,
        messages,
        temperature,
        stream,
    };

    let mut request = client
        .post(&url)
        .timeout(Duration::from_secs(300))
        .json(&req);
    if let Some(key) = &endpoint.api_key {
        request = request.header("Authorization", format!("Bearer {key}"));
    }

    let resp = request
        .send()
        .await
        .with_context(|| format!("failed to reach chat endpoint for model {model}"))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("chat endpoint returned {status} for model {model}: {body}");
    }

    Ok(resp)
}

// ─── SSE parsing ─────────────────────────────────────────

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Parse one SSE line into a content delta.
///
/// Returns `None` for lines carrying no content: empty lines, non-`data:`
/// fields, the `[DONE]` sentinel, and role-only chunks.
fn parse_sse_line(line: &str) -> Option<Result<String>> {
    let data = line.trim().strip_prefix("data: ")?.trim();
    if data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => {
            let content = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .unwrap_or_default();
            if content.is_empty() {
                None
            } else {
                Some(Ok(content))
            }
        }
        Err(e) => Some(Err(anyhow::anyhow!("failed to parse stream chunk: {e}"))),
    }
}

/// Reassemble a byte stream into complete, non-empty lines.
fn lines_of(
    bytes: impl Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
) -> impl Stream<Item = Result<String>> + Send {
    futures_util::stream::unfold(
        (Box::pin(bytes), String::new()),
        |(mut bytes, mut buffer)| async move {
            loop {
                if let Some(pos) = buffer.find('\n') {
                    let line: String = buffer.drain(..=pos).collect();
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Some((Ok(line), (bytes, buffer)));
                }

                match bytes.next().await {
                    Some(Ok(chunk)) => buffer.push_str(&String::from_utf8_lossy(&chunk)),
                    Some(Err(e)) => {
                        return Some((
                            Err(anyhow::anyhow!("stream read error: {e}")),
                            (bytes, buffer),
                        ));
                    }
                    None => {
                        // Flush whatever trails without a final newline.
                        if buffer.trim().is_empty() {
                            return None;
                        }
                        let rest = std::mem::take(&mut buffer);
                        return Some((Ok(rest), (bytes, buffer)));
                    }
                }
            }
        },
    )
}
