use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream::{self, Stream, StreamExt};

use crate::llm::chat::{self, ChatStream};
use crate::llm::classify::{self, RagDecision};
use crate::models::{ChatMessage, ChatRequest, ChatResponse};
use crate::prompts;
use crate::state::AppState;

const MAX_CHAT_MESSAGE_CHARS: usize = 2000;
/// Assistant turns get truncated to this many characters for classification;
/// the classifier only needs the gist of what was already answered.
const MAX_ASSISTANT_CHARS_FOR_CLASSIFICATION: usize = 300;
/// Turns kept for answer generation.
const MAX_GENERATION_TURNS: usize = 7;
const IDLE_TIMEOUT_SECS: u64 = 30;
const DOC_SEPARATOR: &str = "\n-------\n";

/// POST /chat — classify, optionally retrieve, then answer.
///
/// The retrieval path streams SSE events; the direct path and every error
/// path answer with JSON. Retrieval failures degrade to answering without
/// context rather than failing the request.
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let message = req.message.trim();
    if message.is_empty() {
        return (StatusCode::BAD_REQUEST, "Message is required".to_string()).into_response();
    }
    let message = truncate_chars(message, MAX_CHAT_MESSAGE_CHARS).to_string();
    tracing::info!(user_id = req.user_id.as_deref().unwrap_or("default_user"), "chat request");

    let Some(permit) = acquire_chat_slot(&state.chat_semaphore) else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "Chat service at capacity".to_string(),
        )
            .into_response();
    };

    let mut conversation = sanitize_history(req.history);
    conversation.push(ChatMessage {
        role: "user".to_string(),
        content: message.clone(),
    });

    let lang = detect_language(&message);
    let classification_view =
        truncate_assistant_turns(&conversation, MAX_ASSISTANT_CHARS_FOR_CLASSIFICATION);
    let decision = classify::classify_rag_requirement(
        &state.http_client,
        &state.llm_router,
        &state.config.llm,
        &classification_view,
    )
    .await;
    tracing::info!(decision = decision.as_str(), lang, "request classified");

    match decision {
        RagDecision::Retrieve => {
            let reply = retrieve_and_stream(&state, conversation, &message, lang).await;
            // The permit rides inside the stream so capacity is held until the
            // client has consumed the reply.
            match reply {
                Ok(sse) => {
                    let sse = sse.map(move |event| {
                        let _permit = &permit;
                        event
                    });
                    Sse::new(sse).into_response()
                }
                Err(resp) => resp,
            }
        }
        RagDecision::Direct => direct_reply(&state, conversation, lang).await,
    }
}

/// GET /health — liveness probe.
pub async fn health() -> &'static str {
    "OK"
}

// ─── Retrieval path ──────────────────────────────────────

async fn retrieve_and_stream(
    state: &AppState,
    conversation: Vec<ChatMessage>,
    message: &str,
    lang: &'static str,
) -> Result<impl Stream<Item = Result<Event, Infallible>>, Response> {
    // Follow-ups make poor search queries; let the LLM fold the conversation
    // into a standalone one, falling back to the raw message.
    let query = classify::generate_search_query(
        &state.http_client,
        &state.llm_router,
        &state.config.llm,
        &conversation,
    )
    .await
    .unwrap_or_else(|| message.to_string());

    // Fail-soft: an empty result means "answer without retrieved context".
    let docs = state.retriever.search_documents(&query).await;
    tracing::info!(%query, documents = docs.len(), "retrieval finished");
    let context = docs.join(DOC_SEPARATOR);

    let mut messages = vec![ChatMessage {
        role: "system".to_string(),
        content: prompts::grounded_prompt(&context, lang),
    }];
    messages.extend(tail(conversation, MAX_GENERATION_TURNS));

    let model = &state.config.llm.chat_model;
    let llm_stream = chat::stream(
        &state.http_client,
        state.llm_router.endpoint_for(model),
        model,
        &messages,
        0.2,
    )
    .await
    .map_err(|e| {
        tracing::error!("failed to start generation stream: {e:#}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("LLM error: {e}")).into_response()
    })?;

    let context_event = Event::default()
        .event("context")
        .json_data(serde_json::json!({ "documents": docs.len() }))
        .unwrap();
    let done_event = Event::default()
        .event("done")
        .json_data(serde_json::json!({}))
        .unwrap();

    let events = stream::once(async move { Ok(context_event) })
        .chain(delta_events(llm_stream))
        .chain(stream::once(async move { Ok(done_event) }));

    Ok(events)
}

/// Map LLM content deltas to SSE `delta` events, with an idle timeout.
///
/// The stream ends after the first error or timeout; a stalled provider must
/// not hold the connection (and the semaphore permit) open indefinitely.
fn delta_events(llm_stream: ChatStream) -> impl Stream<Item = Result<Event, Infallible>> {
    let idle = Duration::from_secs(IDLE_TIMEOUT_SECS);

    stream::unfold((llm_stream, false), move |(mut llm_stream, done)| async move {
        if done {
            return None;
        }
        match tokio::time::timeout(idle, llm_stream.next()).await {
            Ok(Some(Ok(content))) => {
                let event = Event::default()
                    .event("delta")
                    .json_data(serde_json::json!({ "content": content }))
                    .unwrap();
                Some((Ok(event), (llm_stream, false)))
            }
            Ok(Some(Err(e))) => {
                let event = Event::default()
                    .event("error")
                    .json_data(serde_json::json!({ "message": e.to_string() }))
                    .unwrap();
                Some((Ok(event), (llm_stream, true)))
            }
            Ok(None) => None,
            Err(_) => {
                let event = Event::default()
                    .event("error")
                    .json_data(serde_json::json!({ "message": "LLM response timed out (idle)" }))
                    .unwrap();
                Some((Ok(event), (llm_stream, true)))
            }
        }
    })
}

// ─── Direct path ─────────────────────────────────────────

async fn direct_reply(
    state: &AppState,
    conversation: Vec<ChatMessage>,
    lang: &'static str,
) -> Response {
    let mut messages = vec![ChatMessage {
        role: "system".to_string(),
        content: prompts::direct_prompt(lang),
    }];
    messages.extend(tail(conversation, MAX_GENERATION_TURNS));

    let model = &state.config.llm.chat_model;
    match chat::complete(
        &state.http_client,
        state.llm_router.endpoint_for(model),
        model,
        &messages,
        0.0,
    )
    .await
    {
        Ok(reply) => Json(ChatResponse {
            reply,
            stage: "direct".to_string(),
            rag_decision: Some(RagDecision::Direct.as_str().to_string()),
        })
        .into_response(),
        Err(e) => {
            tracing::error!("direct generation failed: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse {
                    reply: "Sorry, something went wrong while answering.".to_string(),
                    stage: "direct - error".to_string(),
                    rag_decision: Some(RagDecision::Direct.as_str().to_string()),
                }),
            )
                .into_response()
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────

/// Claim a concurrency slot without queueing. A full service answers 503
/// immediately; a long LLM stream must not hold a queue of waiters behind it.
fn acquire_chat_slot(
    semaphore: &Arc<tokio::sync::Semaphore>,
) -> Option<tokio::sync::OwnedSemaphorePermit> {
    semaphore.clone().try_acquire_owned().ok()
}

/// Keep only user/assistant turns; anything else could smuggle in a system
/// prompt through the history.
fn sanitize_history(history: Vec<ChatMessage>) -> Vec<ChatMessage> {
    history
        .into_iter()
        .filter(|m| m.role == "user" || m.role == "assistant")
        .collect()
}

/// Copy of the conversation with long assistant turns cut down for the
/// classification call.
fn truncate_assistant_turns(conversation: &[ChatMessage], max_chars: usize) -> Vec<ChatMessage> {
    conversation
        .iter()
        .map(|m| {
            if m.role == "assistant" && m.content.chars().count() > max_chars {
                ChatMessage {
                    role: m.role.clone(),
                    content: format!("{}...", truncate_chars(&m.content, max_chars)),
                }
            } else {
                m.clone()
            }
        })
        .collect()
}

/// Last `n` turns of the conversation.
fn tail(mut conversation: Vec<ChatMessage>, n: usize) -> Vec<ChatMessage> {
    if conversation.len() > n {
        conversation.drain(..conversation.len() - n);
    }
    conversation
}

/// Thai if the text contains any character in the Thai Unicode block,
/// English otherwise.
fn detect_language(text: &str) -> &'static str {
    if text.chars().any(|c| ('\u{0e00}'..='\u{0e7f}').contains(&c)) {
        "th"
    } else {
        "en"
    }
}

/// First `max_chars` characters of `s`. Counts characters, not bytes: the
/// corpus is Thai, where one character runs three bytes.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
