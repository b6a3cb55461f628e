use crate::config::LlmConfig;
use crate::llm::chat;
use crate::llm::router::LlmRouter;
use crate::models::ChatMessage;
use crate::prompts;

/// Whether the latest user turn needs document retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RagDecision {
    Retrieve,
    Direct,
}

impl RagDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            RagDecision::Retrieve => "yes",
            RagDecision::Direct => "no",
        }
    }
}

/// Classify whether the conversation's latest query needs retrieval.
///
/// Misclassifying toward retrieval only costs latency, while misclassifying
/// away from it produces an ungrounded answer, so every failure path
/// (LLM error, unparseable verdict) resolves to `Retrieve`.
pub async fn classify_rag_requirement(
    client: &reqwest::Client,
    router: &LlmRouter,
    config: &LlmConfig,
    conversation: &[ChatMessage],
) -> RagDecision {
    if conversation.is_empty() {
        return RagDecision::Direct;
    }

    let messages = vec![ChatMessage {
        role: "user".to_string(),
        content: format!(
            "{}\n{}",
            prompts::rag_classification_prompt(),
            flatten_conversation(conversation)
        ),
    }];

    let model = &config.classifier_model;
    match chat::complete(client, router.endpoint_for(model), model, &messages, 0.0).await {
        Ok(verdict) => parse_decision(&verdict).unwrap_or_else(|| {
            tracing::warn!(%verdict, "unparseable RAG classification, defaulting to retrieve");
            RagDecision::Retrieve
        }),
        Err(e) => {
            tracing::error!("RAG classification call failed, defaulting to retrieve: {e}");
            RagDecision::Retrieve
        }
    }
}

/// Condense the conversation into a standalone search query.
///
/// Follow-up turns ("แล้วสายสีชมพูล่ะ") are meaningless as search queries on
/// their own; the classifier model rewrites them with the context folded in.
/// Returns `None` when generation fails; the caller falls back to the raw
/// user message.
pub async fn generate_search_query(
    client: &reqwest::Client,
    router: &LlmRouter,
    config: &LlmConfig,
    conversation: &[ChatMessage],
) -> Option<String> {
    if conversation.is_empty() {
        return None;
    }

    let mut messages = vec![ChatMessage {
        role: "system".to_string(),
        content: prompts::search_query_prompt(),
    }];
    messages.extend(conversation.iter().cloned());

    let model = &config.classifier_model;
    match chat::complete(client, router.endpoint_for(model), model, &messages, 0.0).await {
        Ok(query) if !query.trim().is_empty() => Some(query.trim().to_string()),
        Ok(_) => {
            tracing::warn!("search query generation returned empty content");
            None
        }
        Err(e) => {
            tracing::warn!("search query generation failed: {e}");
            None
        }
    }
}

/// Join conversation turns into a "role: content" transcript.
pub fn flatten_conversation(conversation: &[ChatMessage]) -> String {
    conversation
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_decision(verdict: &str) -> Option<RagDecision> {
    let verdict = verdict.to_lowercase();
    let verdict = verdict.trim().trim_end_matches('.');
    if verdict.contains("yes") {
        Some(RagDecision::Retrieve)
    } else if verdict.contains("no") {
        Some(RagDecision::Direct)
    } else {
        None
    }
}
