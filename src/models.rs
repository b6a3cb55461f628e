use serde::{Deserialize, Serialize};

/// A document record flowing through retrieval and fusion.
///
/// Built by normalizing raw store results; discarded once the caller has
/// extracted the content. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Stable store key, stringified from the raw `_id`.
    pub id: String,
    /// Textual body. `None` marks a record whose content field was JSON null;
    /// such records never enter the fused result.
    pub content: Option<String>,
    /// Opaque passthrough fields (image references, raw embedding, ...).
    /// Carried but never interpreted by the fuser.
    pub auxiliary: serde_json::Map<String, serde_json::Value>,
    /// Source-ranking score (vector similarity or keyword relevance). Only the
    /// record's position within its originating list matters to fusion.
    pub score: f64,
}

impl Document {
    /// Content with the `None` case flattened to an empty string.
    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// A single chat turn (user or assistant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Identifier for the user session, used only for log correlation.
    pub user_id: Option<String>,
    /// Previous conversation turns, oldest first.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    /// The latest message from the user.
    pub message: String,
}

/// Non-streaming chat reply (the direct, no-retrieval path and error paths).
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    /// Processing stage that produced the reply.
    pub stage: String,
    /// Retrieval classification outcome ("yes" / "no"), when one was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_decision: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_history_defaults_empty() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(req.history.is_empty());
        assert!(req.user_id.is_none());
    }

    #[test]
    fn test_chat_response_omits_absent_decision() {
        let resp = ChatResponse {
            reply: "ok".into(),
            stage: "direct".into(),
            rag_decision: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("rag_decision").is_none());
    }

    #[test]
    fn test_document_content_str_flattens_none() {
        let doc = Document {
            id: "1".into(),
            content: None,
            auxiliary: serde_json::Map::new(),
            score: 0.0,
        };
        assert_eq!(doc.content_str(), "");
    }
}
