//! Prompt builders for the chat pipeline.
//!
//! Wording here is deliberately minimal; the pipeline's behavior does not
//! depend on the exact phrasing, only on the contract each prompt sets up
//! (yes/no verdict, standalone query, grounded answer).

/// Classification prompt: the model must answer with a bare yes/no.
pub fn rag_classification_prompt() -> String {
    String::from(
        "You decide whether the latest user message in the following \
         conversation needs information from the rewards-program knowledge \
         base to answer (membership, points, packages, stations, promotions). \
         Respond with only the word 'yes' or 'no'.",
    )
}

/// System prompt for rewriting the conversation into a standalone search query.
pub fn search_query_prompt() -> String {
    String::from(
        "Rewrite the user's latest request as one standalone search query for \
         a document database about the rewards program. Resolve pronouns and \
         follow-ups using the conversation. Respond with the query only.",
    )
}

/// System prompt for grounded generation over retrieved documents.
pub fn grounded_prompt(context: &str, lang: &str) -> String {
    let language = if lang == "th" { "Thai" } else { "English" };
    format!(
        "You are a helpful rewards-program assistant. Answer using ONLY the \
         reference documents below. If they do not contain the answer, say so \
         briefly instead of guessing. Reply in {language}.\n\n\
         Reference documents:\n{context}"
    )
}

/// System prompt for the no-retrieval path.
pub fn direct_prompt(lang: &str) -> String {
    let language = if lang == "th" { "Thai" } else { "English" };
    format!(
        "You are a helpful rewards-program assistant. Answer conversational \
         questions politely and keep replies short. Reply in {language}."
    )
}
