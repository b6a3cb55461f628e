pub mod chat;
pub mod classify;
pub mod embeddings;
pub mod router;
