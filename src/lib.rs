//! # reward-chat
//!
//! A retrieval-augmented chatbot service for a Thai rewards-program
//! knowledge base, combining MongoDB Atlas vector search and tokenized
//! keyword search with weighted reciprocal rank fusion.
//!
//! ## Pipeline
//!
//! ```text
//!            ┌──────────────┐
//!            │ User message  │
//!            └──────┬───────┘
//!                   │ yes/no LLM classification
//!          ┌────────┴─────────┐
//!          ▼ no                ▼ yes
//!   ┌─────────────┐    ┌──────────────────┐
//!   │ Direct reply │    │ Standalone query  │
//!   │   (JSON)     │    │   (LLM rewrite)   │
//!   └─────────────┘    └────────┬─────────┘
//!                               │
//!                  ┌────────────┴────────────┐
//!                  ▼                         ▼
//!         ┌────────────────┐       ┌─────────────────┐
//!         │ Vector search   │       │ Keyword search  │
//!         │ ($vectorSearch) │       │ ($search, Thai  │
//!         │                │       │  word tokens)   │
//!         └───────┬────────┘       └────────┬────────┘
//!                 │ ranked list             │ ranked list
//!                 └────────────┬────────────┘
//!                              ▼
//!                 ┌───────────────────────┐
//!                 │  Weighted RRF fusion   │
//!                 │  w/(rank + 60), dedup  │
//!                 │  by content string     │
//!                 └───────────┬───────────┘
//!                             ▼
//!                 ┌───────────────────────┐
//!                 │  Grounded generation  │
//!                 │     (SSE stream)      │
//!                 └───────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for the store, retrieval knobs, and LLM endpoints
//! - [`models`] - Shared data types: `Document`, chat request/response types
//! - [`search::fusion`] - Weighted Reciprocal Rank Fusion with content-keyed deduplication
//! - [`search::store`] - MongoDB Atlas Data API client (dense + sparse aggregate pipelines)
//! - [`search::tokenize`] - Thai-aware query tokenization via ICU4X word segmentation
//! - [`search::hybrid`] - Dual-channel retrieval, normalization, and fusion orchestration
//! - [`llm`] - OpenAI-compatible chat/embedding plumbing with model-prefix routing
//! - [`prompts`] - Prompt builders (classification, query rewrite, grounded/direct generation)
//! - [`api`] - Axum HTTP handlers for the chat endpoint and health probe
//! - [`state`] - Shared application state holding the retriever, router, and HTTP client

pub mod api;
pub mod config;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod search;
pub mod state;
