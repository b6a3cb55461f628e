//! Integration tests for the hybrid retrieval pipeline.
//!
//! The document store (Atlas Data API) and the embedding endpoint are stood
//! in by wiremock, so the full embed → dual query → normalize → fuse →
//! truncate path runs without external services or model weights.

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reward_chat::config::{Endpoint, RetrievalConfig, StoreConfig};
use reward_chat::llm::embeddings::QueryEmbedder;
use reward_chat::search::hybrid::HybridRetriever;
use reward_chat::search::store::DocumentStore;

fn store_doc(id: &str, content: serde_json::Value, score: f64) -> serde_json::Value {
    json!({
        "_id": { "$oid": id },
        "content": content,
        "images": [],
        "embedding": [0.1, 0.2, 0.3],
        "score": score,
    })
}

async fn mock_embedder(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [0.1, 0.2, 0.3] }]
        })))
        .mount(server)
        .await;
}

async fn mock_channels(
    server: &MockServer,
    dense: Vec<serde_json::Value>,
    sparse: Vec<serde_json::Value>,
) {
    Mock::given(method("POST"))
        .and(path("/action/aggregate"))
        .and(body_string_contains("$vectorSearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "documents": dense })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/action/aggregate"))
        .and(body_string_contains("\"$search\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "documents": sparse })))
        .mount(server)
        .await;
}

fn retriever(server: &MockServer) -> HybridRetriever {
    let client = reqwest::Client::new();

    let store_config = StoreConfig {
        data_api_url: server.uri(),
        api_key: "test-key".to_string(),
        ..StoreConfig::default()
    };
    let store = DocumentStore::new(client.clone(), store_config);

    let embedder = QueryEmbedder::new(
        client,
        Endpoint {
            base_url: format!("{}/v1", server.uri()),
            api_key: None,
        },
        "bge-m3".to_string(),
    );

    HybridRetriever::new(store, embedder, RetrievalConfig::default())
}

#[tokio::test]
async fn test_hybrid_search_fuses_both_channels() {
    let server = MockServer::start().await;
    mock_embedder(&server).await;
    // Dense [a, b], sparse [b, c]: "b" appears in both channels and wins.
    mock_channels(
        &server,
        vec![
            store_doc("a1", json!("doc a"), 0.95),
            store_doc("b1", json!("doc b"), 0.90),
        ],
        vec![
            store_doc("b2", json!("doc b"), 7.1),
            store_doc("c1", json!("doc c"), 6.2),
        ],
    )
    .await;

    let docs = retriever(&server)
        .search("สถานีไหนร่วมรายการ", 100, 15)
        .await;

    let contents: Vec<&str> = docs.iter().map(|d| d.content_str()).collect();
    assert_eq!(contents, vec!["doc b", "doc a", "doc c"]);
    // "doc b" merged across channels keeps the dense (first-seen) record
    assert_eq!(docs[0].id, "b1");
}

#[tokio::test]
async fn test_exact_top_k_shrinks_to_available() {
    let server = MockServer::start().await;
    mock_embedder(&server).await;
    // Only 8 unique documents exist across both channels.
    let dense: Vec<_> = (0..8)
        .map(|i| store_doc(&format!("d{i}"), json!(format!("doc {i}")), 0.9))
        .collect();
    mock_channels(&server, dense, vec![]).await;

    let docs = retriever(&server).search("promotions", 100, 15).await;
    assert_eq!(docs.len(), 8);
}

#[tokio::test]
async fn test_exact_top_k_truncates_surplus() {
    let server = MockServer::start().await;
    mock_embedder(&server).await;
    let dense: Vec<_> = (0..40)
        .map(|i| store_doc(&format!("d{i}"), json!(format!("doc {i}")), 0.9))
        .collect();
    mock_channels(&server, dense, vec![]).await;

    let docs = retriever(&server).search("promotions", 100, 15).await;
    assert_eq!(docs.len(), 15);
    // Fused order follows dense rank when only one channel has results
    assert_eq!(docs[0].content_str(), "doc 0");
}

#[tokio::test]
async fn test_embedding_failure_fails_soft_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;
    // The store must never be queried without a vector.
    Mock::given(method("POST"))
        .and(path("/action/aggregate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "documents": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let docs = retriever(&server).search("any query", 100, 15).await;
    assert!(docs.is_empty());
}

#[tokio::test]
async fn test_store_failure_fails_soft_to_empty() {
    let server = MockServer::start().await;
    mock_embedder(&server).await;
    Mock::given(method("POST"))
        .and(path("/action/aggregate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let docs = retriever(&server).search("any query", 100, 15).await;
    assert!(docs.is_empty());
}

#[tokio::test]
async fn test_null_content_records_never_surface() {
    let server = MockServer::start().await;
    mock_embedder(&server).await;
    mock_channels(
        &server,
        vec![
            store_doc("n1", json!(null), 0.99),
            store_doc("k1", json!("kept"), 0.90),
        ],
        vec![store_doc("n2", json!(null), 5.0)],
    )
    .await;

    let docs = retriever(&server).search("query", 100, 15).await;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].content_str(), "kept");
}

#[tokio::test]
async fn test_search_documents_returns_content_strings() {
    let server = MockServer::start().await;
    mock_embedder(&server).await;
    mock_channels(
        &server,
        vec![store_doc("a1", json!("แพ็กเกจ Xtreme Saving"), 0.95)],
        vec![store_doc("b1", json!("เงื่อนไขการสะสมแต้ม"), 6.0)],
    )
    .await;

    let contents = retriever(&server).search_documents("แต้ม").await;
    assert_eq!(
        contents,
        vec!["แพ็กเกจ Xtreme Saving", "เงื่อนไขการสะสมแต้ม"]
    );
}
