//! Contract tests for the OpenAI-compatible embedding and query backends.
//!
//! Verify request shape, response parsing, and error mapping against a
//! wiremock server.

use std::sync::Arc;
use std::time::Duration;

use comparekart::providers::openai::{OpenAiConfig, OpenAiEmbeddingBackend, OpenAiQueryBackend};
use comparekart_match::{
    CompareError, EmbeddingBackend, FeatureExtractor, QueryFilter, QueryParseBackend, QueryParser,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, model: &str) -> OpenAiConfig {
    OpenAiConfig::new("test-key", model).with_base_url(server.uri())
}

// ────────────────────────────────────────────────────────────────────────────
// Embeddings
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn embedding_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": ["amul butter", "tata salt"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]},
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]}
            ],
            "model": "text-embedding-3-small"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiEmbeddingBackend::new(config(&server, "text-embedding-3-small")).unwrap();
    let vectors = backend
        .embed(&["amul butter".to_owned(), "tata salt".to_owned()])
        .await
        .unwrap();

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn embeddings_reordered_by_index() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        })))
        .mount(&server)
        .await;

    let backend = OpenAiEmbeddingBackend::new(config(&server, "m")).unwrap();
    let vectors = backend
        .embed(&["first".to_owned(), "second".to_owned()])
        .await
        .unwrap();

    assert_eq!(vectors[0], vec![1.0, 0.0]);
    assert_eq!(vectors[1], vec![0.0, 1.0]);
}

#[tokio::test]
async fn embedding_auth_error_mapped() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid API key", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let backend = OpenAiEmbeddingBackend::new(config(&server, "m")).unwrap();
    let err = backend.embed(&["x".to_owned()]).await.unwrap_err();

    assert!(matches!(err, CompareError::Backend(_)));
    assert!(err.to_string().contains("Invalid API key"));
}

#[tokio::test]
async fn embedding_malformed_body_is_backend_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let backend = OpenAiEmbeddingBackend::new(config(&server, "m")).unwrap();
    let err = backend.embed(&["x".to_owned()]).await.unwrap_err();
    assert!(err.to_string().contains("malformed"));
}

#[tokio::test]
async fn embedding_timeout_is_backend_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(json!({"data": []})),
        )
        .mount(&server)
        .await;

    let backend = OpenAiEmbeddingBackend::new(
        config(&server, "m").with_timeout(Duration::from_millis(100)),
    )
    .unwrap();
    let err = backend.embed(&["x".to_owned()]).await.unwrap_err();
    assert!(matches!(err, CompareError::Backend(_)));
}

#[tokio::test]
async fn short_embedding_reply_degrades_extractor() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [1.0, 0.0]}]
        })))
        .mount(&server)
        .await;

    let backend = OpenAiEmbeddingBackend::new(config(&server, "m")).unwrap();
    let extractor = FeatureExtractor::new(Arc::new(backend), 2);
    let features = extractor
        .extract(&["a".to_owned(), "b".to_owned()])
        .await;

    assert!(features.degraded);
    assert_eq!(features.vectors.len(), 2);
    assert!(features.vectors.iter().all(|v| v.is_zero()));
}

// ────────────────────────────────────────────────────────────────────────────
// Chat completions / query parsing
// ────────────────────────────────────────────────────────────────────────────

fn chat_reply(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn chat_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "openai/gpt-3.5-turbo",
            "messages": [
                {"role": "system", "content": "instruction"},
                {"role": "user", "content": "Parse this query: shoes"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiQueryBackend::new(config(&server, "openai/gpt-3.5-turbo")).unwrap();
    let reply = backend
        .complete("instruction", "Parse this query: shoes")
        .await
        .unwrap();
    assert_eq!(reply, "ok");
}

#[tokio::test]
async fn empty_choices_is_backend_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let backend = OpenAiQueryBackend::new(config(&server, "m")).unwrap();
    let err = backend.complete("i", "t").await.unwrap_err();
    assert!(err.to_string().contains("no content"));
}

#[tokio::test]
async fn parser_uses_model_filter() {
    let server = MockServer::start().await;

    let content = r#"{"product": "running shoes", "min_price": null, "max_price": 2000, "brand": "Nike", "keywords": ["running", "shoes"]}"#;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(content)))
        .mount(&server)
        .await;

    let backend = OpenAiQueryBackend::new(config(&server, "m")).unwrap();
    let parser = QueryParser::new(Arc::new(backend));
    let filter = parser.parse("nike running shoes under 2000").await;

    assert_eq!(filter.product, "running shoes");
    assert_eq!(filter.max_price, Some(2000.0));
    assert_eq!(filter.min_price, None);
    assert_eq!(filter.brand.as_deref(), Some("Nike"));
    assert_eq!(filter.keywords, ["running", "shoes"]);
}

#[tokio::test]
async fn parser_falls_back_on_prose_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply("Sure! You are looking for shoes.")),
        )
        .mount(&server)
        .await;

    let backend = OpenAiQueryBackend::new(config(&server, "m")).unwrap();
    let parser = QueryParser::new(Arc::new(backend));
    let filter = parser.parse("cheap blue shoes under 2000").await;

    assert_eq!(filter, QueryFilter::fallback("cheap blue shoes under 2000"));
}

#[tokio::test]
async fn parser_falls_back_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let backend = OpenAiQueryBackend::new(config(&server, "m")).unwrap();
    let parser = QueryParser::new(Arc::new(backend));
    let filter = parser.parse("rice 5kg").await;

    assert_eq!(filter.product, "rice 5kg");
    assert_eq!(filter.keywords, ["rice 5kg"]);
}
