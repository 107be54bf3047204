use super::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, dimension: usize) -> EmbeddingClient {
    let address = server.address();
    let config = EmbeddingConfig {
        protocol: "http".to_string(),
        host: address.ip().to_string(),
        port: address.port(),
        model: "test-model".to_string(),
        batch_size: 2,
        dimension,
    };
    EmbeddingClient::new(&config)
        .expect("should create client")
        .with_retry_attempts(1)
}

#[test]
fn client_configuration() {
    let config = EmbeddingConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
        dimension: 768,
    };
    let client = EmbeddingClient::new(&config).expect("should create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.dimension, 768);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let config = EmbeddingConfig::default();
    let client = EmbeddingClient::new(&config)
        .expect("should create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
}

#[tokio::test]
async fn embed_parses_endpoint_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embedding": [0.25, -0.5, 1.0] })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let embedding = tokio::task::spawn_blocking(move || client.embed("hello"))
        .await
        .expect("task should join")
        .expect("embed should succeed");

    assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
}

#[tokio::test]
async fn wrong_length_response_is_a_dimension_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": [0.1, 0.2] })))
        .mount(&server)
        .await;

    let client = client_for(&server, 4);
    let result = tokio::task::spawn_blocking(move || client.embed("hello"))
        .await
        .expect("task should join");

    assert!(matches!(
        result,
        Err(RetrievalError::DimensionMismatch {
            expected: 4,
            actual: 2
        })
    ));
}

#[tokio::test]
async fn batch_embeds_split_by_batch_size() {
    let server = MockServer::start().await;
    // batch_size is 2, so four texts arrive as two batch calls
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "embeddings": [[1.0, 0.0], [0.0, 1.0]] })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let texts: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    let embeddings = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("task should join")
        .expect("batch embed should succeed");

    assert_eq!(embeddings.len(), 4);
    assert_eq!(embeddings[0], vec![1.0, 0.0]);
}

#[tokio::test]
async fn ping_reports_endpoint_reachability() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let reachable = tokio::task::spawn_blocking(move || client.ping())
        .await
        .expect("task should join");
    assert!(reachable.is_ok());
}

#[tokio::test]
async fn server_errors_are_not_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let result = tokio::task::spawn_blocking(move || client.embed("hello"))
        .await
        .expect("task should join");

    assert!(matches!(result, Err(RetrievalError::Embedding(_))));
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let server = MockServer::start().await;
    let client = client_for(&server, 2);

    let embeddings = tokio::task::spawn_blocking(move || client.embed_batch(&[]))
        .await
        .expect("task should join")
        .expect("should succeed");

    assert!(embeddings.is_empty());
}
