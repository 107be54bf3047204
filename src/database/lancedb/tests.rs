use super::*;
use crate::config::{EmbeddingConfig, EngineConfig};
use crate::documents::DocumentChunk;
use tempfile::TempDir;

fn create_test_config(dimension: usize) -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        engine: EngineConfig::default(),
        embedding: EmbeddingConfig {
            dimension,
            ..EmbeddingConfig::default()
        },
        base_dir: temp_dir.path().to_path_buf(),
    };
    (config, temp_dir)
}

fn test_document(file_id: &str, chunk_index: u32, embedding: Vec<f32>) -> VectorDocument {
    let chunk = DocumentChunk {
        file_id: file_id.to_string(),
        file_name: format!("{file_id}.txt"),
        chunk_index,
        content: format!("content of {file_id} chunk {chunk_index}"),
    };
    VectorDocument::from_chunk(&chunk, embedding, "owner-1")
}

fn default_query() -> QueryOptions {
    QueryOptions {
        limit: 10,
        threshold: 0.0,
        file_filter: None,
    }
}

#[tokio::test]
async fn missing_collection_yields_empty_results() {
    let (config, _temp_dir) = create_test_config(2);
    let index = PrimaryIndex::connect(&config).await.expect("should connect");

    let matches = index
        .query("user_nobody", &[1.0, 0.0], &default_query())
        .await
        .expect("query should succeed");
    assert!(matches.is_empty());

    assert_eq!(index.count("user_nobody").await.expect("count"), 0);
    assert_eq!(
        index
            .delete_by_file("user_nobody", "f1")
            .await
            .expect("delete should be a no-op"),
        0
    );
}

#[tokio::test]
async fn ensure_collection_is_idempotent() {
    let (config, _temp_dir) = create_test_config(2);
    let index = PrimaryIndex::connect(&config).await.expect("should connect");

    index
        .ensure_collection("user_a")
        .await
        .expect("first create should succeed");
    index
        .ensure_collection("user_a")
        .await
        .expect("second create should succeed");

    assert_eq!(index.count("user_a").await.expect("count"), 0);
}

#[tokio::test]
async fn stored_vectors_come_back_nearest_first() {
    let (config, _temp_dir) = create_test_config(2);
    let index = PrimaryIndex::connect(&config).await.expect("should connect");

    let documents = vec![
        test_document("f1", 0, vec![1.0, 0.0]),
        test_document("f1", 1, vec![0.0, 1.0]),
        test_document("f2", 0, vec![0.9, 0.1]),
    ];
    index
        .upsert("user_a", &documents)
        .await
        .expect("upsert should succeed");

    let matches = index
        .query("user_a", &[1.0, 0.0], &default_query())
        .await
        .expect("query should succeed");

    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].id, "f1_0");
    assert!(matches[0].distance < 1e-5);
    // Backend returns candidates ordered ascending by distance
    assert!(matches[0].distance <= matches[1].distance);
    assert!(matches[1].distance <= matches[2].distance);
    assert_eq!(matches[0].metadata.file_name, "f1.txt");
}

#[tokio::test]
async fn restoring_an_id_overwrites() {
    let (config, _temp_dir) = create_test_config(2);
    let index = PrimaryIndex::connect(&config).await.expect("should connect");

    let first = test_document("f1", 0, vec![1.0, 0.0]);
    index
        .upsert("user_a", std::slice::from_ref(&first))
        .await
        .expect("first upsert");

    let mut second = test_document("f1", 0, vec![0.0, 1.0]);
    second.content = "replacement content".to_string();
    index
        .upsert("user_a", std::slice::from_ref(&second))
        .await
        .expect("second upsert");

    assert_eq!(index.count("user_a").await.expect("count"), 1);

    let matches = index
        .query("user_a", &[0.0, 1.0], &default_query())
        .await
        .expect("query should succeed");
    assert_eq!(matches[0].content, "replacement content");
}

#[tokio::test]
async fn file_filter_restricts_results() {
    let (config, _temp_dir) = create_test_config(2);
    let index = PrimaryIndex::connect(&config).await.expect("should connect");

    let documents = vec![
        test_document("f1", 0, vec![1.0, 0.0]),
        test_document("f2", 0, vec![0.9, 0.1]),
    ];
    index.upsert("user_a", &documents).await.expect("upsert");

    let options = QueryOptions {
        file_filter: Some(vec!["f2".to_string()]),
        ..default_query()
    };
    let matches = index
        .query("user_a", &[1.0, 0.0], &options)
        .await
        .expect("query should succeed");

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].metadata.file_id, "f2");

    // Present-but-empty filter matches nothing, without error
    let options = QueryOptions {
        file_filter: Some(Vec::new()),
        ..default_query()
    };
    let matches = index
        .query("user_a", &[1.0, 0.0], &options)
        .await
        .expect("query should succeed");
    assert!(matches.is_empty());
}

#[tokio::test]
async fn delete_by_file_is_scoped() {
    let (config, _temp_dir) = create_test_config(2);
    let index = PrimaryIndex::connect(&config).await.expect("should connect");

    let documents = vec![
        test_document("f1", 0, vec![1.0, 0.0]),
        test_document("f1", 1, vec![0.0, 1.0]),
        test_document("f2", 0, vec![0.9, 0.1]),
    ];
    index.upsert("user_a", &documents).await.expect("upsert");

    index
        .delete_by_file("user_a", "f1")
        .await
        .expect("delete should succeed");

    assert_eq!(index.count("user_a").await.expect("count"), 1);

    index
        .delete_by_file("user_a", "missing")
        .await
        .expect("deleting a non-existent file is a no-op");
    assert_eq!(index.count("user_a").await.expect("count"), 1);
}

#[tokio::test]
async fn namespaces_are_isolated() {
    let (config, _temp_dir) = create_test_config(2);
    let index = PrimaryIndex::connect(&config).await.expect("should connect");

    index
        .upsert("user_a", &[test_document("f1", 0, vec![1.0, 0.0])])
        .await
        .expect("upsert a");
    index
        .upsert("user_b", &[test_document("f9", 0, vec![0.0, 1.0])])
        .await
        .expect("upsert b");

    let matches = index
        .query("user_b", &[1.0, 0.0], &default_query())
        .await
        .expect("query should succeed");

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].metadata.file_id, "f9");

    index
        .delete_by_file("user_b", "f1")
        .await
        .expect("delete in other namespace");
    assert_eq!(index.count("user_a").await.expect("count"), 1);
}

#[tokio::test]
async fn ids_with_quotes_are_escaped_in_predicates() {
    let (config, _temp_dir) = create_test_config(2);
    let index = PrimaryIndex::connect(&config).await.expect("should connect");

    let document = test_document("f'1", 0, vec![1.0, 0.0]);
    index
        .upsert("user_a", std::slice::from_ref(&document))
        .await
        .expect("upsert should succeed");

    index
        .delete_by_file("user_a", "f'1")
        .await
        .expect("delete should succeed");
    assert_eq!(index.count("user_a").await.expect("count"), 0);
}
