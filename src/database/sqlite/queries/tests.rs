use super::*;
use crate::documents::DocumentChunk;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

async fn create_test_pool() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true)
                .foreign_keys(true),
        )
        .await
        .expect("Failed to create test pool");

    sqlx::query(include_str!("../migrations/001_initial_schema.sql"))
        .execute(&pool)
        .await
        .expect("Failed to run migrations");

    (temp_dir, pool)
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

#[tokio::test]
async fn upsert_and_get_round_trip() {
    let (_temp_dir, pool) = create_test_pool().await;

    let mut document = test_document("f1", 0, vec![0.5, 0.25]);
    document
        .metadata
        .extra
        .insert("source".to_string(), serde_json::Value::from("google"));

    DocumentQueries::upsert_batch(&pool, "user_a", std::slice::from_ref(&document))
        .await
        .expect("Failed to upsert");

    let stored = DocumentQueries::get(&pool, "user_a", "f1_0")
        .await
        .expect("Failed to get document")
        .expect("Document should exist");

    assert_eq!(stored.id, "f1_0");
    assert_eq!(stored.content, document.content);
    assert_eq!(stored.embedding, Some(vec![0.5, 0.25]));
    assert_eq!(stored.metadata.file_name, "f1.txt");
    assert_eq!(
        stored.metadata.extra.get("source"),
        Some(&serde_json::Value::from("google"))
    );
    assert_eq!(stored.metadata.created_at, document.metadata.created_at);
}

#[tokio::test]
async fn replacing_an_id_keeps_one_row() {
    let (_temp_dir, pool) = create_test_pool().await;

    DocumentQueries::upsert_batch(&pool, "user_a", &[test_document("f1", 0, vec![1.0, 0.0])])
        .await
        .expect("first upsert");

    let mut replacement = test_document("f1", 0, vec![0.0, 1.0]);
    replacement.content = "rewritten".to_string();
    DocumentQueries::upsert_batch(&pool, "user_a", std::slice::from_ref(&replacement))
        .await
        .expect("second upsert");

    assert_eq!(DocumentQueries::count(&pool, "user_a").await.expect("count"), 1);

    let stored = DocumentQueries::get(&pool, "user_a", "f1_0")
        .await
        .expect("get")
        .expect("should exist");
    assert_eq!(stored.content, "rewritten");
    assert_eq!(stored.embedding, Some(vec![0.0, 1.0]));
}

#[tokio::test]
async fn candidates_skip_rows_without_embeddings() {
    let (_temp_dir, pool) = create_test_pool().await;

    DocumentQueries::upsert_batch(&pool, "user_a", &[test_document("f1", 0, vec![1.0, 0.0])])
        .await
        .expect("upsert");

    // Legacy row with no usable embedding
    sqlx::query(
        r#"
        INSERT INTO vector_documents
            (namespace, id, content, embedding, file_id, file_name,
             chunk_index, owner_id, created_at, extra)
        VALUES ('user_a', 'legacy_0', 'old row', NULL, 'legacy', 'legacy.txt',
                0, 'owner-1', '2024-01-01 00:00:00', '{}')
        "#,
    )
    .execute(&pool)
    .await
    .expect("insert legacy row");

    let candidates = DocumentQueries::candidates(&pool, "user_a", None, 10)
        .await
        .expect("candidates");

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, "f1_0");
    assert_eq!(DocumentQueries::count(&pool, "user_a").await.expect("count"), 2);
}

#[tokio::test]
async fn candidates_honor_namespace_filter_and_limit() {
    let (_temp_dir, pool) = create_test_pool().await;

    let documents = vec![
        test_document("f1", 0, vec![1.0, 0.0]),
        test_document("f1", 1, vec![0.0, 1.0]),
        test_document("f2", 0, vec![0.9, 0.1]),
    ];
    DocumentQueries::upsert_batch(&pool, "user_a", &documents)
        .await
        .expect("upsert a");
    DocumentQueries::upsert_batch(&pool, "user_b", &[test_document("f9", 0, vec![0.1, 0.9])])
        .await
        .expect("upsert b");

    let all = DocumentQueries::candidates(&pool, "user_a", None, 10)
        .await
        .expect("candidates");
    assert_eq!(all.len(), 3);

    let filter = vec!["f1".to_string()];
    let filtered = DocumentQueries::candidates(&pool, "user_a", Some(&filter), 10)
        .await
        .expect("filtered candidates");
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|row| row.metadata.file_id == "f1"));

    let limited = DocumentQueries::candidates(&pool, "user_a", None, 2)
        .await
        .expect("limited candidates");
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn delete_by_file_reports_affected_rows() {
    let (_temp_dir, pool) = create_test_pool().await;

    let documents = vec![
        test_document("f1", 0, vec![1.0, 0.0]),
        test_document("f1", 1, vec![0.0, 1.0]),
        test_document("f2", 0, vec![0.9, 0.1]),
    ];
    DocumentQueries::upsert_batch(&pool, "user_a", &documents)
        .await
        .expect("upsert");

    let deleted = DocumentQueries::delete_by_file(&pool, "user_a", "f1")
        .await
        .expect("delete");
    assert_eq!(deleted, 2);

    let deleted = DocumentQueries::delete_by_file(&pool, "user_a", "missing")
        .await
        .expect("delete of missing file");
    assert_eq!(deleted, 0);

    assert_eq!(DocumentQueries::count(&pool, "user_a").await.expect("count"), 1);
}
