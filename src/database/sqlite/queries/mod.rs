#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::documents::{DocumentMetadata, VectorDocument};

/// One stored row, namespace-scoped.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRow {
    pub id: String,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: DocumentMetadata,
}

pub struct DocumentQueries;

impl DocumentQueries {
    /// Batched insert-or-replace keyed by `(namespace, id)`, one transaction.
    #[inline]
    pub async fn upsert_batch(
        pool: &SqlitePool,
        namespace: &str,
        documents: &[VectorDocument],
    ) -> Result<()> {
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;

        for document in documents {
            let embedding = serde_json::to_string(&document.embedding)
                .context("Failed to encode embedding")?;
            let extra = serde_json::to_string(&document.metadata.extra)
                .context("Failed to encode metadata")?;

            sqlx::query(
                r#"
                INSERT OR REPLACE INTO vector_documents
                    (namespace, id, content, embedding, file_id, file_name,
                     chunk_index, owner_id, created_at, extra)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(namespace)
            .bind(&document.id)
            .bind(&document.content)
            .bind(&embedding)
            .bind(&document.metadata.file_id)
            .bind(&document.metadata.file_name)
            .bind(i64::from(document.metadata.chunk_index))
            .bind(&document.metadata.owner_id)
            .bind(document.metadata.created_at)
            .bind(&extra)
            .execute(&mut *tx)
            .await
            .context("Failed to upsert document")?;
        }

        tx.commit().await.context("Failed to commit batch")?;

        debug!("Upserted {} rows into '{}'", documents.len(), namespace);
        Ok(())
    }

    /// Candidate rows for brute-force scoring: namespace-scoped, optionally
    /// file-filtered, embedding present, at most `fetch_limit` rows.
    #[inline]
    pub async fn candidates(
        pool: &SqlitePool,
        namespace: &str,
        file_filter: Option<&[String]>,
        fetch_limit: usize,
    ) -> Result<Vec<DocumentRow>> {
        let mut sql = String::from(
            r#"
            SELECT id, content, embedding, file_id, file_name,
                   chunk_index, owner_id, created_at, extra
            FROM vector_documents
            WHERE namespace = ? AND embedding IS NOT NULL
            "#,
        );

        if let Some(filter) = file_filter {
            let placeholders = vec!["?"; filter.len()].join(", ");
            sql.push_str(&format!(" AND file_id IN ({placeholders})"));
        }
        sql.push_str(" LIMIT ?");

        let mut query = sqlx::query(&sql).bind(namespace);
        if let Some(filter) = file_filter {
            for file_id in filter {
                query = query.bind(file_id);
            }
        }
        query = query.bind(fetch_limit as i64);

        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to load candidate rows")?;

        rows.iter().map(Self::row_to_document).collect()
    }

    #[inline]
    pub async fn get(
        pool: &SqlitePool,
        namespace: &str,
        id: &str,
    ) -> Result<Option<DocumentRow>> {
        let row = sqlx::query(
            r#"
            SELECT id, content, embedding, file_id, file_name,
                   chunk_index, owner_id, created_at, extra
            FROM vector_documents
            WHERE namespace = ? AND id = ?
            "#,
        )
        .bind(namespace)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get document by id")?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    #[inline]
    pub async fn delete_by_file(pool: &SqlitePool, namespace: &str, file_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM vector_documents WHERE namespace = ? AND file_id = ?")
            .bind(namespace)
            .bind(file_id)
            .execute(pool)
            .await
            .context("Failed to delete file rows")?;

        Ok(result.rows_affected())
    }

    #[inline]
    pub async fn count(pool: &SqlitePool, namespace: &str) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM vector_documents WHERE namespace = ?")
            .bind(namespace)
            .fetch_one(pool)
            .await
            .context("Failed to count rows")?;

        let total: i64 = row.get("total");
        Ok(total.unsigned_abs())
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentRow> {
        let embedding: Option<String> = row.get("embedding");
        let embedding = embedding
            .map(|encoded| {
                serde_json::from_str::<Vec<f32>>(&encoded).context("Failed to decode embedding")
            })
            .transpose()?;

        let extra_encoded: String = row.get("extra");
        let extra = serde_json::from_str(&extra_encoded).unwrap_or_else(|e| {
            warn!("Discarding unreadable metadata extras: {}", e);
            serde_json::Map::new()
        });

        let chunk_index: i64 = row.get("chunk_index");
        let created_at: DateTime<Utc> = row.get("created_at");

        Ok(DocumentRow {
            id: row.get("id"),
            content: row.get("content"),
            embedding,
            metadata: DocumentMetadata {
                file_id: row.get("file_id"),
                file_name: row.get("file_name"),
                chunk_index: u32::try_from(chunk_index).unwrap_or(0),
                owner_id: row.get("owner_id"),
                created_at,
                extra,
            },
        })
    }
}
