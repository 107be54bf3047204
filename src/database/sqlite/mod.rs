// SQLite fallback store
// Holds raw vectors with no native approximate search; queries are scored
// brute force with the similarity evaluator


pub mod queries;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::fmt::Display;
use tracing::{debug, info};

use crate::config::Config;
use crate::database::sqlite::queries::DocumentQueries;
use crate::database::{Backend, QueryOptions, RawMatch, VectorBackend};
use crate::documents::VectorDocument;
use crate::similarity::cosine_similarity;
use crate::{RetrievalError, Result};

pub type DbPool = Pool<Sqlite>;

/// Relational store adapter; the failure path when the vector index is
/// unreachable, and the active backend when the index is disabled.
#[derive(Debug, Clone)]
pub struct FallbackStore {
    pool: DbPool,
    overfetch_factor: usize,
}

impl FallbackStore {
    #[inline]
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.base_dir).with_context(|| {
            format!(
                "Failed to create data directory: {}",
                config.base_dir.display()
            )
        })?;

        let options = SqliteConnectOptions::new()
            .filename(config.database_path())
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let store = Self {
            pool,
            overfetch_factor: config.engine.overfetch_factor,
        };
        store.run_migrations().await?;

        Ok(store)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    fn unavailable(&self, namespace: &str, reason: impl Display) -> RetrievalError {
        RetrievalError::BackendUnavailable {
            backend: Backend::Fallback,
            namespace: namespace.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl VectorBackend for FallbackStore {
    #[inline]
    async fn upsert(&self, namespace: &str, documents: &[VectorDocument]) -> Result<()> {
        if documents.is_empty() {
            debug!("No documents to store");
            return Ok(());
        }

        DocumentQueries::upsert_batch(&self.pool, namespace, documents)
            .await
            .map_err(|e| self.unavailable(namespace, e))?;

        info!("Stored {} vectors in '{}'", documents.len(), namespace);
        Ok(())
    }

    /// Brute-force scan: over-fetch candidates, score each against the query
    /// vector, drop sub-threshold rows, best first, truncate to the limit.
    ///
    /// Threshold filtering happens after the fetch, so fewer than `limit`
    /// survivors are returned as-is; there is no second fetch.
    #[inline]
    async fn query(
        &self,
        namespace: &str,
        query_vector: &[f32],
        options: &QueryOptions,
    ) -> Result<Vec<RawMatch>> {
        if options.file_filter.as_deref().is_some_and(<[String]>::is_empty) {
            return Ok(Vec::new());
        }

        let fetch_limit = options.limit.saturating_mul(self.overfetch_factor.max(1));
        let rows = DocumentQueries::candidates(
            &self.pool,
            namespace,
            options.file_filter.as_deref(),
            fetch_limit,
        )
        .await
        .map_err(|e| self.unavailable(namespace, e))?;

        let candidate_count = rows.len();
        let mut matches = Vec::with_capacity(candidate_count);
        for row in rows {
            let Some(embedding) = row.embedding else {
                continue;
            };

            let score = cosine_similarity(query_vector, &embedding)?;
            if score < options.threshold {
                continue;
            }

            matches.push(RawMatch {
                id: row.id,
                content: row.content,
                metadata: row.metadata,
                distance: 1.0 - score,
            });
        }

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(options.limit);

        debug!(
            "Scored {} candidates in '{}', kept {}",
            candidate_count,
            namespace,
            matches.len()
        );
        Ok(matches)
    }

    #[inline]
    async fn delete_by_file(&self, namespace: &str, file_id: &str) -> Result<u64> {
        let deleted = DocumentQueries::delete_by_file(&self.pool, namespace, file_id)
            .await
            .map_err(|e| self.unavailable(namespace, e))?;

        info!(
            "Deleted {} vectors for file '{}' in '{}'",
            deleted, file_id, namespace
        );
        Ok(deleted)
    }

    #[inline]
    async fn count(&self, namespace: &str) -> Result<u64> {
        DocumentQueries::count(&self.pool, namespace)
            .await
            .map_err(|e| self.unavailable(namespace, e))
    }
}
