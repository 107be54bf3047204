// Retrieval orchestrator
// Chooses a backend per configuration, escalates primary failures to the
// fallback store, and normalizes results so callers cannot tell which
// backend served them


use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database::lancedb::PrimaryIndex;
use crate::database::sqlite::FallbackStore;
use crate::database::{Backend, QueryOptions, RawMatch, VectorBackend};
use crate::documents::{SearchResult, VectorDocument};
use crate::namespace::namespace_for;
use crate::{RetrievalError, Result};

/// Per-call search knobs; unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub threshold: Option<f32>,
    /// Restrict hits to these file ids. An empty set matches nothing.
    pub file_filter: Option<Vec<String>>,
    /// Caller-supplied deadline for the in-flight backend call.
    pub deadline: Option<Duration>,
}

/// Diagnostics for one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetrievalStats {
    pub document_count: u64,
    pub backend_active: Backend,
}

/// The public face of the engine.
///
/// Holds one explicitly constructed adapter per backend for the lifetime of
/// the process; both handles are cheap to share across concurrent requests,
/// and no other state is kept between calls.
pub struct RetrievalEngine {
    primary: PrimaryIndex,
    fallback: FallbackStore,
    primary_enabled: bool,
    threshold: f32,
    default_limit: usize,
    dimension: usize,
    default_deadline: Option<Duration>,
}

/// Run a backend call under the caller's deadline.
///
/// Expiry aborts the in-flight call and surfaces as `Timeout`, which the
/// orchestrator never escalates to the other backend: callers must be able
/// to distinguish "slow" from "down" for retry budgeting.
async fn with_deadline<T, F>(
    deadline: Option<Duration>,
    backend: Backend,
    namespace: &str,
    operation: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, operation).await {
            Ok(result) => result,
            Err(_) => Err(RetrievalError::Timeout {
                backend,
                namespace: namespace.to_string(),
            }),
        },
        None => operation.await,
    }
}

impl RetrievalEngine {
    /// Construct both adapters from configuration and wire them together.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let primary = PrimaryIndex::connect(config).await?;
        let fallback = FallbackStore::new(config).await?;
        Ok(Self::with_adapters(primary, fallback, config))
    }

    /// Wire an injected adapter pair; useful when the handles are shared
    /// with other components.
    #[inline]
    pub fn with_adapters(primary: PrimaryIndex, fallback: FallbackStore, config: &Config) -> Self {
        Self {
            primary,
            fallback,
            primary_enabled: config.engine.primary_enabled,
            threshold: config.engine.threshold,
            default_limit: config.engine.default_limit,
            dimension: config.embedding.dimension,
            default_deadline: config.operation_timeout(),
        }
    }

    /// Store a batch of documents for a tenant.
    ///
    /// One call, one backend: the active backend is decided up front, and
    /// only a failed primary write escalates the whole batch to the fallback
    /// store. A batch is never split across backends.
    #[inline]
    pub async fn store_vectors(
        &self,
        user_id: &str,
        documents: &[VectorDocument],
        deadline: Option<Duration>,
    ) -> Result<()> {
        let namespace = namespace_for(user_id);
        for document in documents {
            document.ensure_dimension(self.dimension)?;
        }

        let deadline = deadline.or(self.default_deadline);

        if !self.primary_enabled {
            return with_deadline(
                deadline,
                Backend::Fallback,
                &namespace,
                self.fallback.upsert(&namespace, documents),
            )
            .await;
        }

        debug!("Attempting primary store for '{}'", namespace);
        match with_deadline(
            deadline,
            Backend::Primary,
            &namespace,
            self.primary.upsert(&namespace, documents),
        )
        .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                warn!("Primary store failed for '{}', falling back: {}", namespace, e);
                with_deadline(
                    deadline,
                    Backend::Fallback,
                    &namespace,
                    self.fallback.upsert(&namespace, documents),
                )
                .await
            }
            Err(e) => Err(e),
        }
    }

    /// Store a batch into the active backend, then best-effort mirror it
    /// into the other one.
    ///
    /// For migration windows where both backends must hold the tenant's
    /// vectors; mirror failures are logged, not raised.
    #[inline]
    pub async fn store_vectors_mirrored(
        &self,
        user_id: &str,
        documents: &[VectorDocument],
        deadline: Option<Duration>,
    ) -> Result<()> {
        self.store_vectors(user_id, documents, deadline).await?;

        let namespace = namespace_for(user_id);
        let deadline = deadline.or(self.default_deadline);
        let mirror = if self.primary_enabled {
            with_deadline(
                deadline,
                Backend::Fallback,
                &namespace,
                self.fallback.upsert(&namespace, documents),
            )
            .await
        } else {
            with_deadline(
                deadline,
                Backend::Primary,
                &namespace,
                self.primary.upsert(&namespace, documents),
            )
            .await
        };

        if let Err(e) = mirror {
            warn!("Mirror write failed for '{}': {}", namespace, e);
        }
        Ok(())
    }

    /// Retrieve the most relevant documents for a query vector.
    ///
    /// Attempts the primary index, repeats against the fallback store on any
    /// adapter error except `Timeout`, and fails with `RetrievalUnavailable`
    /// only when both backends have failed — an empty result set is a
    /// success, not an error.
    #[inline]
    pub async fn search_vectors(
        &self,
        user_id: &str,
        query_vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let namespace = namespace_for(user_id);
        if query_vector.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        let limit = options.limit.unwrap_or(self.default_limit);
        let threshold = options.threshold.unwrap_or(self.threshold);
        let deadline = options.deadline.or(self.default_deadline);
        let query_options = QueryOptions {
            limit,
            threshold,
            file_filter: options.file_filter.clone(),
        };

        if !self.primary_enabled {
            let matches = with_deadline(
                deadline,
                Backend::Fallback,
                &namespace,
                self.fallback.query(&namespace, query_vector, &query_options),
            )
            .await?;
            return Ok(normalize(matches, threshold, limit));
        }

        debug!("Attempting primary search for '{}'", namespace);
        let primary_error = match with_deadline(
            deadline,
            Backend::Primary,
            &namespace,
            self.primary.query(&namespace, query_vector, &query_options),
        )
        .await
        {
            Ok(matches) => return Ok(normalize(matches, threshold, limit)),
            Err(e @ RetrievalError::Timeout { .. }) => return Err(e),
            Err(e) => e,
        };

        info!(
            "Primary search failed for '{}', falling back: {}",
            namespace, primary_error
        );
        match with_deadline(
            deadline,
            Backend::Fallback,
            &namespace,
            self.fallback.query(&namespace, query_vector, &query_options),
        )
        .await
        {
            Ok(matches) => Ok(normalize(matches, threshold, limit)),
            Err(e @ RetrievalError::Timeout { .. }) => Err(e),
            Err(fallback_error) => Err(RetrievalError::RetrievalUnavailable {
                namespace,
                primary: primary_error.to_string(),
                fallback: fallback_error.to_string(),
            }),
        }
    }

    /// Delete every vector for a file, on BOTH backends unconditionally.
    ///
    /// Deleting on the inactive backend as well avoids orphaned vectors if
    /// the active backend changes between store and delete. A failed delete
    /// on either side has no user-visible effect, so failures are logged and
    /// aggregated into a warning rather than raised.
    #[inline]
    pub async fn delete_file_vectors(
        &self,
        user_id: &str,
        file_id: &str,
        deadline: Option<Duration>,
    ) -> Result<()> {
        let namespace = namespace_for(user_id);
        let deadline = deadline.or(self.default_deadline);

        let mut failures = Vec::new();

        if let Err(e) = with_deadline(
            deadline,
            Backend::Primary,
            &namespace,
            self.primary.delete_by_file(&namespace, file_id),
        )
        .await
        {
            failures.push(e.to_string());
        }

        if let Err(e) = with_deadline(
            deadline,
            Backend::Fallback,
            &namespace,
            self.fallback.delete_by_file(&namespace, file_id),
        )
        .await
        {
            failures.push(e.to_string());
        }

        if failures.is_empty() {
            info!("Deleted vectors for file '{}' in '{}'", file_id, namespace);
        } else {
            warn!(
                "File delete for '{}' in '{}' left possible orphans: {}",
                file_id,
                namespace,
                failures.join("; ")
            );
        }
        Ok(())
    }

    /// Per-tenant diagnostics: stored document count and the backend that
    /// answered.
    #[inline]
    pub async fn get_stats(&self, user_id: &str) -> Result<RetrievalStats> {
        let namespace = namespace_for(user_id);

        if self.primary_enabled {
            match self.primary.count(&namespace).await {
                Ok(document_count) => {
                    return Ok(RetrievalStats {
                        document_count,
                        backend_active: Backend::Primary,
                    });
                }
                Err(e) => warn!("Primary stats failed for '{}', falling back: {}", namespace, e),
            }
        }

        let document_count = self.fallback.count(&namespace).await?;
        Ok(RetrievalStats {
            document_count,
            backend_active: Backend::Fallback,
        })
    }
}

/// Convert raw backend matches into the caller-facing result shape.
///
/// Both paths go through here so threshold and ordering semantics cannot
/// drift between backends: relevance is `max(0, 1 - distance)`, filtering
/// happens on relevance, and ties order by chunk index then id.
fn normalize(matches: Vec<RawMatch>, threshold: f32, limit: usize) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = matches
        .into_iter()
        .map(|candidate| {
            let relevance_score = (1.0 - candidate.distance).max(0.0);
            SearchResult {
                id: candidate.id,
                content: candidate.content,
                file_id: candidate.metadata.file_id.clone(),
                file_name: candidate.metadata.file_name.clone(),
                chunk_index: candidate.metadata.chunk_index,
                distance: candidate.distance,
                relevance_score,
                metadata: candidate.metadata.to_map(),
            }
        })
        .filter(|result| result.relevance_score >= threshold)
        .collect();

    results.sort_by(|a, b| {
        b.relevance_score
            .total_cmp(&a.relevance_score)
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
            .then_with(|| a.id.cmp(&b.id))
    });
    results.truncate(limit);
    results
}
