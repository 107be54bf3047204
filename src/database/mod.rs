// Storage backends module
// Two engines, one contract: the LanceDB vector index and the SQLite
// brute-force store are interchangeable behind [`VectorBackend`]

pub mod lancedb;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::documents::{DocumentMetadata, VectorDocument};

/// Tag for the closed set of storage engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    Primary,
    Fallback,
}

impl std::fmt::Display for Backend {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Backend::Primary => write!(f, "primary"),
            Backend::Fallback => write!(f, "fallback"),
        }
    }
}

/// Parameters for a backend query, resolved by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub limit: usize,
    /// Minimum relevance score. The vector index ignores it (the
    /// orchestrator filters its raw distances); the brute-force store uses
    /// it to discard candidates before truncation.
    pub threshold: f32,
    /// When present, restricts hits to documents with one of these file ids.
    /// An empty set matches nothing.
    pub file_filter: Option<Vec<String>>,
}

/// An unranked hit as reported by a backend, distance ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
    pub distance: f32,
}

/// The four-operation contract both storage engines implement.
///
/// Implementations never retry internally and never reorder what the engine
/// asked for; recovery decisions belong to the orchestrator.
#[async_trait]
pub trait VectorBackend {
    /// Batched insert-or-replace keyed by `(namespace, id)`.
    async fn upsert(&self, namespace: &str, documents: &[VectorDocument]) -> Result<()>;

    /// Nearest candidates for `query_vector`, ordered ascending by distance.
    async fn query(
        &self,
        namespace: &str,
        query_vector: &[f32],
        options: &QueryOptions,
    ) -> Result<Vec<RawMatch>>;

    /// Delete every document whose `file_id` matches, scoped to `namespace`.
    /// Deleting a non-existent file is a no-op.
    async fn delete_by_file(&self, namespace: &str, file_id: &str) -> Result<u64>;

    /// Total stored vectors for the namespace, for diagnostics.
    async fn count(&self, namespace: &str) -> Result<u64>;
}

/// Escape a string literal for use inside a backend predicate.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
