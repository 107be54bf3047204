use thiserror::Error;

use crate::database::Backend;

pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors surfaced by the retrieval engine and its backends.
///
/// Backend-level variants carry the namespace and the attempted backend for
/// diagnostics, never the raw vector contents.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot score a zero-magnitude vector")]
    DegenerateVector,

    #[error("{backend} backend unavailable for namespace '{namespace}': {reason}")]
    BackendUnavailable {
        backend: Backend,
        namespace: String,
        reason: String,
    },

    #[error(
        "{backend} backend rejected {} of {total} documents written to namespace '{namespace}'",
        .rejected_ids.len()
    )]
    PartialWriteFailure {
        backend: Backend,
        namespace: String,
        total: usize,
        rejected_ids: Vec<String>,
    },

    #[error("{backend} backend deadline expired for namespace '{namespace}'")]
    Timeout { backend: Backend, namespace: String },

    #[error(
        "retrieval unavailable for namespace '{namespace}': primary: {primary}; fallback: {fallback}"
    )]
    RetrievalUnavailable {
        namespace: String,
        primary: String,
        fallback: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RetrievalError {
    /// Whether the orchestrator may escalate this error to the other backend.
    ///
    /// `Timeout` is deliberately excluded: a slow backend under load must not
    /// be compounded by doubling load onto the other backend.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            *self,
            RetrievalError::BackendUnavailable { .. } | RetrievalError::PartialWriteFailure { .. }
        )
    }
}

pub mod commands;
pub mod config;
pub mod database;
pub mod documents;
pub mod embeddings;
pub mod namespace;
pub mod retrieval;
pub mod similarity;
