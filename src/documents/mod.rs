// Core data model for stored vectors and search results


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{RetrievalError, Result};

/// One embedded unit of content, immutable once stored.
///
/// Re-storing the same `id` is a full overwrite; there are no partial-field
/// updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    /// Unique within the owning namespace and stable across re-indexing:
    /// `{file_id}_{chunk_index}`, so re-upserts overwrite rather than
    /// duplicate.
    pub id: String,
    /// The original text span, kept for result display and fallback scoring
    /// diagnostics.
    pub content: String,
    /// Fixed-length embedding; the length must match the configured model
    /// dimensionality.
    pub embedding: Vec<f32>,
    pub metadata: DocumentMetadata,
}

/// Metadata stored alongside each document.
///
/// The named fields are required; `extra` is an open map passed through
/// unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_id: String,
    pub file_name: String,
    pub chunk_index: u32,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One ordered text span produced by the chunking step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub file_id: String,
    pub file_name: String,
    pub chunk_index: u32,
    pub content: String,
}

/// A ranked hit returned to callers, identical in shape for both backends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub file_id: String,
    pub file_name: String,
    pub chunk_index: u32,
    /// Raw backend distance, ascending is better.
    pub distance: f32,
    /// `max(0, 1 - distance)`; the fixed mapping shared by both backends.
    pub relevance_score: f32,
    /// Full metadata map, required keys plus passthrough extras.
    pub metadata: Map<String, Value>,
}

impl VectorDocument {
    /// Build a document from a chunking-step tuple and its embedding.
    #[inline]
    pub fn from_chunk(chunk: &DocumentChunk, embedding: Vec<f32>, owner_id: &str) -> Self {
        Self {
            id: format!("{}_{}", chunk.file_id, chunk.chunk_index),
            content: chunk.content.clone(),
            embedding,
            metadata: DocumentMetadata {
                file_id: chunk.file_id.clone(),
                file_name: chunk.file_name.clone(),
                chunk_index: chunk.chunk_index,
                owner_id: owner_id.to_string(),
                created_at: Utc::now(),
                extra: Map::new(),
            },
        }
    }

    /// Reject embeddings that do not match the configured dimensionality.
    ///
    /// Mismatched lengths are a hard error, never silently truncated or
    /// padded.
    #[inline]
    pub fn ensure_dimension(&self, expected: usize) -> Result<()> {
        if self.embedding.len() == expected {
            Ok(())
        } else {
            Err(RetrievalError::DimensionMismatch {
                expected,
                actual: self.embedding.len(),
            })
        }
    }
}

impl DocumentMetadata {
    /// Flatten into the open map shape callers see on results.
    #[inline]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        map.insert("file_id".to_string(), Value::from(self.file_id.as_str()));
        map.insert(
            "file_name".to_string(),
            Value::from(self.file_name.as_str()),
        );
        map.insert("chunk_index".to_string(), Value::from(self.chunk_index));
        map.insert("owner_id".to_string(), Value::from(self.owner_id.as_str()));
        map.insert(
            "created_at".to_string(),
            Value::from(self.created_at.to_rfc3339()),
        );
        map
    }
}
