#[cfg(test)]
mod tests;

use tracing::debug;

use crate::documents::DocumentChunk;

/// Configuration for document chunking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters before a paragraph starts a new
    /// chunk
    pub max_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chunk_chars: 1000,
        }
    }
}

/// Split a document into ordered, stable-indexed chunks.
///
/// Paragraphs (blank-line separated) are accumulated until the next one
/// would push the chunk past `max_chunk_chars`; a single oversized paragraph
/// still becomes one chunk rather than being split mid-sentence.
#[inline]
pub fn chunk_document(
    file_id: &str,
    file_name: &str,
    text: &str,
    config: &ChunkingConfig,
) -> Vec<DocumentChunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut chunk_index = 0u32;

    let mut push_chunk = |content: &str, index: &mut u32| {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return;
        }
        chunks.push(DocumentChunk {
            file_id: file_id.to_string(),
            file_name: file_name.to_string(),
            chunk_index: *index,
            content: trimmed.to_string(),
        });
        *index += 1;
    };

    for paragraph in text.split("\n\n") {
        if current.len() + paragraph.len() > config.max_chunk_chars && !current.is_empty() {
            push_chunk(&current, &mut chunk_index);
            current = paragraph.to_string();
        } else if current.is_empty() {
            current = paragraph.to_string();
        } else {
            current.push_str("\n\n");
            current.push_str(paragraph);
        }
    }
    push_chunk(&current, &mut chunk_index);

    debug!("Chunked '{}' into {} chunks", file_name, chunks.len());
    chunks
}
