use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::documents::VectorDocument;
use crate::embeddings::chunking::{ChunkingConfig, chunk_document};
use crate::embeddings::client::EmbeddingClient;
use crate::retrieval::{RetrievalEngine, SearchOptions};

/// Chunk a local file, embed it, and store the vectors for a tenant
#[inline]
pub async fn store_file(
    config: &Config,
    user_id: &str,
    path: &Path,
    file_id: Option<String>,
    mirror: bool,
) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file_id = file_id.unwrap_or_else(|| file_name.clone());

    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let chunks = chunk_document(&file_id, &file_name, &text, &ChunkingConfig::default());
    if chunks.is_empty() {
        println!("{}", style("Nothing to index: file is empty").yellow());
        return Ok(());
    }
    info!("Chunked '{}' into {} chunks", file_name, chunks.len());

    let client = EmbeddingClient::new(&config.embedding)?;
    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
    let embeddings = client
        .embed_batch(&texts)
        .context("Failed to generate embeddings")?;

    let documents: Vec<VectorDocument> = chunks
        .iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| VectorDocument::from_chunk(chunk, embedding, user_id))
        .collect();

    let engine = RetrievalEngine::new(config).await?;
    if mirror {
        engine.store_vectors_mirrored(user_id, &documents, None).await?;
    } else {
        engine.store_vectors(user_id, &documents, None).await?;
    }

    println!(
        "{}",
        style(format!(
            "✓ Stored {} chunks of '{}' for {}",
            documents.len(),
            file_name,
            user_id
        ))
        .green()
    );
    Ok(())
}

/// Embed a query and print the most relevant stored chunks
#[inline]
pub async fn search(
    config: &Config,
    user_id: &str,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f32>,
    file_filter: Option<Vec<String>>,
) -> Result<()> {
    let client = EmbeddingClient::new(&config.embedding)?;
    let query_vector = client
        .embed(query)
        .context("Failed to embed query")?;

    let engine = RetrievalEngine::new(config).await?;
    let options = SearchOptions {
        limit,
        threshold,
        file_filter,
        deadline: None,
    };
    let results = engine.search_vectors(user_id, &query_vector, &options).await?;

    if results.is_empty() {
        println!("{}", style("No matching chunks").yellow());
        return Ok(());
    }

    println!("Found {} results:", results.len());
    println!();
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{} {} {}",
            style(format!("{}.", rank + 1)).bold(),
            style(&result.file_name).cyan(),
            style(format!("(score {:.3})", result.relevance_score)).dim()
        );

        let preview: String = result.content.chars().take(200).collect();
        if preview.len() < result.content.len() {
            println!("   {preview}…");
        } else {
            println!("   {preview}");
        }
        println!();
    }
    Ok(())
}

/// Delete every stored vector for a file, on both backends
#[inline]
pub async fn delete_file(config: &Config, user_id: &str, file_id: &str) -> Result<()> {
    let engine = RetrievalEngine::new(config).await?;
    engine.delete_file_vectors(user_id, file_id, None).await?;

    println!(
        "{}",
        style(format!("✓ Deleted vectors for '{}' of {}", file_id, user_id)).green()
    );
    Ok(())
}

/// Print stored-document diagnostics for a tenant
#[inline]
pub async fn show_stats(config: &Config, user_id: &str) -> Result<()> {
    let engine = RetrievalEngine::new(config).await?;
    let stats = engine.get_stats(user_id).await?;

    println!("Stats for {}:", style(user_id).bold());
    println!("  Documents: {}", stats.document_count);
    println!("  Active backend: {}", stats.backend_active);
    Ok(())
}

/// Print the loaded configuration and embedding endpoint status
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", style("vectorkeep configuration").bold().cyan());
    println!();
    println!("Base directory: {}", config.base_dir.display());
    println!();
    println!("{}", style("Engine").bold());
    println!("  Primary enabled: {}", config.engine.primary_enabled);
    println!("  Threshold: {}", config.engine.threshold);
    println!("  Default limit: {}", config.engine.default_limit);
    println!("  Overfetch factor: {}", config.engine.overfetch_factor);
    println!("  Write batch size: {}", config.engine.write_batch_size);
    println!(
        "  Operation timeout: {}",
        match config.operation_timeout() {
            Some(timeout) => format!("{timeout:?}"),
            None => "none".to_string(),
        }
    );
    println!();
    println!("{}", style("Embedding endpoint").bold());
    println!(
        "  URL: {}://{}:{}",
        config.embedding.protocol, config.embedding.host, config.embedding.port
    );
    println!("  Model: {}", config.embedding.model);
    println!("  Dimension: {}", config.embedding.dimension);
    println!("  Batch size: {}", config.embedding.batch_size);
    match EmbeddingClient::new(&config.embedding).and_then(|client| client.ping()) {
        Ok(()) => println!("  Status: {}", style("reachable").green()),
        Err(e) => println!("  Status: {}", style(format!("unreachable ({e})")).red()),
    }
    Ok(())
}
