// LanceDB vector index backend
// One table per tenant namespace; the index service owns ANN construction

#[cfg(test)]
mod tests;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use itertools::Itertools;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database::{Backend, QueryOptions, RawMatch, VectorBackend, quote_literal};
use crate::documents::{DocumentMetadata, VectorDocument};
use crate::{RetrievalError, Result};

/// Vector index adapter backed by LanceDB.
///
/// Holds one connection per process; the connection is internally
/// reference-counted and safe to share across concurrent requests.
#[derive(Clone)]
pub struct PrimaryIndex {
    connection: Connection,
    dimension: usize,
    write_batch_size: usize,
}

impl PrimaryIndex {
    /// Connect to the vector index location named by the configuration.
    ///
    /// # Errors
    /// * `BackendUnavailable` if the index location cannot be reached
    #[inline]
    pub async fn connect(config: &Config) -> Result<Self> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(&db_path).map_err(|e| RetrievalError::BackendUnavailable {
            backend: Backend::Primary,
            namespace: String::new(),
            reason: format!("failed to create vector database directory: {e}"),
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri).execute().await.map_err(|e| {
            RetrievalError::BackendUnavailable {
                backend: Backend::Primary,
                namespace: String::new(),
                reason: format!("failed to connect to LanceDB: {e}"),
            }
        })?;

        info!("Vector index initialized at {}", db_path.display());
        Ok(Self {
            connection,
            dimension: config.embedding.dimension,
            write_batch_size: config.engine.write_batch_size,
        })
    }

    fn unavailable(&self, namespace: &str, reason: impl Display) -> RetrievalError {
        RetrievalError::BackendUnavailable {
            backend: Backend::Primary,
            namespace: namespace.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Idempotent get-or-create of a namespace's collection.
    ///
    /// Collections are created lazily on first write and never destroyed by
    /// this component.
    #[inline]
    pub async fn ensure_collection(&self, namespace: &str) -> Result<Table> {
        if let Some(table) = self.open_collection(namespace).await? {
            return Ok(table);
        }

        info!("Creating collection '{}'", namespace);
        let schema = self.collection_schema();
        self.connection
            .create_empty_table(namespace, schema)
            .execute()
            .await
            .map_err(|e| self.unavailable(namespace, format!("failed to create collection: {e}")))
    }

    /// Open a namespace's collection, or `None` when nothing was ever stored
    /// under it.
    async fn open_collection(&self, namespace: &str) -> Result<Option<Table>> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| self.unavailable(namespace, format!("failed to list collections: {e}")))?;

        if !table_names.iter().any(|name| name == namespace) {
            return Ok(None);
        }

        let table = self
            .connection
            .open_table(namespace)
            .execute()
            .await
            .map_err(|e| self.unavailable(namespace, format!("failed to open collection: {e}")))?;

        Ok(Some(table))
    }

    fn collection_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("file_id", DataType::Utf8, false),
            Field::new("file_name", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("owner_id", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
            Field::new("extra", DataType::Utf8, false),
        ]))
    }

    fn record_batch(&self, documents: &[VectorDocument]) -> anyhow::Result<RecordBatch> {
        let len = documents.len();

        let mut ids = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut file_ids = Vec::with_capacity(len);
        let mut file_names = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut owner_ids = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);
        let mut extras = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.dimension);

        for document in documents {
            ids.push(document.id.as_str());
            contents.push(document.content.as_str());
            file_ids.push(document.metadata.file_id.as_str());
            file_names.push(document.metadata.file_name.as_str());
            chunk_indices.push(document.metadata.chunk_index);
            owner_ids.push(document.metadata.owner_id.as_str());
            created_ats.push(document.metadata.created_at.to_rfc3339());
            extras.push(serde_json::to_string(&document.metadata.extra)?);
            flat_values.extend_from_slice(&document.embedding);
        }

        let values_array = Float32Array::from(flat_values);
        let item_field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            item_field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(file_ids)),
            Arc::new(StringArray::from(file_names)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(owner_ids)),
            Arc::new(StringArray::from(created_ats)),
            Arc::new(StringArray::from(extras)),
        ];

        Ok(RecordBatch::try_new(self.collection_schema(), arrays)?)
    }

    /// Replace-then-add for one sub-batch, so re-stored ids overwrite.
    async fn write_sub_batch(&self, table: &Table, documents: &[VectorDocument]) -> anyhow::Result<()> {
        let predicate = format!(
            "id IN ({})",
            documents
                .iter()
                .map(|document| quote_literal(&document.id))
                .join(", ")
        );
        table.delete(&predicate).await?;

        let record_batch = self.record_batch(documents)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table.add(reader).execute().await?;

        Ok(())
    }

    fn parse_match_batch(&self, batch: &RecordBatch, namespace: &str) -> Result<Vec<RawMatch>> {
        let column = |name: &str| -> Result<&StringArray> {
            batch
                .column_by_name(name)
                .and_then(|col| col.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| self.unavailable(namespace, format!("missing {name} column")))
        };

        let ids = column("id")?;
        let contents = column("content")?;
        let file_ids = column("file_id")?;
        let file_names = column("file_name")?;
        let owner_ids = column("owner_id")?;
        let created_ats = column("created_at")?;
        let extras = column("extra")?;

        let chunk_indices = batch
            .column_by_name("chunk_index")
            .and_then(|col| col.as_any().downcast_ref::<UInt32Array>())
            .ok_or_else(|| self.unavailable(namespace, "missing chunk_index column"))?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut matches = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let created_at = DateTime::parse_from_rfc3339(created_ats.value(row))
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_default();
            let extra = serde_json::from_str(extras.value(row)).unwrap_or_default();

            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            matches.push(RawMatch {
                id: ids.value(row).to_string(),
                content: contents.value(row).to_string(),
                metadata: DocumentMetadata {
                    file_id: file_ids.value(row).to_string(),
                    file_name: file_names.value(row).to_string(),
                    chunk_index: chunk_indices.value(row),
                    owner_id: owner_ids.value(row).to_string(),
                    created_at,
                    extra,
                },
                distance,
            });
        }

        Ok(matches)
    }
}

#[async_trait]
impl VectorBackend for PrimaryIndex {
    /// Batched upsert into the namespace's collection.
    ///
    /// The batch is written in sub-batches; if only some sub-batches commit,
    /// the rejected ids are surfaced so the orchestrator can decide what to
    /// retry. No internal retries.
    #[inline]
    async fn upsert(&self, namespace: &str, documents: &[VectorDocument]) -> Result<()> {
        if documents.is_empty() {
            debug!("No documents to store");
            return Ok(());
        }

        let table = self.ensure_collection(namespace).await?;

        let mut rejected_ids = Vec::new();
        let mut first_failure = None;
        for sub_batch in documents.chunks(self.write_batch_size) {
            if let Err(e) = self.write_sub_batch(&table, sub_batch).await {
                warn!(
                    "Sub-batch of {} documents failed for '{}': {}",
                    sub_batch.len(),
                    namespace,
                    e
                );
                rejected_ids.extend(sub_batch.iter().map(|document| document.id.clone()));
                if first_failure.is_none() {
                    first_failure = Some(e.to_string());
                }
            }
        }

        if rejected_ids.is_empty() {
            info!("Stored {} vectors in '{}'", documents.len(), namespace);
            return Ok(());
        }

        if rejected_ids.len() == documents.len() {
            return Err(self.unavailable(
                namespace,
                first_failure.unwrap_or_else(|| "batch write failed".to_string()),
            ));
        }

        Err(RetrievalError::PartialWriteFailure {
            backend: Backend::Primary,
            namespace: namespace.to_string(),
            total: documents.len(),
            rejected_ids,
        })
    }

    /// Cosine-distance vector search, ordered ascending by the backend.
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

        let Some(table) = self.open_collection(namespace).await? else {
            debug!("No collection for '{}', empty result", namespace);
            return Ok(Vec::new());
        };

        let mut query = table
            .vector_search(query_vector)
            .map_err(|e| self.unavailable(namespace, format!("failed to build search: {e}")))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(options.limit);

        if let Some(file_filter) = options.file_filter.as_deref() {
            let predicate = format!(
                "file_id IN ({})",
                file_filter.iter().map(|id| quote_literal(id)).join(", ")
            );
            query = query.only_if(predicate);
        }

        let mut stream = query
            .execute()
            .await
            .map_err(|e| self.unavailable(namespace, format!("failed to execute search: {e}")))?;

        let mut matches = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| self.unavailable(namespace, format!("failed to read results: {e}")))?
        {
            matches.extend(self.parse_match_batch(&batch, namespace)?);
        }

        debug!("Found {} candidates in '{}'", matches.len(), namespace);
        Ok(matches)
    }

    #[inline]
    async fn delete_by_file(&self, namespace: &str, file_id: &str) -> Result<u64> {
        let Some(table) = self.open_collection(namespace).await? else {
            return Ok(0);
        };

        let predicate = format!("file_id = {}", quote_literal(file_id));
        table
            .delete(&predicate)
            .await
            .map_err(|e| self.unavailable(namespace, format!("failed to delete file: {e}")))?;

        info!("Deleted vectors for file '{}' in '{}'", file_id, namespace);
        // LanceDB does not report how many rows a predicate delete removed
        Ok(0)
    }

    #[inline]
    async fn count(&self, namespace: &str) -> Result<u64> {
        let Some(table) = self.open_collection(namespace).await? else {
            return Ok(0);
        };

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| self.unavailable(namespace, format!("failed to count rows: {e}")))?;

        Ok(count as u64)
    }
}
