//! Ingestion orchestration: files in, versioned chunks + vector index out.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use crate::chunking::{is_table, segment_text};
use crate::config::IngestConfig;
use crate::ingestion::files::{sanitize_filename, DocumentFiles, FileParser};
use crate::stores::{ChunkRecord, ChunkStore};
use crate::types::RagError;
use crate::vector::{VectorBackend, VectorDocument};

/// Length cap for the sanitized filename component of a chunk id.
const CHUNK_ID_NAME_LEN: usize = 80;

/// Drives segmentation, classification, storage, and vector indexing for one
/// document at a time.
///
/// Chunk ids are deterministic (document id, sanitized filename, running
/// ordinal), so re-running the same amendment upserts in place. Concurrent
/// ingests of *different* documents are independent; calls for the same
/// document must be serialized by the caller.
///
/// # Examples
///
/// ```rust,ignore
/// use tendersmith::ingestion::IngestionPipeline;
///
/// let pipeline = IngestionPipeline::builder()
///     .store(store)
///     .vector_backend(backend)
///     .document_files(files)
///     .parser(parser)
///     .build();
///
/// let indexed = pipeline.ingest("N1").await?;
/// ```
pub struct IngestionPipeline {
    store: Arc<dyn ChunkStore>,
    vector: Arc<dyn VectorBackend>,
    files: Arc<dyn DocumentFiles>,
    parser: Arc<dyn FileParser>,
    config: IngestConfig,
}

impl IngestionPipeline {
    /// Create a new builder for constructing an `IngestionPipeline`.
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Ingests `document_id`, returning the number of chunks submitted to
    /// the vector backend.
    ///
    /// Idempotent: if the document already has current-amendment chunks, the
    /// stored count is returned without re-parsing anything. Use
    /// [`reingest`](Self::reingest) to supersede the current amendment.
    ///
    /// On failure nothing is committed: the vector index is written first and
    /// the amendment pointer only moves at the final commit, so a failed call
    /// can simply be retried.
    pub async fn ingest(&self, document_id: &str) -> Result<usize, RagError> {
        let existing = self.store.latest_chunk_count(document_id).await?;
        if existing > 0 {
            let indexed = self.store.latest_indexed_count(document_id).await?;
            info!(document_id, existing, indexed, "document already ingested; skipping");
            return Ok(indexed);
        }
        self.run_amendment(document_id).await
    }

    /// Forces a new amendment for `document_id`, superseding whatever is
    /// currently indexed once the new chunk set commits.
    pub async fn reingest(&self, document_id: &str) -> Result<usize, RagError> {
        self.run_amendment(document_id).await
    }

    async fn run_amendment(&self, document_id: &str) -> Result<usize, RagError> {
        let amendment = match self.store.max_amendment(document_id).await? {
            Some(previous) => previous + 1,
            None => 0,
        };

        let files = self.files.list(document_id).await?;
        let mut records: Vec<ChunkRecord> = Vec::new();
        // Chunk ordinal threads across every file of the document so ids and
        // indices stay unique for the whole ingestion run.
        let mut ordinal = 0usize;

        for file in &files {
            if !self.config.should_ingest(&file.name) {
                debug!(document_id, file = %file.name, "skipping non-substantive file");
                continue;
            }

            // A parse failure aborts the whole document: an incomplete index
            // is worse than none.
            let text = self.parser.parse(file).await?;

            let (drafts, next_ordinal) = segment_text(&text, &self.config.chunking, ordinal);
            info!(
                document_id,
                file = %file.name,
                chunks = drafts.len(),
                "segmented file"
            );
            ordinal = next_ordinal;

            let safe_name = sanitize_filename(&file.name, CHUNK_ID_NAME_LEN);
            for draft in drafts {
                records.push(ChunkRecord {
                    chunk_id: format!("{document_id}_{safe_name}_{}", draft.chunk_index),
                    document_id: document_id.to_string(),
                    source_filename: file.name.clone(),
                    is_table: is_table(&draft.text),
                    text: draft.text,
                    section_name: draft.section_name,
                    section_type: draft.section_type,
                    is_critical: draft.is_critical,
                    requirement_flag: draft.requirement_flag,
                    chunk_index: draft.chunk_index,
                    amendment_number: amendment,
                    is_latest_version: true,
                });
            }
        }

        if records.is_empty() {
            info!(document_id, "no eligible files produced chunks");
            return Ok(0);
        }

        let documents: Vec<VectorDocument> = records
            .iter()
            .filter(|record| !record.is_table)
            .map(|record| VectorDocument {
                id: record.chunk_id.clone(),
                text: record.text.clone(),
                metadata: json!({
                    "chunk_id": record.chunk_id,
                    "document_id": record.document_id,
                    "source_filename": record.source_filename,
                    "section_type": record.section_type,
                    "is_critical": record.is_critical,
                    "requirement_flag": record.requirement_flag,
                }),
            })
            .collect();

        let stored = records.len();
        let indexed = documents.len();

        // Index before committing: a failed upsert leaves the amendment
        // pointer unmoved, so the next `ingest` call starts over instead of
        // short-circuiting on a half-finished amendment. Stray vector entries
        // from the failed attempt are overwritten by the retry (ids are
        // deterministic) or discarded at retrieval time.
        if !documents.is_empty() {
            self.vector.upsert(documents).await?;
        }
        self.store
            .commit_amendment(document_id, amendment, records)
            .await?;

        info!(
            document_id,
            amendment, stored, indexed, "ingestion committed"
        );
        Ok(indexed)
    }
}

/// Builder for constructing [`IngestionPipeline`] instances.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    store: Option<Arc<dyn ChunkStore>>,
    vector: Option<Arc<dyn VectorBackend>>,
    files: Option<Arc<dyn DocumentFiles>>,
    parser: Option<Arc<dyn FileParser>>,
    config: Option<IngestConfig>,
}

impl IngestionPipelineBuilder {
    /// Set the chunk store. Required.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn ChunkStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the vector backend. Required.
    #[must_use]
    pub fn vector_backend(mut self, vector: Arc<dyn VectorBackend>) -> Self {
        self.vector = Some(vector);
        self
    }

    /// Set the document file enumerator. Required.
    #[must_use]
    pub fn document_files(mut self, files: Arc<dyn DocumentFiles>) -> Self {
        self.files = Some(files);
        self
    }

    /// Set the file parser. Required.
    #[must_use]
    pub fn parser(mut self, parser: Arc<dyn FileParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Override the default ingestion policy and token windows.
    #[must_use]
    pub fn config(mut self, config: IngestConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the [`IngestionPipeline`].
    ///
    /// # Panics
    ///
    /// Panics if any of the four collaborators is missing.
    pub fn build(self) -> IngestionPipeline {
        IngestionPipeline {
            store: self.store.expect("IngestionPipelineBuilder requires a store"),
            vector: self
                .vector
                .expect("IngestionPipelineBuilder requires a vector backend"),
            files: self
                .files
                .expect("IngestionPipelineBuilder requires a document file source"),
            parser: self
                .parser
                .expect("IngestionPipelineBuilder requires a parser"),
            config: self.config.unwrap_or_default(),
        }
    }

    /// Build the [`IngestionPipeline`], returning `None` if a collaborator
    /// is missing.
    pub fn try_build(self) -> Option<IngestionPipeline> {
        Some(IngestionPipeline {
            store: self.store?,
            vector: self.vector?,
            files: self.files?,
            parser: self.parser?,
            config: self.config.unwrap_or_default(),
        })
    }
}
