//! Durable chunk storage.
//!
//! The [`ChunkStore`] trait abstracts the document-oriented store that holds
//! every ingested chunk, keyed by `chunk_id`, with amendment versioning per
//! document. Chunks are never deleted: a re-ingestion writes a new amendment
//! and moves the document's current-amendment pointer in the same
//! transaction, which supersedes the previous amendment's chunks without a
//! separate mark-stale step.
//!
//! # Supported Backends
//!
//! - [`sqlite::SqliteChunkStore`] - SQLite via `tokio-rusqlite`

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chunking::SectionType;
use crate::types::RagError;

pub use sqlite::SqliteChunkStore;

/// A persisted chunk: the unit of retrieval.
///
/// `chunk_id` is deterministic — document id, sanitized source filename, and
/// the running per-document ordinal — so re-ingesting the same amendment
/// upserts in place instead of duplicating rows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub document_id: String,
    pub source_filename: String,
    pub text: String,
    /// Heading the chunk fell under; empty for fallback-segmented chunks.
    pub section_name: String,
    pub section_type: SectionType,
    pub is_critical: bool,
    /// Content-based obligation-language signal, independent of the heading.
    pub requirement_flag: bool,
    /// Tabular chunks are stored but never sent to the vector backend.
    pub is_table: bool,
    pub chunk_index: usize,
    pub amendment_number: u32,
    /// Derived on read from the document's current-amendment pointer; the
    /// value is ignored on write.
    #[serde(default)]
    pub is_latest_version: bool,
}

/// Persistent store for [`ChunkRecord`]s with per-document amendment
/// versioning.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Number of chunks belonging to the document's current amendment.
    async fn latest_chunk_count(&self, document_id: &str) -> Result<usize, RagError>;

    /// Like [`latest_chunk_count`](Self::latest_chunk_count), but counting
    /// only chunks eligible for the vector index (non-table). This is the
    /// figure `ingest` returned when the amendment was first committed, and
    /// what its idempotent short-circuit reports.
    async fn latest_indexed_count(&self, document_id: &str) -> Result<usize, RagError>;

    /// Highest amendment number ever stored for the document, if any.
    async fn max_amendment(&self, document_id: &str) -> Result<Option<u32>, RagError>;

    /// Upserts one amendment's chunks and moves the document's
    /// current-amendment pointer, atomically.
    async fn commit_amendment(
        &self,
        document_id: &str,
        amendment: u32,
        chunks: Vec<ChunkRecord>,
    ) -> Result<(), RagError>;

    /// Looks up a chunk by id, returning it only if it belongs to its
    /// document's current amendment.
    async fn get_latest_chunk(&self, chunk_id: &str) -> Result<Option<ChunkRecord>, RagError>;

    /// All stored chunks for a document across every amendment, ordered by
    /// amendment then chunk index.
    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<ChunkRecord>, RagError>;

    /// Total number of chunk rows in the store.
    async fn count(&self) -> Result<usize, RagError>;
}
