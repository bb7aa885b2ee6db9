//! Crate-wide error types shared across the chunking and retrieval pipeline.

use thiserror::Error;

/// Errors surfaced by ingestion, storage, and retrieval operations.
///
/// The pure chunking functions ([`crate::chunking`]) never fail; everything
/// that can go wrong lives at the orchestration boundary and propagates to
/// the caller through this enum. A parse failure is fatal to the whole
/// ingestion of its document: a partially indexed document is worse than an
/// unindexed one.
#[derive(Debug, Error)]
pub enum RagError {
    /// A source file could not be converted to plain text.
    #[error("parse failed for {file}: {message}")]
    Parse { file: String, message: String },

    /// The chunk store rejected or failed an operation.
    #[error("chunk store error: {0}")]
    Storage(String),

    /// The vector backend rejected or failed an upsert/query.
    #[error("vector backend error: {0}")]
    VectorBackend(String),

    /// Filesystem error while enumerating or reading document files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
