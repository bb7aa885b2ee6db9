//! ```text
//! Document files ──► ingestion::IngestionPipeline
//!                          │
//!                          ├─► chunking::segment_text ──► classified ChunkDrafts
//!                          │          │
//!                          │          ├─► heading / tokenizer helpers
//!                          │          └─► table & requirement detectors
//!                          │
//!                          ├─► stores::ChunkStore (amendment committed atomically)
//!                          └─► vector::VectorBackend (non-table chunks only)
//!
//! Query ──► retrieval::Retriever ──► vector matches ──► store hydration
//!                                           (latest amendment only)
//! ```
//!
pub mod chunking;
pub mod config;
pub mod ingestion;
pub mod retrieval;
pub mod stores;
pub mod types;
pub mod vector;

pub use chunking::{
    classify_section, count_tokens, has_requirement_language, is_heading, is_table, segment_text,
    ChunkDraft, SectionType,
};
pub use config::{ChunkingConfig, IngestConfig};
pub use ingestion::{IngestionPipeline, IngestionPipelineBuilder};
pub use retrieval::{RetrievedChunk, Retriever};
pub use stores::{ChunkRecord, ChunkStore, SqliteChunkStore};
pub use types::RagError;
pub use vector::{MockVectorBackend, VectorBackend, VectorDocument, VectorMatch};
