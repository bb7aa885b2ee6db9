//! Ingestion: enumerate a document's files, segment and classify them, and
//! commit one amendment's chunks to the store and the vector index.
//!
//! * [`files`] — file enumeration and parsing boundaries.
//! * [`pipeline`] — the orchestrator driving one document's ingestion.

pub mod files;
pub mod pipeline;

pub use files::{
    sanitize_filename, DirectoryFiles, DocumentFiles, FileParser, PlainTextParser, SourceFile,
};
pub use pipeline::{IngestionPipeline, IngestionPipelineBuilder};
