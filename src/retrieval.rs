//! Retrieval-context assembly: similarity matches in, hydrated chunks out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chunking::SectionType;
use crate::stores::ChunkStore;
use crate::types::RagError;
use crate::vector::VectorBackend;

/// A retrieval result: the vector backend's score joined with the chunk
/// store's authoritative text and classification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub score: f32,
    pub text: String,
    pub document_id: String,
    pub source_filename: String,
    pub section_name: String,
    pub section_type: SectionType,
    pub is_critical: bool,
    pub requirement_flag: bool,
    pub chunk_index: usize,
    /// The vector match's own metadata, kept for citation context; the typed
    /// fields above are the authoritative copies.
    pub metadata: serde_json::Value,
}

/// Assembles a ranked retrieval context from the vector backend and the
/// chunk store.
///
/// Matches are over-fetched (`2 * top_k`) to tolerate filtering losses, then
/// filtered by document identity, hydrated from the store requiring the
/// current amendment, and returned in the backend's similarity order. A match
/// that no longer resolves to a current chunk is skipped, which reconciles
/// the append-only vector index with the store's versioning.
pub struct Retriever {
    store: Arc<dyn ChunkStore>,
    vector: Arc<dyn VectorBackend>,
}

impl Retriever {
    pub fn new(store: Arc<dyn ChunkStore>, vector: Arc<dyn VectorBackend>) -> Self {
        Self { store, vector }
    }

    /// Top `top_k` current-version chunks matching `query_text`, optionally
    /// restricted to one document. Zero surviving matches is not an error.
    pub async fn retrieve(
        &self,
        query_text: &str,
        top_k: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let matches = self.vector.query(query_text, top_k * 2).await?;
        debug!(matches = matches.len(), "vector backend returned matches");

        let mut results = Vec::new();
        for m in matches {
            if let Some(wanted) = document_id {
                let match_document = m.metadata.get("document_id").and_then(|v| v.as_str());
                if match_document != Some(wanted) {
                    continue;
                }
            }

            let chunk_id = if m.id.is_empty() {
                m.metadata
                    .get("chunk_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            } else {
                m.id.clone()
            };
            if chunk_id.is_empty() {
                warn!("match carries no chunk id; skipping");
                continue;
            }

            // Store I/O errors propagate; a miss means the chunk was
            // superseded (or never stored) and is silently dropped.
            let Some(chunk) = self.store.get_latest_chunk(&chunk_id).await? else {
                warn!(chunk_id, "match not in current amendment; skipping");
                continue;
            };

            results.push(RetrievedChunk {
                chunk_id,
                score: m.score,
                text: chunk.text,
                document_id: chunk.document_id,
                source_filename: chunk.source_filename,
                section_name: chunk.section_name,
                section_type: chunk.section_type,
                is_critical: chunk.is_critical,
                requirement_flag: chunk.requirement_flag,
                chunk_index: chunk.chunk_index,
                metadata: m.metadata,
            });
            if results.len() >= top_k {
                break;
            }
        }

        debug!(results = results.len(), "assembled retrieval context");
        Ok(results)
    }
}
