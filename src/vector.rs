//! Vector-similarity backend boundary.
//!
//! The embedding model and the similarity index live behind [`VectorBackend`]:
//! the pipeline hands over raw text plus metadata and the backend embeds
//! internally, mirroring managed vector services. [`MockVectorBackend`]
//! provides a deterministic in-process implementation for tests and CI.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::RagError;

/// A chunk submitted for embedding and indexing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VectorDocument {
    pub id: String,
    pub text: String,
    /// Enough metadata to re-associate a match with its chunk store record
    /// (`chunk_id` at minimum, plus document identity for filtering).
    pub metadata: serde_json::Value,
}

/// A ranked similarity match returned by [`VectorBackend::query`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

/// One logical similarity index.
///
/// `upsert` replaces documents by id; `query` returns matches in descending
/// similarity order. Implementations are expected to carry caller-supplied
/// timeouts and surface failures as [`RagError::VectorBackend`] rather than
/// hang.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    async fn upsert(&self, documents: Vec<VectorDocument>) -> Result<(), RagError>;

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<VectorMatch>, RagError>;
}

/// In-memory backend scoring by word overlap.
///
/// Deterministic for a given corpus and query: scores are Jaccard similarity
/// over lower-cased word sets, ties broken by document id.
#[derive(Default)]
pub struct MockVectorBackend {
    documents: RwLock<Vec<VectorDocument>>,
}

impl MockVectorBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Ids currently present in the index, in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.documents.read().iter().map(|d| d.id.clone()).collect()
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f32 / union as f32
}

#[async_trait]
impl VectorBackend for MockVectorBackend {
    async fn upsert(&self, documents: Vec<VectorDocument>) -> Result<(), RagError> {
        let mut guard = self.documents.write();
        for doc in documents {
            if let Some(existing) = guard.iter_mut().find(|d| d.id == doc.id) {
                *existing = doc;
            } else {
                guard.push(doc);
            }
        }
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<VectorMatch>, RagError> {
        let query_words = word_set(text);
        let guard = self.documents.read();
        let mut scored: Vec<VectorMatch> = guard
            .iter()
            .map(|doc| VectorMatch {
                id: doc.id.clone(),
                score: jaccard(&query_words, &word_set(&doc.text)),
                metadata: doc.metadata.clone(),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}
