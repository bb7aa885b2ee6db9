//! Tuning knobs for segmentation and ingestion.

/// Token window targets for the structural segmenter.
///
/// Both bounds are targets, not hard caps: `min_tokens` only tunes pack
/// density (an undersized trailing chunk is emitted as-is), and a single
/// paragraph longer than `max_tokens` is accepted as one oversized chunk
/// rather than being split mid-paragraph. Sizing decisions tolerate the
/// roughly 30% error of the heuristic token estimator.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub min_tokens: usize,
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_tokens: 400,
            max_tokens: 600,
        }
    }
}

/// Ingestion-level policy: which files of a document are substantive.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub chunking: ChunkingConfig,
    /// Lower-case extensions (without the dot) eligible for parsing.
    pub supported_extensions: Vec<String>,
    /// Case-insensitive substrings marking administrative forms to skip.
    pub excluded_name_keywords: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            supported_extensions: ["pdf", "xlsx", "txt"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_name_keywords: [
                "questionnaire",
                "form",
                "template",
                "blank",
                "example",
                "sample",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl IngestConfig {
    /// Returns `true` when a file should be parsed and chunked.
    ///
    /// Unsupported extensions and filenames matching an exclusion keyword
    /// (presumed questionnaires, blank forms, and the like) are skipped.
    pub fn should_ingest(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        let ext = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        if !self.supported_extensions.iter().any(|s| s == ext) {
            return false;
        }
        !self
            .excluded_name_keywords
            .iter()
            .any(|kw| lower.contains(kw.as_str()))
    }
}
