//! Token estimation for chunk sizing.
//!
//! With the default `tiktoken` feature the estimator counts exact cl100k_base
//! subword tokens; without it (or if the encoder cannot be constructed) it
//! approximates with a word-count heuristic. Either path is deterministic for
//! a given input, and the segmenter treats its token windows as targets so a
//! ~30% estimation error never breaks the bounding behavior.

#[cfg(feature = "tiktoken")]
use std::sync::OnceLock;

#[cfg(feature = "tiktoken")]
use tiktoken_rs::CoreBPE;

#[cfg(feature = "tiktoken")]
fn encoder() -> Option<&'static CoreBPE> {
    static ENCODER: OnceLock<Option<CoreBPE>> = OnceLock::new();
    ENCODER
        .get_or_init(|| tiktoken_rs::cl100k_base().ok())
        .as_ref()
}

/// Approximates the number of tokens in `text`.
pub fn count_tokens(text: &str) -> usize {
    #[cfg(feature = "tiktoken")]
    if let Some(bpe) = encoder() {
        return bpe.encode_with_special_tokens(text).len();
    }
    heuristic_count(text)
}

/// Word-count fallback: `round(words * 1.3)`.
fn heuristic_count(text: &str) -> usize {
    (text.split_whitespace().count() as f64 * 1.3).round() as usize
}
