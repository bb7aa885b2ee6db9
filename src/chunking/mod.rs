//! Pure, stateless segmentation and classification logic.
//!
//! Nothing in this module performs I/O or fails: unknown section types
//! degrade to `other`, empty input degrades to zero chunks. The ingestion
//! pipeline composes these pieces with the stores and the vector backend.

pub mod detectors;
pub mod heading;
pub mod segmenter;
pub mod tokenizer;

pub use detectors::{has_requirement_language, is_table};
pub use heading::{classify_section, is_heading, SectionType};
pub use segmenter::{segment_text, ChunkDraft};
pub use tokenizer::count_tokens;
