//! Structural segmentation: walks document text line by line, groups content
//! under detected headings, and packs each section into token-bounded chunks.

use serde::{Deserialize, Serialize};

use crate::chunking::detectors::has_requirement_language;
use crate::chunking::heading::{classify_section, is_heading, SectionType};
use crate::chunking::tokenizer::count_tokens;
use crate::config::ChunkingConfig;

/// A segmented passage before provenance and storage fields are attached.
///
/// `chunk_index` is the running per-document ordinal threaded through
/// successive [`segment_text`] calls, so indices stay strictly increasing
/// across all files of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkDraft {
    pub text: String,
    pub section_name: String,
    pub section_type: SectionType,
    pub is_critical: bool,
    pub requirement_flag: bool,
    pub chunk_index: usize,
}

/// One heading's worth of accumulated content.
struct Section {
    name: String,
    section_type: SectionType,
    is_critical: bool,
    lines: Vec<String>,
}

impl Section {
    fn unclassified() -> Self {
        Self {
            name: String::new(),
            section_type: SectionType::Other,
            is_critical: false,
            lines: Vec::new(),
        }
    }

    fn from_heading(line: &str) -> Self {
        let name = line.trim().to_string();
        let (section_type, is_critical) = classify_section(&name);
        Self {
            name,
            section_type,
            is_critical,
            lines: Vec::new(),
        }
    }
}

/// Segments `text` into classified, token-bounded chunk drafts.
///
/// `first_index` is the next available chunk ordinal; the returned counter is
/// the ordinal after the last emitted chunk, ready to hand to the next file's
/// segmentation call.
///
/// Sections at or under `max_tokens` become a single chunk; larger sections
/// are split on blank-line paragraph boundaries and packed greedily. A lone
/// paragraph over `max_tokens` is accepted as one oversized chunk rather than
/// being split mid-paragraph. Documents with no detected headings degrade to
/// pure paragraph packing under an empty, non-critical section. Empty input
/// yields no chunks.
pub fn segment_text(
    text: &str,
    config: &ChunkingConfig,
    first_index: usize,
) -> (Vec<ChunkDraft>, usize) {
    let mut drafts = Vec::new();
    let mut next_index = first_index;
    let mut section = Section::unclassified();

    for line in text.lines() {
        if is_heading(line) {
            close_section(&section, config, &mut drafts, &mut next_index);
            section = Section::from_heading(line);
        } else {
            section.lines.push(line.to_string());
        }
    }
    close_section(&section, config, &mut drafts, &mut next_index);

    (drafts, next_index)
}

/// Emits the accumulated section as one or more chunks, advancing the
/// ordinal. Sections with only blank content are discarded.
fn close_section(
    section: &Section,
    config: &ChunkingConfig,
    drafts: &mut Vec<ChunkDraft>,
    next_index: &mut usize,
) {
    let body = section.lines.join("\n");
    let body = body.trim();
    if body.is_empty() {
        return;
    }

    if count_tokens(body) <= config.max_tokens {
        push_draft(section, body.to_string(), drafts, next_index);
        return;
    }

    for packed in pack_paragraphs(body, config.max_tokens) {
        push_draft(section, packed, drafts, next_index);
    }
}

fn push_draft(
    section: &Section,
    text: String,
    drafts: &mut Vec<ChunkDraft>,
    next_index: &mut usize,
) {
    let requirement_flag = has_requirement_language(&text);
    drafts.push(ChunkDraft {
        text,
        section_name: section.name.clone(),
        section_type: section.section_type,
        is_critical: section.is_critical,
        requirement_flag,
        chunk_index: *next_index,
    });
    *next_index += 1;
}

/// Greedily packs blank-line-delimited paragraphs into chunks, flushing when
/// adding the next paragraph would push past `max_tokens`.
fn pack_paragraphs(body: &str, max_tokens: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0usize;

    for paragraph in split_paragraphs(body) {
        let tokens = count_tokens(&paragraph);
        if !current.is_empty() && current_tokens + tokens > max_tokens {
            chunks.push(current.join("\n\n"));
            current.clear();
            current_tokens = 0;
        }
        current.push(paragraph);
        current_tokens += tokens;
    }
    if !current.is_empty() {
        chunks.push(current.join("\n\n"));
    }
    chunks
}

/// Splits text into paragraphs at blank-line boundaries, dropping blank-only
/// segments.
fn split_paragraphs(body: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.trim().is_empty() {
            flush_paragraph(&mut current, &mut paragraphs);
        } else {
            current.push(line);
        }
    }
    flush_paragraph(&mut current, &mut paragraphs);
    paragraphs
}

fn flush_paragraph(current: &mut Vec<&str>, paragraphs: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    let paragraph = current.join("\n").trim().to_string();
    if !paragraph.is_empty() {
        paragraphs.push(paragraph);
    }
    current.clear();
}
