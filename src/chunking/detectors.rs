//! Content-based chunk detectors: tabular layout and obligation language.

const TABLE_KEYWORDS: [&str; 3] = ["pricing", "clin", "line item"];
const OBLIGATION_KEYWORDS: [&str; 5] = ["shall", "must", "required", "requirement", "mandatory"];

/// Flags text that looks like a table (pricing schedules, CLIN line items).
///
/// Table chunks are kept in the chunk store for citation purposes but are
/// excluded from the vector index: delimiter soup embeds poorly and crowds
/// out better matches.
pub fn is_table(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 3 {
        return false;
    }
    if text.contains('|') || text.contains('\t') {
        return true;
    }
    lines.iter().take(5).any(|line| {
        let lower = line.to_lowercase();
        TABLE_KEYWORDS.iter().any(|kw| lower.contains(kw))
    })
}

/// Flags text that contains obligation language, independent of which
/// section heading it fell under.
pub fn has_requirement_language(text: &str) -> bool {
    let lower = text.to_lowercase();
    OBLIGATION_KEYWORDS.iter().any(|kw| lower.contains(kw))
}
