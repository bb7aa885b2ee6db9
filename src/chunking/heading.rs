//! Heading detection and section classification for solicitation documents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic category assigned to a heading (and inherited by the chunks
/// beneath it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Requirement,
    Specification,
    Condition,
    EvaluationCriteria,
    ScopeOfWork,
    Other,
}

impl SectionType {
    /// Every classified type except [`SectionType::Other`] is critical.
    pub fn is_critical(self) -> bool {
        !matches!(self, SectionType::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SectionType::Requirement => "requirement",
            SectionType::Specification => "specification",
            SectionType::Condition => "condition",
            SectionType::EvaluationCriteria => "evaluation_criteria",
            SectionType::ScopeOfWork => "scope_of_work",
            SectionType::Other => "other",
        }
    }

    /// Parses the stored string form; unknown values degrade to `Other`.
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "requirement" => SectionType::Requirement,
            "specification" => SectionType::Specification,
            "condition" => SectionType::Condition,
            "evaluation_criteria" => SectionType::EvaluationCriteria,
            "scope_of_work" => SectionType::ScopeOfWork,
            _ => SectionType::Other,
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const HEADING_PREFIXES: [&str; 6] = ["SECTION", "Section", "PART", "Part", "CHAPTER", "Chapter"];

/// Decides whether a line of text is a section heading.
///
/// A trimmed line qualifies when it is non-empty, at most 100 characters,
/// and any of: entirely upper-case and longer than 5 characters; starts with
/// a SECTION/PART/CHAPTER prefix; ends with `:` and has at most 10 words.
pub fn is_heading(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || line.chars().count() > 100 {
        return false;
    }
    let has_letters = line.chars().any(|c| c.is_alphabetic());
    if has_letters && !line.chars().any(|c| c.is_lowercase()) && line.chars().count() > 5 {
        return true;
    }
    if HEADING_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return true;
    }
    line.ends_with(':') && line.split_whitespace().count() <= 10
}

/// Classifies a heading line into a [`SectionType`] plus its critical flag.
///
/// Case-insensitive keyword match, first hit wins, in fixed priority order:
/// requirement before specification before condition before evaluation
/// criteria before scope of work. Headings matching nothing fall back to
/// `Other` / non-critical.
pub fn classify_section(heading: &str) -> (SectionType, bool) {
    let lower = heading.to_lowercase();
    let matches_any = |keywords: &[&str]| keywords.iter().any(|kw| lower.contains(kw));

    let section_type = if matches_any(&["requirement", "shall", "must"]) {
        SectionType::Requirement
    } else if matches_any(&["specification", "spec", "technical spec"]) {
        SectionType::Specification
    } else if matches_any(&["condition", "terms", "clause"]) {
        SectionType::Condition
    } else if matches_any(&["evaluation", "criteria", "scoring"]) {
        SectionType::EvaluationCriteria
    } else if matches_any(&["scope", "statement of work", "sow"]) {
        SectionType::ScopeOfWork
    } else {
        SectionType::Other
    };
    (section_type, section_type.is_critical())
}
