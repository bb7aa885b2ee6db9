//! Document file enumeration and parsing boundaries.
//!
//! Solicitation attachments are resolved per document id by a
//! [`DocumentFiles`] implementation and converted to plain text by a
//! [`FileParser`]. Production deployments plug in PDF/XLSX parsers here; the
//! crate ships a directory enumerator and a plain-text parser that cover
//! tests, demos, and `.txt` attachments.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::types::RagError;

/// One attachment of a document.
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Original filename, used for provenance and the exclusion filter.
    pub name: String,
    pub path: PathBuf,
}

/// Resolves the set of source files associated with a document.
#[async_trait]
pub trait DocumentFiles: Send + Sync {
    /// Files for `document_id`, in a stable order. A document with no files
    /// is not an error: return an empty list.
    async fn list(&self, document_id: &str) -> Result<Vec<SourceFile>, RagError>;
}

/// Converts one source file to plain text.
#[async_trait]
pub trait FileParser: Send + Sync {
    /// Full text of the file. Unreadable or unsupported input fails with
    /// [`RagError::Parse`], which aborts the document's ingestion.
    async fn parse(&self, file: &SourceFile) -> Result<String, RagError>;
}

/// Enumerates attachments from a fixed per-document download directory
/// (`<root>/<document_id>/`), sorted by filename.
#[derive(Clone, Debug)]
pub struct DirectoryFiles {
    root: PathBuf,
}

impl DirectoryFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DocumentFiles for DirectoryFiles {
    async fn list(&self, document_id: &str) -> Result<Vec<SourceFile>, RagError> {
        let dir = self.root.join(document_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = fs::read_dir(&dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push(SourceFile { name, path });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

/// Parses `.txt` attachments as UTF-8 (lossy). Anything else is a parse
/// failure; PDF and spreadsheet support belongs to an external parser.
#[derive(Clone, Debug, Default)]
pub struct PlainTextParser;

#[async_trait]
impl FileParser for PlainTextParser {
    async fn parse(&self, file: &SourceFile) -> Result<String, RagError> {
        let ext = file
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if ext != "txt" {
            return Err(RagError::Parse {
                file: file.name.clone(),
                message: format!("unsupported type: .{ext}"),
            });
        }
        let bytes = fs::read(&file.path).await.map_err(|err| RagError::Parse {
            file: file.name.clone(),
            message: err.to_string(),
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Normalizes a filename for use inside a chunk id: anything outside
/// `[A-Za-z0-9._-]` becomes `_`, truncated to `max_len` characters.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect()
}
