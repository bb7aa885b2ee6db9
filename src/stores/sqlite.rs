//! SQLite-backed chunk store.

use std::path::Path;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, OptionalExtension};

use crate::chunking::SectionType;
use crate::types::RagError;

use super::{ChunkRecord, ChunkStore};

const SELECT_COLUMNS: &str = "c.chunk_id, c.document_id, c.source_filename, c.text, \
     c.section_name, c.section_type, c.is_critical, c.requirement_flag, \
     c.is_table, c.chunk_index, c.amendment_number";

/// Chunk store over a SQLite database file (or `:memory:`).
///
/// The schema keeps one `documents` row per document holding the
/// current-amendment pointer; a chunk's `is_latest_version` is derived by
/// comparing its `amendment_number` against that pointer, so superseding a
/// document is a single-row update committed together with the new
/// amendment's chunks.
#[derive(Clone)]
pub struct SqliteChunkStore {
    conn: Connection,
}

impl SqliteChunkStore {
    /// Opens (and migrates) a store at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::migrate(&conn).await?;
        Ok(Self { conn })
    }

    /// Opens an in-memory store, useful for tests.
    pub async fn open_in_memory() -> Result<Self, RagError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::migrate(&conn).await?;
        Ok(Self { conn })
    }

    async fn migrate(conn: &Connection) -> Result<(), RagError> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS documents (
                     document_id TEXT PRIMARY KEY,
                     current_amendment INTEGER NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS chunks (
                     chunk_id TEXT PRIMARY KEY,
                     document_id TEXT NOT NULL,
                     source_filename TEXT NOT NULL,
                     text TEXT NOT NULL,
                     section_name TEXT NOT NULL,
                     section_type TEXT NOT NULL,
                     is_critical INTEGER NOT NULL,
                     requirement_flag INTEGER NOT NULL,
                     is_table INTEGER NOT NULL,
                     chunk_index INTEGER NOT NULL,
                     amendment_number INTEGER NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_chunks_document
                     ON chunks(document_id, amendment_number);",
            )
            .map_err(tokio_rusqlite::Error::Rusqlite)?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))
    }
}

// Shared column mapping for the SELECT_COLUMNS projection. Kept as a macro
// because the row mapper's error type is rusqlite's, which tokio-rusqlite
// shadows rather than re-exporting by name.
macro_rules! record_from_row {
    ($row:expr, $is_latest:expr) => {
        ChunkRecord {
            chunk_id: $row.get(0)?,
            document_id: $row.get(1)?,
            source_filename: $row.get(2)?,
            text: $row.get(3)?,
            section_name: $row.get(4)?,
            section_type: SectionType::from_str_lossy(&$row.get::<_, String>(5)?),
            is_critical: $row.get::<_, i64>(6)? != 0,
            requirement_flag: $row.get::<_, i64>(7)? != 0,
            is_table: $row.get::<_, i64>(8)? != 0,
            chunk_index: $row.get::<_, i64>(9)? as usize,
            amendment_number: $row.get::<_, i64>(10)? as u32,
            is_latest_version: $is_latest,
        }
    };
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn latest_chunk_count(&self, document_id: &str) -> Result<usize, RagError> {
        let document_id = document_id.to_string();
        self.conn
            .call(move |conn| {
                let count: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM chunks c
                         JOIN documents d ON d.document_id = c.document_id
                            AND d.current_amendment = c.amendment_number
                         WHERE c.document_id = ?",
                        [&document_id],
                        |row| row.get(0),
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn latest_indexed_count(&self, document_id: &str) -> Result<usize, RagError> {
        let document_id = document_id.to_string();
        self.conn
            .call(move |conn| {
                let count: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM chunks c
                         JOIN documents d ON d.document_id = c.document_id
                            AND d.current_amendment = c.amendment_number
                         WHERE c.document_id = ? AND c.is_table = 0",
                        [&document_id],
                        |row| row.get(0),
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn max_amendment(&self, document_id: &str) -> Result<Option<u32>, RagError> {
        let document_id = document_id.to_string();
        self.conn
            .call(move |conn| {
                let max: Option<i64> = conn
                    .query_row(
                        "SELECT MAX(amendment_number) FROM chunks WHERE document_id = ?",
                        [&document_id],
                        |row| row.get(0),
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(max.map(|value| value as u32))
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn commit_amendment(
        &self,
        document_id: &str,
        amendment: u32,
        chunks: Vec<ChunkRecord>,
    ) -> Result<(), RagError> {
        let document_id = document_id.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                {
                    let mut stmt = tx
                        .prepare(
                            "INSERT OR REPLACE INTO chunks (
                                 chunk_id, document_id, source_filename, text,
                                 section_name, section_type, is_critical,
                                 requirement_flag, is_table, chunk_index,
                                 amendment_number
                             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                        )
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    for chunk in &chunks {
                        stmt.execute((
                            &chunk.chunk_id,
                            &chunk.document_id,
                            &chunk.source_filename,
                            &chunk.text,
                            &chunk.section_name,
                            chunk.section_type.as_str(),
                            chunk.is_critical as i64,
                            chunk.requirement_flag as i64,
                            chunk.is_table as i64,
                            chunk.chunk_index as i64,
                            i64::from(chunk.amendment_number),
                        ))
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    }
                }
                tx.execute(
                    "INSERT INTO documents (document_id, current_amendment)
                     VALUES (?, ?)
                     ON CONFLICT(document_id)
                     DO UPDATE SET current_amendment = excluded.current_amendment",
                    (&document_id, i64::from(amendment)),
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn get_latest_chunk(&self, chunk_id: &str) -> Result<Option<ChunkRecord>, RagError> {
        let chunk_id = chunk_id.to_string();
        self.conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM chunks c
                     JOIN documents d ON d.document_id = c.document_id
                        AND d.current_amendment = c.amendment_number
                     WHERE c.chunk_id = ?"
                );
                let mut stmt = conn.prepare(&sql).map_err(tokio_rusqlite::Error::Rusqlite)?;
                let record = stmt
                    .query_row([&chunk_id], |row| Ok(record_from_row!(row, true)))
                    .optional()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(record)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<ChunkRecord>, RagError> {
        let document_id = document_id.to_string();
        self.conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS},
                            (c.amendment_number = COALESCE(d.current_amendment, -1))
                     FROM chunks c
                     LEFT JOIN documents d ON d.document_id = c.document_id
                     WHERE c.document_id = ?
                     ORDER BY c.amendment_number, c.chunk_index"
                );
                let mut stmt = conn.prepare(&sql).map_err(tokio_rusqlite::Error::Rusqlite)?;
                let rows = stmt
                    .query_map([&document_id], |row| {
                        let is_latest = row.get::<_, i64>(11)? != 0;
                        Ok(record_from_row!(row, is_latest))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut records = Vec::new();
                for row in rows {
                    records.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(records)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(chunk_id: &str, document_id: &str, amendment: u32, index: usize) -> ChunkRecord {
        ChunkRecord {
            chunk_id: chunk_id.to_string(),
            document_id: document_id.to_string(),
            source_filename: "solicitation.txt".to_string(),
            text: format!("chunk {index} text"),
            section_name: "SCOPE OF WORK".to_string(),
            section_type: SectionType::ScopeOfWork,
            is_critical: true,
            requirement_flag: false,
            is_table: false,
            chunk_index: index,
            amendment_number: amendment,
            is_latest_version: false,
        }
    }

    #[tokio::test]
    async fn commit_and_lookup_roundtrip() {
        let store = SqliteChunkStore::open_in_memory().await.unwrap();
        store
            .commit_amendment("D1", 0, vec![record("D1_f_0", "D1", 0, 0)])
            .await
            .unwrap();

        let found = store.get_latest_chunk("D1_f_0").await.unwrap().unwrap();
        assert_eq!(found.document_id, "D1");
        assert_eq!(found.section_type, SectionType::ScopeOfWork);
        assert!(found.is_latest_version);
        assert_eq!(store.latest_chunk_count("D1").await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn new_amendment_supersedes_previous() {
        let store = SqliteChunkStore::open_in_memory().await.unwrap();
        store
            .commit_amendment(
                "D1",
                0,
                vec![record("D1_f_0", "D1", 0, 0), record("D1_f_1", "D1", 0, 1)],
            )
            .await
            .unwrap();
        store
            .commit_amendment("D1", 1, vec![record("D1_g_0", "D1", 1, 0)])
            .await
            .unwrap();

        // Old chunks remain stored but are no longer latest.
        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(store.latest_chunk_count("D1").await.unwrap(), 1);
        assert!(store.get_latest_chunk("D1_f_0").await.unwrap().is_none());
        assert!(store.get_latest_chunk("D1_g_0").await.unwrap().is_some());

        let all = store.chunks_for_document("D1").await.unwrap();
        assert_eq!(all.len(), 3);
        let latest: Vec<_> = all.iter().filter(|c| c.is_latest_version).collect();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].amendment_number, 1);
    }

    #[tokio::test]
    async fn max_amendment_tracks_history() {
        let store = SqliteChunkStore::open_in_memory().await.unwrap();
        assert_eq!(store.max_amendment("D1").await.unwrap(), None);

        store
            .commit_amendment("D1", 0, vec![record("D1_f_0", "D1", 0, 0)])
            .await
            .unwrap();
        assert_eq!(store.max_amendment("D1").await.unwrap(), Some(0));

        store
            .commit_amendment("D1", 1, vec![record("D1_f_0v1", "D1", 1, 0)])
            .await
            .unwrap();
        assert_eq!(store.max_amendment("D1").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn upsert_replaces_by_chunk_id() {
        let store = SqliteChunkStore::open_in_memory().await.unwrap();
        let mut first = record("D1_f_0", "D1", 0, 0);
        first.text = "original".to_string();
        store.commit_amendment("D1", 0, vec![first]).await.unwrap();

        let mut replacement = record("D1_f_0", "D1", 0, 0);
        replacement.text = "revised".to_string();
        store
            .commit_amendment("D1", 0, vec![replacement])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let found = store.get_latest_chunk("D1_f_0").await.unwrap().unwrap();
        assert_eq!(found.text, "revised");
    }
}
