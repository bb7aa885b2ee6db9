//! End-to-end ingestion and retrieval over a real SQLite store and the
//! deterministic mock vector backend.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tendersmith::ingestion::{DirectoryFiles, IngestionPipeline, PlainTextParser};
use tendersmith::retrieval::Retriever;
use tendersmith::stores::{ChunkStore, SqliteChunkStore};
use tendersmith::vector::{MockVectorBackend, VectorBackend, VectorDocument, VectorMatch};
use tendersmith::{RagError, SectionType};
use tracing_subscriber::EnvFilter;

/// Route pipeline tracing through the test writer; `RUST_LOG` adjusts the
/// filter.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}

/// A paragraph of roughly `words` words built from `sentence`.
fn prose(sentence: &str, words: usize) -> String {
    std::iter::repeat(sentence)
        .flat_map(|s| s.split_whitespace())
        .take(words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The three-section solicitation from the retrieval scenario: a scope
/// section that fits one chunk, a requirements section that splits in two,
/// and a tab-delimited pricing table.
fn solicitation_text() -> String {
    let scope = prose(
        "the contractor will coordinate facility maintenance phases with the agency program office",
        330,
    );
    let requirements_a = prose(
        "the contractor shall maintain cybersecurity incident reporting procedures for every system",
        350,
    );
    let requirements_b = prose(
        "all deliverables must pass government acceptance testing before invoicing is permitted",
        350,
    );
    format!(
        "SCOPE OF WORK\n{scope}\n\nRequirements:\n{requirements_a}\n\n{requirements_b}\n\n\
         PRICING SCHEDULE\nCLIN 0001\tWidget assembly\t$100.00\nCLIN 0002\tOn-site support\t$200.00\nCLIN 0003\tSpare parts kit\t$50.00\n"
    )
}

struct Harness {
    store: Arc<SqliteChunkStore>,
    backend: Arc<MockVectorBackend>,
    pipeline: IngestionPipeline,
    retriever: Retriever,
}

async fn harness(downloads: &Path) -> Harness {
    init_tracing();
    let store = Arc::new(SqliteChunkStore::open_in_memory().await.unwrap());
    let backend = Arc::new(MockVectorBackend::new());
    let pipeline = IngestionPipeline::builder()
        .store(store.clone())
        .vector_backend(backend.clone())
        .document_files(Arc::new(DirectoryFiles::new(downloads)))
        .parser(Arc::new(PlainTextParser))
        .build();
    let retriever = Retriever::new(store.clone(), backend.clone());
    Harness {
        store,
        backend,
        pipeline,
        retriever,
    }
}

fn write_doc(downloads: &Path, document_id: &str, files: &[(&str, &str)]) {
    let dir = downloads.join(document_id);
    std::fs::create_dir_all(&dir).unwrap();
    for (name, content) in files {
        std::fs::write(dir.join(name), content).unwrap();
    }
}

#[tokio::test]
async fn end_to_end_scenario() {
    let downloads = tempfile::tempdir().unwrap();
    write_doc(
        downloads.path(),
        "N1",
        &[("solicitation.txt", &solicitation_text())],
    );
    let h = harness(downloads.path()).await;

    let indexed = h.pipeline.ingest("N1").await.unwrap();
    assert_eq!(indexed, 3, "the pricing table must not be indexed");

    let chunks = h.store.chunks_for_document("N1").await.unwrap();
    assert_eq!(chunks.len(), 4);

    let scope: Vec<_> = chunks
        .iter()
        .filter(|c| c.section_type == SectionType::ScopeOfWork)
        .collect();
    assert_eq!(scope.len(), 1);
    assert!(scope[0].is_critical);
    assert!(!scope[0].requirement_flag);

    let requirements: Vec<_> = chunks
        .iter()
        .filter(|c| c.section_type == SectionType::Requirement)
        .collect();
    assert_eq!(requirements.len(), 2, "oversized section splits in two");
    for chunk in &requirements {
        assert!(chunk.is_critical);
        assert!(chunk.requirement_flag);
        assert_eq!(chunk.section_name, "Requirements:");
    }

    let tables: Vec<_> = chunks.iter().filter(|c| c.is_table).collect();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].section_name, "PRICING SCHEDULE");
    assert!(
        !h.backend.ids().contains(&tables[0].chunk_id),
        "table chunks are stored but never upserted"
    );
    assert_eq!(h.backend.len(), 3);
}

#[tokio::test]
async fn chunk_ids_and_indices_are_unique_across_files() {
    let downloads = tempfile::tempdir().unwrap();
    let section = |heading: &str, sentence: &str| {
        format!("{heading}\n{}", prose(sentence, 60))
    };
    write_doc(
        downloads.path(),
        "N2",
        &[
            (
                "a_statement.txt",
                &format!(
                    "{}\n\n{}",
                    section("SCOPE OF WORK", "phase one covers site preparation and surveys"),
                    section("DELIVERY TERMS", "items arrive at the loading dock weekly"),
                ),
            ),
            (
                "b_background.txt",
                &section("AGENCY BACKGROUND", "the agency manages regional infrastructure"),
            ),
        ],
    );
    let h = harness(downloads.path()).await;
    h.pipeline.ingest("N2").await.unwrap();

    let mut chunks = h.store.chunks_for_document("N2").await.unwrap();
    chunks.sort_by_key(|c| c.chunk_index);
    assert_eq!(chunks.len(), 3);
    let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indices, vec![0, 1, 2], "ordinal threads across files");
    // The id ordinal is the same running counter.
    assert!(chunks[2].chunk_id.ends_with("_2"));
    assert_eq!(chunks[2].source_filename, "b_background.txt");
}

#[tokio::test]
async fn ingest_is_idempotent() {
    let downloads = tempfile::tempdir().unwrap();
    write_doc(
        downloads.path(),
        "N1",
        &[("solicitation.txt", &solicitation_text())],
    );
    let h = harness(downloads.path()).await;

    let first = h.pipeline.ingest("N1").await.unwrap();
    let rows = h.store.count().await.unwrap();
    let second = h.pipeline.ingest("N1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.store.count().await.unwrap(), rows, "no new chunk rows");
    assert_eq!(h.store.max_amendment("N1").await.unwrap(), Some(0));
}

#[tokio::test]
async fn reingest_supersedes_previous_amendment() {
    let downloads = tempfile::tempdir().unwrap();
    write_doc(
        downloads.path(),
        "N1",
        &[("solicitation.txt", &solicitation_text())],
    );
    let h = harness(downloads.path()).await;
    h.pipeline.ingest("N1").await.unwrap();

    // Amendment replaces the file set under a new name.
    std::fs::remove_file(downloads.path().join("N1/solicitation.txt")).unwrap();
    write_doc(
        downloads.path(),
        "N1",
        &[(
            "amendment_01.txt",
            &format!(
                "SCOPE OF WORK\n{}",
                prose("the revised scope adds quarterly cybersecurity incident reporting", 80)
            ),
        )],
    );
    h.pipeline.reingest("N1").await.unwrap();

    let chunks = h.store.chunks_for_document("N1").await.unwrap();
    let latest: Vec<_> = chunks.iter().filter(|c| c.is_latest_version).collect();
    assert!(!latest.is_empty());
    assert!(
        latest.iter().all(|c| c.amendment_number == 1),
        "exactly one amendment is current"
    );
    assert!(chunks
        .iter()
        .filter(|c| c.amendment_number == 0)
        .all(|c| !c.is_latest_version));
}

#[tokio::test]
async fn retrieval_excludes_superseded_chunks() {
    let downloads = tempfile::tempdir().unwrap();
    write_doc(
        downloads.path(),
        "N1",
        &[("solicitation.txt", &solicitation_text())],
    );
    let h = harness(downloads.path()).await;
    h.pipeline.ingest("N1").await.unwrap();

    std::fs::remove_file(downloads.path().join("N1/solicitation.txt")).unwrap();
    write_doc(
        downloads.path(),
        "N1",
        &[(
            "amendment_01.txt",
            "SCOPE OF WORK\nthe revised scope covers landscaping only",
        )],
    );
    h.pipeline.reingest("N1").await.unwrap();

    // The old vector entries are still in the index under the old chunk ids.
    assert!(h.backend.len() > 1);

    let results = h
        .retriever
        .retrieve("cybersecurity incident reporting procedures", 5, Some("N1"))
        .await
        .unwrap();
    for chunk in &results {
        assert_eq!(chunk.source_filename, "amendment_01.txt");
    }
}

#[tokio::test]
async fn retrieval_filters_by_document() {
    let downloads = tempfile::tempdir().unwrap();
    write_doc(
        downloads.path(),
        "A",
        &[(
            "scope.txt",
            "SCOPE OF WORK\nthe contractor paints every bridge in the district",
        )],
    );
    write_doc(
        downloads.path(),
        "B",
        &[(
            "scope.txt",
            "SCOPE OF WORK\nthe contractor paints every school in the district",
        )],
    );
    let h = harness(downloads.path()).await;
    h.pipeline.ingest("A").await.unwrap();
    h.pipeline.ingest("B").await.unwrap();

    let results = h
        .retriever
        .retrieve("contractor paints district", 5, Some("A"))
        .await
        .unwrap();
    assert!(!results.is_empty());
    for chunk in &results {
        assert_eq!(chunk.document_id, "A");
    }

    let unfiltered = h
        .retriever
        .retrieve("contractor paints district", 5, None)
        .await
        .unwrap();
    assert!(unfiltered.iter().any(|c| c.document_id == "B"));
}

#[tokio::test]
async fn retrieval_hydrates_from_store_and_preserves_order() {
    let downloads = tempfile::tempdir().unwrap();
    write_doc(
        downloads.path(),
        "N1",
        &[("solicitation.txt", &solicitation_text())],
    );
    let h = harness(downloads.path()).await;
    h.pipeline.ingest("N1").await.unwrap();

    let results = h
        .retriever
        .retrieve("cybersecurity incident reporting", 2, Some("N1"))
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= 2);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score, "backend order is preserved");
    }
    let top = &results[0];
    assert!(top.text.contains("cybersecurity"));
    assert_eq!(top.section_type, SectionType::Requirement);
    assert!(top.requirement_flag);
}

#[tokio::test]
async fn retrieval_of_unknown_document_is_empty() {
    let downloads = tempfile::tempdir().unwrap();
    let h = harness(downloads.path()).await;
    let results = h.retriever.retrieve("anything", 5, Some("ghost")).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn document_without_files_ingests_zero() {
    let downloads = tempfile::tempdir().unwrap();
    let h = harness(downloads.path()).await;
    assert_eq!(h.pipeline.ingest("missing").await.unwrap(), 0);
    assert_eq!(h.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn excluded_and_unsupported_files_are_skipped() {
    let downloads = tempfile::tempdir().unwrap();
    write_doc(
        downloads.path(),
        "N1",
        &[
            (
                "scope.txt",
                "SCOPE OF WORK\nthe contractor maintains the motor pool",
            ),
            ("Pricing Template.txt", "SCOPE OF WORK\nblank form text"),
            ("notes.docx", "unsupported format"),
        ],
    );
    let h = harness(downloads.path()).await;
    h.pipeline.ingest("N1").await.unwrap();

    let chunks = h.store.chunks_for_document("N1").await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].source_filename, "scope.txt");
}

#[tokio::test]
async fn parse_failure_aborts_without_partial_commit() {
    let downloads = tempfile::tempdir().unwrap();
    write_doc(
        downloads.path(),
        "N1",
        &[
            (
                "a_scope.txt",
                "SCOPE OF WORK\nthe contractor maintains the motor pool",
            ),
            // Supported extension, but the plain-text parser cannot read it.
            ("b_drawings.pdf", "%PDF-1.4 binary"),
        ],
    );
    let h = harness(downloads.path()).await;

    let err = h.pipeline.ingest("N1").await.unwrap_err();
    assert!(matches!(err, RagError::Parse { .. }));
    assert_eq!(h.store.count().await.unwrap(), 0, "no partial index");
    assert!(h.backend.is_empty());
}

/// A backend whose index is unreachable.
struct OfflineVectorBackend;

#[async_trait]
impl VectorBackend for OfflineVectorBackend {
    async fn upsert(&self, _documents: Vec<VectorDocument>) -> Result<(), RagError> {
        Err(RagError::VectorBackend("index offline".into()))
    }

    async fn query(&self, _text: &str, _top_k: usize) -> Result<Vec<VectorMatch>, RagError> {
        Err(RagError::VectorBackend("index offline".into()))
    }
}

#[tokio::test]
async fn vector_failure_leaves_ingest_retryable() {
    init_tracing();
    let downloads = tempfile::tempdir().unwrap();
    write_doc(
        downloads.path(),
        "N1",
        &[("solicitation.txt", &solicitation_text())],
    );
    let store = Arc::new(SqliteChunkStore::open_in_memory().await.unwrap());
    let build = |backend: Arc<dyn VectorBackend>| {
        IngestionPipeline::builder()
            .store(store.clone())
            .vector_backend(backend)
            .document_files(Arc::new(DirectoryFiles::new(downloads.path())))
            .parser(Arc::new(PlainTextParser))
            .build()
    };

    let err = build(Arc::new(OfflineVectorBackend))
        .ingest("N1")
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::VectorBackend(_)));
    assert_eq!(
        store.count().await.unwrap(),
        0,
        "the amendment pointer must not move on a failed upsert"
    );
    assert_eq!(store.max_amendment("N1").await.unwrap(), None);

    // The same entry point recovers once the backend is back.
    let backend = Arc::new(MockVectorBackend::new());
    let indexed = build(backend.clone()).ingest("N1").await.unwrap();
    assert_eq!(indexed, 3, "retry runs a fresh ingestion, not the short-circuit");
    assert_eq!(backend.len(), 3);
    assert_eq!(store.chunks_for_document("N1").await.unwrap().len(), 4);
}
