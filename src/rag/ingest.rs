//! Documentation ingestion: files → sections → chunks → vectors → index.
//!
//! Per-item failures (unreadable file, untokenizable section, failed embedding,
//! failed batch) are logged, counted in the [`IngestReport`] and skipped.
//! Only a collection that cannot be provisioned aborts the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::db::vectorstore::{upsert_in_batches, VectorIndex};
use crate::types::{
    AppError, Chunk, ChunkPayload, Distance, Document, EmbeddingRecord, Result,
};

use super::chunker::TextChunker;
use super::embeddings::Embedder;
use super::markdown::{split_sections, strip_front_matter};

pub const DEFAULT_SOURCE: &str = "book";
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Documents found under a root directory.
#[derive(Debug, Default)]
pub struct DocumentScan {
    /// Sorted by relative path.
    pub documents: Vec<Document>,
    /// Matching files that could not be read as UTF-8 text.
    pub skipped: Vec<PathBuf>,
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Recursively collect files under `root` whose extension is in `extensions`.
pub async fn discover_documents(root: &Path, extensions: &[String]) -> Result<DocumentScan> {
    if !root.is_dir() {
        return Err(AppError::InvalidInput(format!(
            "documentation root '{}' is not a directory",
            root.display()
        )));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            paths.push(entry.into_path());
        }
    }

    let mut scan = DocumentScan::default();
    for path in paths {
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                scan.skipped.push(path);
                continue;
            }
        };

        let chapter = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        scan.documents.push(Document {
            chapter,
            path: relative,
            body,
        });
    }

    Ok(scan)
}

/// Deterministic record id, so re-ingesting the same tree overwrites.
pub fn record_id(source: &str, path: &Path, section_index: usize, chunk_index: usize) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    let name = format!("{}/{}#{}:{}", source, path, section_index, chunk_index);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents_read: usize,
    pub documents_skipped: usize,
    pub sections: usize,
    pub chunks: usize,
    pub chunking_failures: usize,
    pub embedding_failures: usize,
    pub records_written: usize,
    pub failed_batches: usize,
}

impl IngestReport {
    /// True when nothing was skipped or lost.
    pub fn is_clean(&self) -> bool {
        self.documents_skipped == 0
            && self.chunking_failures == 0
            && self.embedding_failures == 0
            && self.failed_batches == 0
    }
}

pub struct IngestionPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    collection: String,
    source: String,
    distance: Distance,
    batch_size: usize,
    extensions: Vec<String>,
}

impl IngestionPipeline {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            collection: collection.into(),
            source: DEFAULT_SOURCE.to_string(),
            distance: Distance::Cosine,
            batch_size: DEFAULT_BATCH_SIZE,
            extensions: vec!["md".to_string(), "mdx".to_string()],
        }
    }

    /// Label stored in every payload's `source` field.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Split a document into token-bounded chunks.
    pub fn chunk_document(&self, document: &Document, report: &mut IngestReport) -> Vec<Chunk> {
        let sections = split_sections(strip_front_matter(&document.body));
        report.sections += sections.len();

        let mut chunks = Vec::new();
        for (section_index, section) in sections.iter().enumerate() {
            let chunked = self
                .chunker
                .chunk_section(&document.chapter, section_index, section);

            for error in &chunked.errors {
                tracing::warn!(
                    path = %document.path.display(),
                    section = %section.title,
                    error = %error,
                    "Skipping section text the tokenizer could not map"
                );
            }
            report.chunking_failures += chunked.errors.len();
            chunks.extend(chunked.chunks);
        }

        report.chunks += chunks.len();
        chunks
    }

    /// Embed chunks one at a time, skipping those the embedder rejects.
    async fn embed_chunks(
        &self,
        document: &Document,
        chunks: Vec<Chunk>,
        report: &mut IngestReport,
        records: &mut Vec<EmbeddingRecord>,
    ) {
        for chunk in chunks {
            let vector = match self.embedder.embed(&chunk.text).await {
                Ok(vector) => vector,
                Err(e) => {
                    tracing::warn!(
                        path = %document.path.display(),
                        section = %chunk.section,
                        chunk = chunk.chunk_index,
                        error = %e,
                        "Skipping chunk that failed to embed"
                    );
                    report.embedding_failures += 1;
                    continue;
                }
            };

            records.push(EmbeddingRecord {
                id: record_id(
                    &self.source,
                    &document.path,
                    chunk.section_index,
                    chunk.chunk_index,
                ),
                vector,
                payload: ChunkPayload {
                    source: self.source.clone(),
                    chapter: chunk.chapter,
                    section: chunk.section,
                    text: chunk.text,
                },
            });
        }
    }

    /// Ingest every matching document under `root`.
    ///
    /// # Errors
    ///
    /// Fails before writing anything when `root` is not a directory or the
    /// collection cannot be provisioned with the embedder's dimensionality.
    pub async fn run(&self, root: &Path) -> Result<IngestReport> {
        let scan = discover_documents(root, &self.extensions).await?;
        let mut report = IngestReport {
            documents_read: scan.documents.len(),
            documents_skipped: scan.skipped.len(),
            ..Default::default()
        };

        tracing::info!(
            root = %root.display(),
            documents = report.documents_read,
            skipped = report.documents_skipped,
            "Discovered documents"
        );

        self.index
            .ensure_collection(&self.collection, self.embedder.dimensions(), self.distance)
            .await?;

        let mut records = Vec::new();
        for document in &scan.documents {
            tracing::debug!(path = %document.path.display(), "Processing document");
            let chunks = self.chunk_document(document, &mut report);
            self.embed_chunks(document, chunks, &mut report, &mut records)
                .await;
        }

        let upsert = upsert_in_batches(
            self.index.as_ref(),
            &self.collection,
            &records,
            self.batch_size,
        )
        .await;
        report.records_written = upsert.written;
        report.failed_batches = upsert.failures.len();

        tracing::info!(
            collection = %self.collection,
            index = self.index.provider_name(),
            chunks = report.chunks,
            written = report.records_written,
            embedding_failures = report.embedding_failures,
            failed_batches = report.failed_batches,
            "Ingestion finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn extensions() -> Vec<String> {
        vec!["md".to_string(), "mdx".to_string()]
    }

    #[tokio::test]
    async fn test_discover_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("guide/advanced")).unwrap();
        fs::write(dir.path().join("b.md"), "# B").unwrap();
        fs::write(dir.path().join("a.mdx"), "# A").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("guide/advanced/deep.MD"), "# Deep").unwrap();

        let scan = discover_documents(dir.path(), &extensions()).await.unwrap();

        let paths: Vec<String> = scan
            .documents
            .iter()
            .map(|d| d.path.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(paths, vec!["a.mdx", "b.md", "guide/advanced/deep.MD"]);
        assert_eq!(scan.documents[2].chapter, "deep");
        assert!(scan.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_discover_skips_non_utf8() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("good.md"), "fine").unwrap();
        fs::write(dir.path().join("bad.md"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let scan = discover_documents(dir.path(), &extensions()).await.unwrap();

        assert_eq!(scan.documents.len(), 1);
        assert_eq!(scan.documents[0].chapter, "good");
        assert_eq!(scan.skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_discover_missing_root() {
        let dir = TempDir::new().unwrap();
        let result = discover_documents(&dir.path().join("nope"), &extensions()).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_record_id_is_deterministic() {
        let path = Path::new("guide/intro.md");
        let a = record_id("book", path, 1, 0);

        assert_eq!(a, record_id("book", path, 1, 0));
        assert_ne!(a, record_id("book", path, 1, 1));
        assert_ne!(a, record_id("book", path, 2, 0));
        assert_ne!(a, record_id("other", path, 1, 0));
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_report_is_clean() {
        let mut report = IngestReport::default();
        assert!(report.is_clean());
        report.embedding_failures = 1;
        assert!(!report.is_clean());
    }
}
