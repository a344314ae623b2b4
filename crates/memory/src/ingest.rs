//! Document ingestion: load, split, embed, index.
//!
//! Runs once per store before the session starts. Plain text is split with
//! `TextSplitter`; `.md`/`.markdown` files use the Markdown-aware splitter so
//! chunks follow headings and paragraphs where possible. PDF text is
//! extracted with `pdf-extract` and then split like plain text.

use crate::store::{IndexEntry, VectorStore};
use async_trait::async_trait;
use ragway_core::document::{DocumentSource, Fragment};
use ragway_core::embedding::Embedder;
use ragway_core::error::{IngestError, ProviderError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use text_splitter::{ChunkConfig, MarkdownSplitter, TextSplitter};
use tracing::{debug, info};

/// Extensions collected when a source path is a directory.
const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "pdf"];

/// Formats that need a parser this crate does not ship.
const BINARY_EXTENSIONS: &[&str] = &["doc", "docx", "odt", "rtf", "epub"];

/// Reads text, markdown and PDF files from disk and splits them into
/// overlapping segments.
#[derive(Debug, Clone)]
pub struct FileSource {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FileSource {
    /// Fails if `chunk_overlap >= chunk_size` or `chunk_size == 0`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        let source = Self {
            chunk_size,
            chunk_overlap,
        };
        source.chunk_config()?;
        Ok(source)
    }

    fn chunk_config(&self) -> Result<ChunkConfig<text_splitter::Characters>, IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::Chunking("chunk size must be > 0".into()));
        }
        ChunkConfig::new(self.chunk_size)
            .with_overlap(self.chunk_overlap)
            .map_err(|e| IngestError::Chunking(e.to_string()))
    }

    /// Split `text` into non-blank segments, in document order.
    pub fn split(&self, text: &str, markdown: bool) -> Result<Vec<String>, IngestError> {
        let config = self.chunk_config()?;
        let chunks: Vec<String> = if markdown {
            MarkdownSplitter::new(config)
                .chunks(text)
                .filter(|c| !c.trim().is_empty())
                .map(str::to_string)
                .collect()
        } else {
            TextSplitter::new(config)
                .chunks(text)
                .filter(|c| !c.trim().is_empty())
                .map(str::to_string)
                .collect()
        };
        Ok(chunks)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn load_fragments(&self, origin_id: &str) -> Result<Vec<Fragment>, IngestError> {
        let path = PathBuf::from(origin_id);
        let ext = extension(&path);

        if let Some(ext) = ext.as_deref()
            && BINARY_EXTENSIONS.contains(&ext)
        {
            return Err(IngestError::Unsupported {
                path,
                reason: format!("'.{ext}' documents must be converted to text or markdown first"),
            });
        }

        let bytes = tokio::fs::read(&path).await.map_err(|e| IngestError::Read {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let text = if ext.as_deref() == Some("pdf") {
            extract_pdf(&path, bytes).await?
        } else {
            String::from_utf8(bytes).map_err(|_| IngestError::Unsupported {
                path: path.clone(),
                reason: "not valid UTF-8 text".into(),
            })?
        };

        let markdown = matches!(ext.as_deref(), Some("md" | "markdown"));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| origin_id.to_string());

        let fragments = self
            .split(&text, markdown)?
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                Fragment::new(chunk, origin_id)
                    .with_metadata("file_name", file_name.as_str())
                    .with_metadata("chunk_index", i)
            })
            .collect::<Vec<_>>();

        debug!(origin = origin_id, segments = fragments.len(), "Document split");
        Ok(fragments)
    }
}

/// PDF parsing is CPU-bound, so it runs on the blocking pool.
async fn extract_pdf(path: &Path, bytes: Vec<u8>) -> Result<String, IngestError> {
    let unsupported = |reason: String| IngestError::Unsupported {
        path: path.to_path_buf(),
        reason,
    };
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| unsupported(format!("PDF extraction aborted: {e}")))?
        .map_err(|e| unsupported(format!("could not extract PDF text: {e}")))
}

/// Expand a source path into the files to ingest.
///
/// A file is returned as-is. A directory yields its text, markdown and PDF
/// files (non-recursive), sorted by name so ingestion order is stable.
pub async fn collect_origins(path: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| IngestError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !metadata.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let read_err = |e: std::io::Error| IngestError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut dir = tokio::fs::read_dir(path).await.map_err(read_err)?;
    let mut files = Vec::new();
    while let Some(entry) = dir.next_entry().await.map_err(read_err)? {
        let file = entry.path();
        let is_document =
            extension(&file).is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e.as_str()));
        if is_document && entry.file_type().await.map_err(read_err)?.is_file() {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

/// Per-document line of an [`IngestReport`].
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub origin: String,
    pub segments: usize,
}

/// What one store build produced.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub store_id: String,
    pub documents: Vec<DocumentReport>,
    pub embeddings: usize,
    pub dimension: Option<usize>,
}

impl IngestReport {
    pub fn segments(&self) -> usize {
        self.documents.iter().map(|d| d.segments).sum()
    }
}

/// Build a fresh store from `origins`.
///
/// Every origin is loaded through `source`, all segments are embedded in one
/// batch, and the result is added to a new [`VectorStore`]. No origins, or
/// only empty documents, build an empty store.
pub async fn build_store(
    store_id: &str,
    origins: &[String],
    source: &dyn DocumentSource,
    embedder: &dyn Embedder,
) -> Result<(VectorStore, IngestReport), IngestError> {
    let mut fragments = Vec::new();
    let mut documents = Vec::with_capacity(origins.len());

    for origin in origins {
        let loaded = source.load_fragments(origin).await?;
        documents.push(DocumentReport {
            origin: origin.clone(),
            segments: loaded.len(),
        });
        fragments.extend(loaded);
    }

    let mut store = VectorStore::new(store_id);
    if !fragments.is_empty() {
        let texts: Vec<String> = fragments.iter().map(|f| f.text().to_string()).collect();
        let vectors = embedder.embed_all(&texts).await?;
        if vectors.len() != fragments.len() {
            return Err(ProviderError::EmbeddingCountMismatch {
                expected: fragments.len(),
                actual: vectors.len(),
            }
            .into());
        }

        let entries = vectors
            .into_iter()
            .zip(fragments)
            .map(|(embedding, fragment)| IndexEntry::new(embedding, fragment))
            .collect();
        store.add(entries)?;
    }

    let report = IngestReport {
        store_id: store_id.to_string(),
        documents,
        embeddings: store.len(),
        dimension: store.dimension(),
    };
    info!(
        store = store_id,
        documents = report.documents.len(),
        segments = report.segments(),
        embedder = embedder.name(),
        "Store built"
    );
    Ok((store, report))
}
