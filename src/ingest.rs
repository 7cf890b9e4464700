//! Course document ingestion.
//!
//! Coordinates parsing, chunking, embedding and indexing of course documents.

use crate::chunking::{chunk_course, ChunkingConfig};
use crate::course::parse_course;
use crate::error::{KursError, Result};
use crate::index::SemanticIndex;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The course was new and is now indexed.
    Added { title: String, chunks: usize },
    /// A course with this title was already indexed.
    Skipped { title: String },
}

impl IngestOutcome {
    pub fn title(&self) -> &str {
        match self {
            IngestOutcome::Added { title, .. } | IngestOutcome::Skipped { title } => title,
        }
    }
}

/// A document that could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Totals for a folder ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Titles of newly indexed courses, sorted.
    pub added: Vec<String>,
    /// Titles that were already indexed, sorted.
    pub skipped: Vec<String>,
    /// Documents that failed to parse or index, sorted by path.
    pub failed: Vec<IngestFailure>,
    /// Chunks created for the added courses.
    pub chunks_added: usize,
}

/// Ingests course documents into a [`SemanticIndex`].
#[derive(Clone)]
pub struct Ingestor {
    index: SemanticIndex,
    chunking: ChunkingConfig,
    extensions: Vec<String>,
    max_concurrent: usize,
}

impl Ingestor {
    pub fn new(index: SemanticIndex, chunking: ChunkingConfig) -> Self {
        Self {
            index,
            chunking,
            extensions: vec!["txt".to_string()],
            max_concurrent: 4,
        }
    }

    /// File extensions picked up by folder ingestion, without the dot.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Parse, chunk and index one document's text.
    #[instrument(skip_all)]
    pub async fn add_course_text(&self, text: &str) -> Result<IngestOutcome> {
        let parsed = parse_course(text)?;
        let title = parsed.course.title.clone();

        let chunks = chunk_course(&parsed, &self.chunking);
        let chunk_count = chunks.len();

        if self.index.add_course(&parsed.course, &chunks).await? {
            info!("Added course '{}' ({} chunks)", title, chunk_count);
            Ok(IngestOutcome::Added {
                title,
                chunks: chunk_count,
            })
        } else {
            info!("Course '{}' already indexed, skipping", title);
            Ok(IngestOutcome::Skipped { title })
        }
    }

    /// Ingest one document from disk.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn add_course_document(&self, path: &Path) -> Result<IngestOutcome> {
        let text = tokio::fs::read_to_string(path).await?;
        self.add_course_text(&text).await
    }

    /// Ingest every matching document in `dir`.
    ///
    /// Documents are processed concurrently. A document that fails is logged
    /// and recorded; it never stops the others. With `clear_existing` the
    /// whole index is wiped first.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn add_course_folder(&self, dir: &Path, clear_existing: bool) -> Result<IngestSummary> {
        if !dir.is_dir() {
            return Err(KursError::InvalidInput(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }

        if clear_existing {
            info!("Clearing existing index");
            self.index.clear().await?;
        }

        let paths = self.collect_documents(dir)?;
        info!("Found {} documents", paths.len());

        let results: Vec<(PathBuf, Result<IngestOutcome>)> = stream::iter(paths)
            .map(|path| async move {
                let result = self.add_course_document(&path).await;
                (path, result)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut summary = IngestSummary::default();
        for (path, result) in results {
            match result {
                Ok(IngestOutcome::Added { title, chunks }) => {
                    summary.added.push(title);
                    summary.chunks_added += chunks;
                }
                Ok(IngestOutcome::Skipped { title }) => summary.skipped.push(title),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    summary.failed.push(IngestFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        summary.added.sort();
        summary.skipped.sort();
        summary.failed.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            "Ingestion finished: {} added, {} skipped, {} failed",
            summary.added.len(),
            summary.skipped.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    fn collect_documents(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| {
                    self.extensions
                        .iter()
                        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
                });
            if matches {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}
