//! Vector store abstraction for Kurs.
//!
//! A store holds two views: the catalog view (one embedded entry per course)
//! and the content view (one embedded record per chunk). Backends implement
//! [`VectorStore`]; both shipped backends score with [`cosine_similarity`] and
//! order hits with [`rank_results`].

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::CourseChunk;
use crate::course::Course;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Catalog view entry: a course and the embedding of its identity text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Course metadata, including the lesson outline.
    pub course: Course,
    /// Embedding of [`Course::catalog_text`].
    pub embedding: Vec<f32>,
    /// When the course was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn new(course: Course, embedding: Vec<f32>) -> Self {
        Self {
            course,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// Content view record: a chunk and its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique record ID.
    pub id: Uuid,
    /// The chunk.
    pub chunk: CourseChunk,
    /// Embedding of the chunk content.
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    pub fn new(chunk: CourseChunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chunk,
            embedding,
        }
    }
}

/// A content search hit with score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: CourseChunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// A catalog search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogMatch {
    /// Canonical course title.
    pub title: String,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Metadata filter for content searches. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkFilter {
    /// Exact course title.
    pub course_title: Option<String>,
    /// Exact lesson number.
    pub lesson_number: Option<u32>,
}

impl ChunkFilter {
    pub fn matches(&self, chunk: &CourseChunk) -> bool {
        self.course_title
            .as_deref()
            .map_or(true, |title| chunk.course_title == title)
            && self
                .lesson_number
                .map_or(true, |n| chunk.lesson_number == Some(n))
    }
}

/// Summary information about an indexed course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedCourse {
    /// Course title.
    pub title: String,
    /// Course instructor.
    pub instructor: Option<String>,
    /// Number of lessons in the outline.
    pub lesson_count: usize,
    /// Number of indexed chunks.
    pub chunk_count: usize,
    /// When the course was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert a course's catalog entry together with its chunk records.
    ///
    /// All-or-nothing. Returns `false` and writes nothing when a course with
    /// the same title is already stored.
    async fn insert_course(&self, entry: &CatalogEntry, chunks: &[ChunkRecord]) -> Result<bool>;

    /// Nearest catalog entries to the given embedding, best first.
    async fn nearest_courses(&self, query_embedding: &[f32], limit: usize)
        -> Result<Vec<CatalogMatch>>;

    /// Nearest chunks matching `filter`, ordered by [`rank_results`].
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<SearchResult>>;

    /// List all indexed courses, ordered by title.
    async fn list_courses(&self) -> Result<Vec<IndexedCourse>>;

    /// Get a course's metadata by exact title.
    async fn get_course(&self, title: &str) -> Result<Option<Course>>;

    /// Check if a course title is indexed.
    async fn has_course(&self, title: &str) -> Result<bool>;

    /// Get total chunk count.
    async fn chunk_count(&self) -> Result<usize>;

    /// Remove every course and chunk.
    async fn clear(&self) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort hits by descending score, then ascending chunk index, and keep the
/// first `limit`.
///
/// The course title is the last key so that ordering is total even when two
/// courses share a chunk index and a score.
pub fn rank_results(results: &mut Vec<SearchResult>, limit: usize) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
            .then_with(|| a.chunk.course_title.cmp(&b.chunk.course_title))
    });
    results.truncate(limit);
}

/// Sort catalog hits best first and keep the first `limit`.
pub(crate) fn rank_catalog(matches: &mut Vec<CatalogMatch>, limit: usize) {
    matches.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.title.cmp(&b.title))
    });
    matches.truncate(limit);
}

/// Compare by title, for listing.
pub(crate) fn by_title(a: &IndexedCourse, b: &IndexedCourse) -> Ordering {
    a.title.cmp(&b.title)
}
