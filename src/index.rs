//! Dual-view semantic index over course material.
//!
//! The catalog view resolves *which* course a user means; the content view
//! answers *what* a course says. Both share one [`Embedder`].

use crate::chunking::CourseChunk;
use crate::course::Course;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{
    CatalogEntry, ChunkFilter, ChunkRecord, IndexedCourse, SearchResult, VectorStore,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default similarity floor for catalog nearest-neighbour resolution.
pub const DEFAULT_COURSE_MATCH_THRESHOLD: f32 = 0.35;

/// Shortest name, in letters and digits, accepted for a partial title match.
const MIN_PARTIAL_MATCH_CHARS: usize = 3;

/// Read-only view of what the catalog holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Semantic index built on a [`VectorStore`] backend.
#[derive(Clone)]
pub struct SemanticIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
    course_match_threshold: f32,
}

impl SemanticIndex {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            max_results: 5,
            course_match_threshold: DEFAULT_COURSE_MATCH_THRESHOLD,
        }
    }

    /// Default number of hits returned by [`SemanticIndex::search`].
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_course_match_threshold(mut self, threshold: f32) -> Self {
        self.course_match_threshold = threshold;
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn course_match_threshold(&self) -> f32 {
        self.course_match_threshold
    }

    /// Add a course and its chunks to both views.
    ///
    /// Returns `false` without embedding anything when the title is already
    /// indexed.
    #[instrument(skip(self, course, chunks), fields(title = %course.title))]
    pub async fn add_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<bool> {
        if self.store.has_course(&course.title).await? {
            debug!("Course already indexed");
            return Ok(false);
        }

        let catalog_embedding = self.embedder.embed(&course.catalog_text()).await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let records: Vec<ChunkRecord> = chunks
            .iter()
            .cloned()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkRecord::new(chunk, embedding))
            .collect();

        let entry = CatalogEntry::new(course.clone(), catalog_embedding);

        // A concurrent ingest of the same title loses here.
        let inserted = self.store.insert_course(&entry, &records).await?;
        if inserted {
            info!("Indexed course with {} chunks", records.len());
        }
        Ok(inserted)
    }

    /// Resolve a user-supplied course name to a canonical title.
    ///
    /// Tries a case-insensitive exact match, then a unique title containing
    /// the name as whole words, then the nearest catalog entry. `None` means
    /// no course scored at or above the similarity floor.
    #[instrument(skip(self))]
    pub async fn resolve_course(&self, name: &str) -> Result<Option<String>> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let titles: Vec<String> = self
            .store
            .list_courses()
            .await?
            .into_iter()
            .map(|c| c.title)
            .collect();

        if titles.is_empty() {
            return Ok(None);
        }

        if let Some(title) = titles.iter().find(|t| t.to_lowercase() == needle) {
            return Ok(Some(title.clone()));
        }

        let needle_words = words(&needle);
        if needle_words.concat().chars().count() >= MIN_PARTIAL_MATCH_CHARS {
            let mut containing = titles
                .iter()
                .filter(|t| contains_words(&words(t), &needle_words));
            if let (Some(title), None) = (containing.next(), containing.next()) {
                debug!(resolved = %title, "Resolved course by partial title");
                return Ok(Some(title.clone()));
            }
        }

        let embedding = self.embedder.embed(name).await?;
        let best = self.store.nearest_courses(&embedding, 1).await?;

        match best.into_iter().next() {
            Some(m) if m.score >= self.course_match_threshold => {
                debug!(resolved = %m.title, score = m.score, "Resolved course by similarity");
                Ok(Some(m.title))
            }
            Some(m) => {
                debug!(closest = %m.title, score = m.score, "No course above threshold");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Search the content view.
    ///
    /// `course_title` must already be canonical; see
    /// [`SemanticIndex::resolve_course`]. `limit` defaults to `max_results`.
    #[instrument(skip(self, query))]
    pub async fn search(
        &self,
        query: &str,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let limit = limit.unwrap_or(self.max_results);
        if limit == 0 || self.store.chunk_count().await? == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        let filter = ChunkFilter {
            course_title: course_title.map(str::to_string),
            lesson_number,
        };

        let results = self.store.search_chunks(&embedding, &filter, limit).await?;
        debug!("Search returned {} results", results.len());
        Ok(results)
    }

    /// Course metadata by exact title.
    pub async fn course_outline(&self, title: &str) -> Result<Option<Course>> {
        self.store.get_course(title).await
    }

    /// Link for a lesson, if the course and lesson exist and carry one.
    pub async fn lesson_link(&self, title: &str, lesson_number: u32) -> Result<Option<String>> {
        Ok(self
            .store
            .get_course(title)
            .await?
            .and_then(|c| c.lesson(lesson_number).and_then(|l| l.link.clone())))
    }

    /// Link for a course page.
    pub async fn course_link(&self, title: &str) -> Result<Option<String>> {
        Ok(self.store.get_course(title).await?.and_then(|c| c.link))
    }

    pub async fn list_courses(&self) -> Result<Vec<IndexedCourse>> {
        self.store.list_courses().await
    }

    pub async fn catalog_summary(&self) -> Result<CatalogSummary> {
        let course_titles: Vec<String> = self
            .store
            .list_courses()
            .await?
            .into_iter()
            .map(|c| c.title)
            .collect();

        Ok(CatalogSummary {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    /// Wipe both views.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether `needle` occurs as a run of consecutive words in `haystack`.
fn contains_words(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}
