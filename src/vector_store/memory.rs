//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    by_title, cosine_similarity, rank_catalog, rank_results, CatalogEntry, CatalogMatch,
    ChunkFilter, ChunkRecord, IndexedCourse, SearchResult, VectorStore,
};
use crate::course::Course;
use crate::error::{KursError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    courses: HashMap<String, CatalogEntry>,
    chunks: Vec<ChunkRecord>,
}

/// In-memory vector store.
pub struct MemoryVectorStore {
    inner: RwLock<Inner>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| KursError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| KursError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn insert_course(&self, entry: &CatalogEntry, chunks: &[ChunkRecord]) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.courses.contains_key(&entry.course.title) {
            return Ok(false);
        }

        inner
            .courses
            .insert(entry.course.title.clone(), entry.clone());
        inner.chunks.extend_from_slice(chunks);
        Ok(true)
    }

    async fn nearest_courses(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<CatalogMatch>> {
        let inner = self.read()?;

        let mut matches: Vec<CatalogMatch> = inner
            .courses
            .values()
            .map(|entry| CatalogMatch {
                title: entry.course.title.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        rank_catalog(&mut matches, limit);
        Ok(matches)
    }

    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let inner = self.read()?;

        let mut results: Vec<SearchResult> = inner
            .chunks
            .iter()
            .filter(|record| filter.matches(&record.chunk))
            .map(|record| SearchResult {
                chunk: record.chunk.clone(),
                score: cosine_similarity(query_embedding, &record.embedding),
            })
            .collect();

        rank_results(&mut results, limit);
        Ok(results)
    }

    async fn list_courses(&self) -> Result<Vec<IndexedCourse>> {
        let inner = self.read()?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in &inner.chunks {
            *counts.entry(record.chunk.course_title.as_str()).or_default() += 1;
        }

        let mut courses: Vec<IndexedCourse> = inner
            .courses
            .values()
            .map(|entry| IndexedCourse {
                title: entry.course.title.clone(),
                instructor: entry.course.instructor.clone(),
                lesson_count: entry.course.lessons.len(),
                chunk_count: counts
                    .get(entry.course.title.as_str())
                    .copied()
                    .unwrap_or(0),
                indexed_at: entry.indexed_at,
            })
            .collect();
        courses.sort_by(by_title);

        Ok(courses)
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let inner = self.read()?;
        Ok(inner.courses.get(title).map(|entry| entry.course.clone()))
    }

    async fn has_course(&self, title: &str) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.courses.contains_key(title))
    }

    async fn chunk_count(&self) -> Result<usize> {
        let inner = self.read()?;
        Ok(inner.chunks.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.write()?;
        inner.courses.clear();
        inner.chunks.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::exercise_store;
    use super::*;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();
        exercise_store(&store).await;
    }
}
