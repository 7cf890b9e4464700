//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Metadata filters are applied in SQL before scoring.

use super::{
    by_title, cosine_similarity, rank_catalog, rank_results, CatalogEntry, CatalogMatch,
    ChunkFilter, ChunkRecord, IndexedCourse, SearchResult, VectorStore,
};
use crate::chunking::CourseChunk;
use crate::course::Course;
use crate::error::{KursError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS courses (
        title TEXT PRIMARY KEY,
        course_json TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        course_title TEXT NOT NULL REFERENCES courses(title),
        lesson_number INTEGER,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_title, lesson_number);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| KursError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, entry, chunks), fields(title = %entry.course.title, chunks = chunks.len()))]
    async fn insert_course(&self, entry: &CatalogEntry, chunks: &[ChunkRecord]) -> Result<bool> {
        let course_json = serde_json::to_string(&entry.course)?;

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let inserted = tx.execute(
            r#"
            INSERT OR IGNORE INTO courses (title, course_json, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                entry.course.title,
                course_json,
                Self::embedding_to_bytes(&entry.embedding),
                entry.indexed_at.to_rfc3339(),
            ],
        )?;

        if inserted == 0 {
            debug!("Course already indexed, skipping");
            return Ok(false);
        }

        for record in chunks {
            tx.execute(
                r#"
                INSERT INTO chunks (id, course_title, lesson_number, chunk_index, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    record.id.to_string(),
                    record.chunk.course_title,
                    record.chunk.lesson_number,
                    record.chunk.chunk_index,
                    record.chunk.content,
                    Self::embedding_to_bytes(&record.embedding),
                ],
            )?;
        }

        tx.commit()?;
        info!("Inserted course with {} chunks", chunks.len());
        Ok(true)
    }

    #[instrument(skip(self, query_embedding))]
    async fn nearest_courses(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<CatalogMatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title, embedding FROM courses")?;

        let rows = stmt.query_map([], |row| {
            let title: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(1)?;
            Ok((title, embedding_bytes))
        })?;

        let mut matches = Vec::new();
        for row in rows {
            let (title, bytes) = row?;
            let score = cosine_similarity(query_embedding, &Self::bytes_to_embedding(&bytes));
            matches.push(CatalogMatch { title, score });
        }

        rank_catalog(&mut matches, limit);
        Ok(matches)
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT course_title, lesson_number, chunk_index, content, embedding
            FROM chunks
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            "#,
        )?;

        let rows = stmt.query_map(params![filter.course_title, filter.lesson_number], |row| {
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let chunk = CourseChunk {
                course_title: row.get(0)?,
                lesson_number: row.get(1)?,
                chunk_index: row.get(2)?,
                content: row.get(3)?,
            };
            Ok((chunk, embedding_bytes))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (chunk, bytes) = row?;
            let score = cosine_similarity(query_embedding, &Self::bytes_to_embedding(&bytes));
            results.push(SearchResult { chunk, score });
        }

        rank_results(&mut results, limit);
        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn list_courses(&self) -> Result<Vec<IndexedCourse>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT c.course_json, c.indexed_at, COUNT(k.id)
            FROM courses c
            LEFT JOIN chunks k ON k.course_title = c.title
            GROUP BY c.title
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let course_json: String = row.get(0)?;
            let indexed_at: String = row.get(1)?;
            let chunk_count: i64 = row.get(2)?;
            Ok((course_json, indexed_at, chunk_count))
        })?;

        let mut courses = Vec::new();
        for row in rows {
            let (course_json, indexed_at, chunk_count) = row?;
            let course: Course = serde_json::from_str(&course_json)?;
            courses.push(IndexedCourse {
                instructor: course.instructor,
                lesson_count: course.lessons.len(),
                title: course.title,
                chunk_count: chunk_count as usize,
                indexed_at: Self::parse_timestamp(&indexed_at),
            });
        }
        courses.sort_by(by_title);

        Ok(courses)
    }

    #[instrument(skip(self))]
    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let conn = self.lock()?;

        let course_json: Option<String> = conn
            .query_row(
                "SELECT course_json FROM courses WHERE title = ?1",
                params![title],
                |row| row.get(0),
            )
            .optional()?;

        match course_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn has_course(&self, title: &str) -> Result<bool> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM courses WHERE title = ?1",
            params![title],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM chunks", [])?;
        tx.execute("DELETE FROM courses", [])?;
        tx.commit()?;

        info!("Cleared vector store");
        Ok(())
    }
}
