//! Transcript chunking for the content index.
//!
//! Lesson bodies are split into overlapping, sentence-aligned windows. Every
//! chunk is an exact slice of its lesson body, so removing the overlap between
//! consecutive chunks gives back the original text.

mod sentence;
mod window;

pub use sentence::split_sentences;
pub use window::{ChunkSpan, Chunks, SentenceChunker};

use crate::config::ChunkingSettings;
use crate::course::ParsedCourse;
use serde::{Deserialize, Serialize};

/// A chunk of transcript text tagged with its course and lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseChunk {
    /// Title of the owning course.
    pub course_title: String,
    /// Owning lesson, or `None` for course-level text.
    pub lesson_number: Option<u32>,
    /// Position of this chunk within the whole course, starting at 0.
    pub chunk_index: u32,
    /// Text content of this chunk.
    pub content: String,
}

impl CourseChunk {
    /// Human-readable label, e.g. "Intro to X – Lesson 1".
    pub fn label(&self) -> String {
        source_label(&self.course_title, self.lesson_number)
    }
}

/// Label a course/lesson pair the way sources are shown to users.
pub fn source_label(course_title: &str, lesson_number: Option<u32>) -> String {
    match lesson_number {
        Some(n) => format!("{} \u{2013} Lesson {}", course_title, n),
        None => course_title.to_string(),
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Maximum characters shared between consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 100,
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            overlap: settings.chunk_overlap,
        }
    }
}

/// Chunk every section of a parsed course.
///
/// Chunk indices run across the whole course in document order, so they are
/// assigned sequentially here rather than per lesson.
pub fn chunk_course(parsed: &ParsedCourse, config: &ChunkingConfig) -> Vec<CourseChunk> {
    let chunker = SentenceChunker::new(config.clone());
    let mut chunks = Vec::new();
    let mut index: u32 = 0;

    for section in &parsed.sections {
        for span in chunker.chunks(&section.body) {
            chunks.push(CourseChunk {
                course_title: parsed.course.title.clone(),
                lesson_number: section.lesson_number,
                chunk_index: index,
                content: span.text.to_string(),
            });
            index += 1;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::parse_course;

    #[test]
    fn test_single_lesson_single_chunk() {
        let parsed = parse_course(
            "Intro to X\n\nLesson 1: Basics\nSentence one. Sentence two. Sentence three.",
        )
        .unwrap();

        let chunks = chunk_course(&parsed, &ChunkingConfig::default());
        assert_eq!(
            chunks,
            vec![CourseChunk {
                course_title: "Intro to X".to_string(),
                lesson_number: Some(1),
                chunk_index: 0,
                content: "Sentence one. Sentence two. Sentence three.".to_string(),
            }]
        );
    }

    #[test]
    fn test_indices_run_across_lessons() {
        let parsed = parse_course(
            "Intro to X\nOverview text here.\n\nLesson 1: A\nAlpha one. Alpha two. Alpha three.\n\nLesson 2: B\nBeta one. Beta two.",
        )
        .unwrap();

        let config = ChunkingConfig {
            chunk_size: 24,
            overlap: 0,
        };
        let chunks = chunk_course(&parsed, &config);

        let indices: Vec<u32> = chunks.iter().map(|c| c.chunk_index).collect();
        let expected: Vec<u32> = (0..chunks.len() as u32).collect();
        assert_eq!(indices, expected);

        assert_eq!(chunks[0].lesson_number, None);
        assert!(chunks.iter().any(|c| c.lesson_number == Some(1)));
        assert_eq!(chunks.last().unwrap().lesson_number, Some(2));
    }

    #[test]
    fn test_source_label() {
        assert_eq!(source_label("Intro to X", Some(1)), "Intro to X \u{2013} Lesson 1");
        assert_eq!(source_label("Intro to X", None), "Intro to X");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = ChunkingSettings {
            chunk_size: 500,
            chunk_overlap: 50,
        };
        assert_eq!(
            ChunkingConfig::from(&settings),
            ChunkingConfig {
                chunk_size: 500,
                overlap: 50
            }
        );
    }
}
