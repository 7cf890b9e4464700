//! Course and lesson metadata.
//!
//! A course document is a plain-text transcript with a small header block
//! followed by `Lesson N: <title>` sections. See [`parse_course`].

mod parser;

pub use parser::parse_course;

use serde::{Deserialize, Serialize};

/// A single lesson within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number, unique within its course.
    pub number: u32,
    /// Lesson title.
    pub title: String,
    /// Link to the lesson video or page.
    pub link: Option<String>,
}

/// A course and its lesson outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Course title. Used as the external key for the course.
    pub title: String,
    /// Course instructor.
    pub instructor: Option<String>,
    /// Link to the course page.
    pub link: Option<String>,
    /// Lessons in document order.
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Create a course with no lessons.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            instructor: None,
            link: None,
            lessons: Vec::new(),
        }
    }

    /// Look up a lesson by number.
    pub fn lesson(&self, number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.number == number)
    }

    /// Text embedded into the catalog view: title, instructor and lesson titles.
    pub fn catalog_text(&self) -> String {
        let mut text = self.title.clone();
        if let Some(instructor) = &self.instructor {
            text.push_str("\nInstructor: ");
            text.push_str(instructor);
        }
        for lesson in &self.lessons {
            text.push_str(&format!("\nLesson {}: {}", lesson.number, lesson.title));
        }
        text
    }
}

/// Body text belonging to one lesson, or to the course itself when
/// `lesson_number` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub lesson_number: Option<u32>,
    pub body: String,
}

/// Output of the course parser: the course metadata plus the text to chunk.
#[derive(Debug, Clone)]
pub struct ParsedCourse {
    pub course: Course,
    /// Sections in document order. Course-level text, if any, comes first.
    pub sections: Vec<Section>,
}
