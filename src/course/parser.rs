//! Course document parser.
//!
//! Expected layout:
//!
//! ```text
//! Course Title: Intro to X
//! Course Link: https://example.com/x
//! Course Instructor: Ada Lovelace
//!
//! Lesson 0: Welcome
//! Lesson Link: https://example.com/x/0
//! Transcript text...
//!
//! Lesson 1: Basics
//! More transcript text...
//! ```
//!
//! Only the title line is mandatory. Header labels are optional and matched
//! case-insensitively.

use super::{Course, Lesson, ParsedCourse, Section};
use crate::error::{KursError, Result};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^course(?:\s+title)?\s*:\s*(.*)$").expect("Invalid regex"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:course\s+)?link\s*:\s*(.*)$").expect("Invalid regex"))
}

fn instructor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:course\s+)?instructor\s*:\s*(.*)$").expect("Invalid regex"))
}

fn lesson_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^lesson\s+(\d[^\s:]*)\s*:\s*(.*)$").expect("Invalid regex"))
}

fn lesson_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^lesson\s+link\s*:\s*(.*)$").expect("Invalid regex"))
}

/// Where subsequent body lines go.
enum Target {
    Course,
    Lesson(u32),
    Discard,
}

/// Parse a raw course document into course metadata and chunkable sections.
///
/// Fails with [`KursError::Parse`] when the document has no title line, or has
/// a title but neither lessons nor any body text. Malformed or duplicate lesson
/// headers are skipped with a warning and their body is dropped.
pub fn parse_course(text: &str) -> Result<ParsedCourse> {
    let mut lines = text.lines().map(str::trim).skip_while(|l| l.is_empty());

    let first = lines
        .next()
        .ok_or_else(|| KursError::Parse("document is empty".to_string()))?;

    let title = match title_re().captures(first) {
        Some(caps) => caps[1].trim().to_string(),
        None => first.to_string(),
    };
    if title.is_empty() {
        return Err(KursError::Parse("missing course title".to_string()));
    }

    let mut course = Course::new(title);
    let mut overview: Vec<&str> = Vec::new();
    let mut lesson_bodies: Vec<(u32, Vec<&str>)> = Vec::new();
    let mut target = Target::Course;
    let mut in_header = true;
    let mut expect_lesson_link = false;

    for line in lines {
        if let Some(caps) = lesson_re().captures(line) {
            in_header = false;
            expect_lesson_link = false;

            let raw_number = &caps[1];
            let lesson_title = caps[2].trim().to_string();

            match raw_number.parse::<u32>() {
                Ok(number) if course.lesson(number).is_some() => {
                    warn!(
                        "Skipping duplicate lesson {} in course '{}'",
                        number, course.title
                    );
                    target = Target::Discard;
                }
                Ok(number) => {
                    course.lessons.push(Lesson {
                        number,
                        title: lesson_title,
                        link: None,
                    });
                    lesson_bodies.push((number, Vec::new()));
                    target = Target::Lesson(number);
                    expect_lesson_link = true;
                }
                Err(_) => {
                    warn!(
                        "Skipping malformed lesson header '{}' in course '{}'",
                        line, course.title
                    );
                    target = Target::Discard;
                }
            }
            continue;
        }

        if expect_lesson_link {
            if line.is_empty() {
                continue;
            }
            expect_lesson_link = false;
            if let Some(caps) = lesson_link_re().captures(line) {
                if let (Target::Lesson(number), Some(lesson)) = (&target, course.lessons.last_mut())
                {
                    debug_assert_eq!(lesson.number, *number);
                    lesson.link = non_empty(&caps[1]);
                }
                continue;
            }
        }

        if in_header {
            if let Some(caps) = link_re().captures(line) {
                course.link = non_empty(&caps[1]);
                continue;
            }
            if let Some(caps) = instructor_re().captures(line) {
                course.instructor = non_empty(&caps[1]);
                continue;
            }
        }

        if line.is_empty() {
            continue;
        }

        match target {
            Target::Course => overview.push(line),
            Target::Lesson(_) => {
                if let Some((_, body)) = lesson_bodies.last_mut() {
                    body.push(line);
                }
            }
            Target::Discard => {}
        }
    }

    let mut sections = Vec::new();

    let overview = normalize(&overview);
    if !overview.is_empty() {
        sections.push(Section {
            lesson_number: None,
            body: overview,
        });
    }

    for (number, body) in lesson_bodies {
        let body = normalize(&body);
        if !body.is_empty() {
            sections.push(Section {
                lesson_number: Some(number),
                body,
            });
        }
    }

    if course.lessons.is_empty() && sections.is_empty() {
        return Err(KursError::Parse(format!(
            "course '{}' has no lessons or content",
            course.title
        )));
    }

    debug!(
        "Parsed course '{}' with {} lessons and {} sections",
        course.title,
        course.lessons.len(),
        sections.len()
    );

    Ok(ParsedCourse { course, sections })
}

/// Collapse body lines into a single whitespace-normalized string.
fn normalize(lines: &[&str]) -> String {
    lines
        .iter()
        .flat_map(|l| l.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Course Title: Advanced Retrieval for AI
Course Link: https://example.com/course
Course Instructor: John Doe

Lesson 0: Introduction
Lesson Link: https://example.com/lesson0
Welcome to the course.
We will cover retrieval.

Lesson 1: Embeddings
Embeddings map text to vectors.
";

    #[test]
    fn test_parse_full_header() {
        let parsed = parse_course(SAMPLE).unwrap();
        let course = &parsed.course;

        assert_eq!(course.title, "Advanced Retrieval for AI");
        assert_eq!(course.link.as_deref(), Some("https://example.com/course"));
        assert_eq!(course.instructor.as_deref(), Some("John Doe"));
        assert_eq!(course.lessons.len(), 2);
        assert_eq!(course.lessons[0].number, 0);
        assert_eq!(course.lessons[0].title, "Introduction");
        assert_eq!(
            course.lessons[0].link.as_deref(),
            Some("https://example.com/lesson0")
        );
        assert_eq!(course.lessons[1].link, None);
    }

    #[test]
    fn test_parse_sections() {
        let parsed = parse_course(SAMPLE).unwrap();

        assert_eq!(
            parsed.sections,
            vec![
                Section {
                    lesson_number: Some(0),
                    body: "Welcome to the course. We will cover retrieval.".to_string(),
                },
                Section {
                    lesson_number: Some(1),
                    body: "Embeddings map text to vectors.".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_plain_first_line_is_title() {
        let parsed = parse_course(
            "Intro to X\nInstructor: Ada\n\nLesson 1: Basics\nSentence one. Sentence two. Sentence three.",
        )
        .unwrap();

        assert_eq!(parsed.course.title, "Intro to X");
        assert_eq!(parsed.course.instructor.as_deref(), Some("Ada"));
        assert_eq!(parsed.sections.len(), 1);
        assert_eq!(parsed.sections[0].lesson_number, Some(1));
        assert_eq!(
            parsed.sections[0].body,
            "Sentence one. Sentence two. Sentence three."
        );
    }

    #[test]
    fn test_short_course_prefix_is_stripped() {
        let parsed = parse_course("Course: Python Basics\n\nLesson 1: Variables\nText.").unwrap();
        assert_eq!(parsed.course.title, "Python Basics");
    }

    #[test]
    fn test_overview_text_before_first_lesson() {
        let parsed = parse_course(
            "Intro to X\nThis course is about X.\n\nLesson 1: Basics\nBasics here.",
        )
        .unwrap();

        assert_eq!(parsed.sections[0].lesson_number, None);
        assert_eq!(parsed.sections[0].body, "This course is about X.");
        assert_eq!(parsed.sections[1].lesson_number, Some(1));
    }

    #[test]
    fn test_malformed_lesson_is_skipped() {
        let parsed = parse_course(
            "Intro to X\n\nLesson 1: Basics\nGood.\n\nLesson 2b: Broken\nLost text.\n\nLesson 3: Later\nStill here.",
        )
        .unwrap();

        let numbers: Vec<u32> = parsed.course.lessons.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert!(parsed.sections.iter().all(|s| !s.body.contains("Lost")));
        assert_eq!(parsed.sections.last().unwrap().body, "Still here.");
    }

    #[test]
    fn test_duplicate_lesson_is_skipped() {
        let parsed =
            parse_course("Intro to X\n\nLesson 1: A\nFirst.\n\nLesson 1: B\nSecond.").unwrap();

        assert_eq!(parsed.course.lessons.len(), 1);
        assert_eq!(parsed.course.lessons[0].title, "A");
        assert_eq!(parsed.sections.len(), 1);
        assert_eq!(parsed.sections[0].body, "First.");
    }

    #[test]
    fn test_lesson_word_in_body_is_not_a_marker() {
        let parsed =
            parse_course("Intro to X\n\nLesson 1: Basics\nLesson learned: keep going.").unwrap();
        assert_eq!(parsed.course.lessons.len(), 1);
        assert_eq!(parsed.sections[0].body, "Lesson learned: keep going.");
    }

    #[test]
    fn test_empty_document_fails() {
        assert!(matches!(parse_course(""), Err(KursError::Parse(_))));
        assert!(matches!(parse_course("  \n\n "), Err(KursError::Parse(_))));
    }

    #[test]
    fn test_title_only_document_fails() {
        assert!(matches!(
            parse_course("This is not a proper course format"),
            Err(KursError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_title_label_fails() {
        assert!(matches!(
            parse_course("Course Title:   \nLesson 1: A\nText."),
            Err(KursError::Parse(_))
        ));
    }
}
