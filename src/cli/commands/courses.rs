//! Courses command implementation.

use super::ensure_ready;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::system::RagSystem;
use anyhow::Result;

/// Run the courses command.
pub async fn run_courses(course: Option<String>, settings: Settings) -> Result<()> {
    if course.is_some() {
        // Approximate names are resolved through the embedder.
        ensure_ready(Operation::Search)?;
    } else {
        ensure_ready(Operation::Browse)?;
    }

    let system = RagSystem::new(settings)?;

    if let Some(name) = course {
        let outline = match system.course_outline(&name).await {
            Ok(outline) => outline,
            Err(e) => {
                Output::error(&format!("{}", e));
                return Err(e.into());
            }
        };

        Output::header(&outline.title);
        if let Some(instructor) = &outline.instructor {
            Output::kv("Instructor", instructor);
        }
        if let Some(link) = &outline.link {
            Output::kv("Link", link);
        }
        println!();
        for lesson in &outline.lessons {
            Output::list_item(&format!("Lesson {}: {}", lesson.number, lesson.title));
        }
        return Ok(());
    }

    let courses = system.list_courses().await?;
    if courses.is_empty() {
        Output::info("No courses indexed yet. Use 'kurs ingest <dir>' to add some.");
        return Ok(());
    }

    Output::header(&format!("Indexed Courses ({})", courses.len()));
    println!();
    for course in &courses {
        Output::course_info(course);
    }

    let total_chunks: usize = courses.iter().map(|c| c.chunk_count).sum();
    println!();
    Output::kv("Total courses", &courses.len().to_string());
    Output::kv("Total chunks", &total_chunks.to_string());

    Ok(())
}
