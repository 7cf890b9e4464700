//! CLI output formatting utilities.

use crate::tools::Source;
use crate::vector_store::IndexedCourse;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one line of the course list.
    pub fn course_info(course: &IndexedCourse) {
        let instructor = course
            .instructor
            .as_deref()
            .map(|i| format!(", {}", i))
            .unwrap_or_default();
        println!(
            "  {} {} ({} lessons, {} chunks{})",
            style("*").cyan(),
            style(&course.title).bold(),
            course.lesson_count,
            course.chunk_count,
            style(instructor).dim()
        );
    }

    /// Print search result.
    pub fn search_result(label: &str, score: f32, content: &str) {
        println!(
            "\n{} {} (score: {:.2})",
            style(">>").green(),
            style(label).bold(),
            score
        );
        println!("   {}", content_preview(content, 200));
    }

    /// Print the sources behind an answer.
    pub fn sources(sources: &[Source]) {
        if sources.is_empty() {
            return;
        }

        Output::header("Sources");
        for source in sources {
            match &source.link {
                Some(link) => println!(
                    "  {} {} {}",
                    style("*").cyan(),
                    source.label,
                    style(link).dim()
                ),
                None => Output::list_item(&source.label),
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis, on a character boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content,
    }
}
