//! Search command implementation.

use super::ensure_ready;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::system::RagSystem;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    course: Option<String>,
    lesson: Option<u32>,
    limit: Option<usize>,
    settings: Settings,
) -> Result<()> {
    ensure_ready(Operation::Search)?;

    let system = RagSystem::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let results = system
        .search(query, course.as_deref(), lesson, limit)
        .await;
    spinner.finish_and_clear();

    match results {
        Ok(results) => {
            if results.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", results.len()));
                for result in &results {
                    Output::search_result(&result.chunk.label(), result.score, &result.chunk.content);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
