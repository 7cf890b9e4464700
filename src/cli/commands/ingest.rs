//! Ingest command implementation.

use super::ensure_ready;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::system::RagSystem;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(dir: Option<String>, clear: bool, settings: Settings) -> Result<()> {
    ensure_ready(Operation::Ingest)?;

    let dir = match dir {
        Some(d) => Settings::expand_path(&d),
        None => settings.docs_dir(),
    };

    let system = RagSystem::new(settings)?;

    let spinner = Output::spinner(&format!("Ingesting {}...", dir.display()));
    let result = system.add_course_folder(&dir, clear).await;
    spinner.finish_and_clear();

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    };

    if clear {
        Output::info("Cleared existing index.");
    }

    for title in &summary.added {
        Output::list_item(&format!("Added {}", title));
    }
    for title in &summary.skipped {
        Output::list_item(&format!("Skipped {} (already indexed)", title));
    }
    for failure in &summary.failed {
        Output::warning(&format!("{}: {}", failure.path.display(), failure.error));
    }

    Output::success(&format!(
        "{} courses added ({} chunks), {} skipped, {} failed",
        summary.added.len(),
        summary.chunks_added,
        summary.skipped.len(),
        summary.failed.len()
    ));

    let catalog = system.catalog_summary().await?;
    Output::kv("Total courses", &catalog.total_courses.to_string());

    Ok(())
}
