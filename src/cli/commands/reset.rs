//! Reset command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::system::RagSystem;
use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Run the reset command.
pub async fn run_reset(yes: bool, settings: Settings) -> Result<()> {
    let system = RagSystem::new(settings)?;
    let catalog = system.catalog_summary().await?;

    if catalog.total_courses == 0 {
        Output::info("Index is already empty.");
        return Ok(());
    }

    if !yes {
        Output::warning(&format!(
            "This deletes {} indexed courses.",
            catalog.total_courses
        ));
        print!("Continue? [y/N] ");
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            Output::info("Aborted.");
            return Ok(());
        }
    }

    system.reset().await?;
    Output::success(&format!("Removed {} courses.", catalog.total_courses));
    Ok(())
}
