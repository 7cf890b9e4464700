//! Ask command implementation.

use super::ensure_ready;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::system::RagSystem;
use anyhow::Result;

/// Run the ask command. Each invocation is a fresh conversation.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    ensure_ready(Operation::Ask)?;

    let system = RagSystem::new(settings)?;

    let spinner = Output::spinner("Thinking...");
    let result = system.answer(question, None).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", response.answer);
            Output::sources(&response.sources);
        }
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
