//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod courses;
mod ingest;
mod reset;
mod search;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use courses::run_courses;
pub use ingest::run_ingest;
pub use reset::run_reset;
pub use search::run_search;

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;

/// Run pre-flight checks, printing the failure before returning it.
fn ensure_ready(operation: Operation) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(operation) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }
    Ok(())
}
