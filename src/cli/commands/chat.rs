//! Interactive chat command.
//!
//! Each line is answered through the same query path as `kurs ask`, within
//! one session, so earlier exchanges feed into later prompts.

use super::ensure_ready;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::system::RagSystem;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> Result<()> {
    ensure_ready(Operation::Ask)?;

    let system = RagSystem::new(settings)?;
    let mut session = system.sessions().get_or_create(None);

    println!("\n{}", style("Kurs Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            system.sessions().clear(&session);
            session = system.sessions().get_or_create(None);
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = system.answer(input, Some(&session)).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                println!("\n{} {}", style("Kurs:").cyan().bold(), response.answer);
                Output::sources(&response.sources);
                println!();
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
