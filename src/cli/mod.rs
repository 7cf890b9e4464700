//! CLI module for Kurs.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Kurs - Course Transcript Q&A
///
/// Index course transcripts and ask questions about them, with answers that
/// cite the course and lesson they came from.
#[derive(Parser, Debug)]
#[command(name = "kurs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Filter level for the `kurs` target: `-v` flags win over the configured level.
    pub fn log_level(&self, configured: &str) -> String {
        match self.verbose {
            0 => configured.to_lowercase(),
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a folder of course documents
    Ingest {
        /// Folder containing course documents (defaults to ingest.docs_dir)
        dir: Option<String>,

        /// Wipe the index before ingesting
        #[arg(long)]
        clear: bool,
    },

    /// Ask a question about the indexed courses
    Ask {
        /// The question to ask
        question: String,
    },

    /// Start an interactive chat session (history lasts until exit)
    Chat,

    /// Search course content without generating an answer
    Search {
        /// Search query
        query: String,

        /// Restrict to a course (partial or approximate names work)
        #[arg(long)]
        course: Option<String>,

        /// Restrict to a lesson number
        #[arg(long)]
        lesson: Option<u32>,

        /// Maximum number of results (defaults to rag.max_results)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List indexed courses, or show one course's outline
    Courses {
        /// Course to show the outline for
        course: Option<String>,
    },

    /// Delete every indexed course
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_filters() {
        let cli = Cli::try_parse_from([
            "kurs", "search", "ownership", "--course", "rust", "--lesson", "2", "-l", "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Search {
                query,
                course,
                lesson,
                limit,
            } => {
                assert_eq!(query, "ownership");
                assert_eq!(course.as_deref(), Some("rust"));
                assert_eq!(lesson, Some(2));
                assert_eq!(limit, Some(3));
            }
            other => panic!("Expected Search, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from(["kurs", "ingest", "docs", "--clear", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Ingest { dir: Some(ref d), clear: true } if d == "docs"
        ));
    }

    #[test]
    fn test_log_level_prefers_flags_over_config() {
        let quiet = Cli::try_parse_from(["kurs", "courses"]).unwrap();
        assert_eq!(quiet.log_level("Error"), "error");

        let loud = Cli::try_parse_from(["kurs", "courses", "-vvv"]).unwrap();
        assert_eq!(loud.log_level("error"), "trace");
    }

    #[test]
    fn test_ask_takes_only_a_question() {
        let cli = Cli::try_parse_from(["kurs", "ask", "What is SQL?"]).unwrap();
        assert!(matches!(cli.command, Commands::Ask { ref question } if question == "What is SQL?"));
        assert!(Cli::try_parse_from(["kurs", "ask", "q", "--session", "abc"]).is_err());
    }

    #[test]
    fn test_lesson_must_be_a_number() {
        assert!(Cli::try_parse_from(["kurs", "search", "q", "--lesson", "one"]).is_err());
    }
}
