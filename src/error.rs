//! Error types for Kurs.

use thiserror::Error;

/// Library-level error type for Kurs operations.
#[derive(Error, Debug)]
pub enum KursError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse course document: {0}")]
    Parse(String),

    #[error("No course found matching '{0}'")]
    Resolution(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Kurs operations.
pub type Result<T> = std::result::Result<T, KursError>;
