//! Configuration module for Kurs.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, QueryPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, IngestSettings, PromptSettings,
    RagSettings, Settings, VectorStoreSettings,
};
