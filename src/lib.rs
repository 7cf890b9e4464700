//! Kurs - Course Transcript Q&A
//!
//! A local-first CLI tool for indexing course transcripts and asking questions
//! about them.
//!
//! # Overview
//!
//! Kurs allows you to:
//! - Parse plain-text course documents into courses, lessons and transcript text
//! - Index transcripts as overlapping, sentence-aligned chunks
//! - Resolve approximate course names against the course catalog
//! - Ask questions and get answers that cite course and lesson
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `course` - Course document parsing
//! - `chunking` - Sentence-aware transcript chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `index` - Catalog and content views over a vector store
//! - `tools` - Tools offered to the language model
//! - `rag` - Query orchestration, generation and session history
//! - `ingest` - Document and folder ingestion
//! - `system` - Top-level facade
//!
//! # Example
//!
//! ```rust,no_run
//! use kurs::config::Settings;
//! use kurs::system::RagSystem;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let system = RagSystem::new(settings)?;
//!
//!     let summary = system.add_course_folder(Path::new("docs"), false).await?;
//!     println!("Added {} courses", summary.added.len());
//!
//!     let response = system.answer("What does lesson 1 of Intro to X cover?", None).await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod course;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod openai;
pub mod rag;
pub mod system;
pub mod tools;
pub mod vector_store;

pub use error::{KursError, Result};
pub use system::{QueryResponse, RagSystem};
