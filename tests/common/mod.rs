//! Shared test doubles and fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use kurs::config::{Prompts, Settings};
use kurs::embedding::Embedder;
use kurs::rag::{Generation, GenerationRequest, Generator, ToolInvocation};
use kurs::vector_store::{MemoryVectorStore, VectorStore};
use kurs::{KursError, RagSystem, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const INTRO_TO_X: &str = "\
Course Title: Intro to X
Course Link: https://example.com/intro-to-x
Course Instructor: Ada Lovelace

Lesson 1: Basics
Lesson Link: https://example.com/intro-to-x/1
Sentence one. Sentence two. Sentence three.
";

pub const SQL_COURSE: &str = "\
Course Title: SQL Fundamentals
Course Instructor: Edgar Codd

Lesson 1: Select
Select statements read rows from tables.

Lesson 2: Joins
Joins combine rows from two tables.
";

/// Maps text onto fixed axes by keyword, so similarities are predictable.
///
/// Records every text it embeds.
#[derive(Default)]
pub struct KeywordEmbedder {
    seen: Mutex<Vec<String>>,
}

impl KeywordEmbedder {
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        if lower.contains("intro to x") || lower.contains("into x") {
            vec![1.0, 0.0, 0.0, 0.0]
        } else if lower.contains("nonexistent") {
            vec![0.0, 1.0, 0.0, 0.0]
        } else if lower.contains("sql") {
            vec![0.0, 0.0, 1.0, 0.0]
        } else {
            vec![0.0, 0.0, 0.0, 1.0]
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.seen.lock().unwrap().push(text.to_string());
        if text.contains("slow") {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.seen.lock().unwrap().extend(texts.iter().cloned());
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        4
    }
}

/// Replays queued generations and records every request.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<Generation>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn push(&self, generation: Result<Generation>) {
        self.script.lock().unwrap().push_back(generation);
    }

    pub fn push_text(&self, text: &str) {
        self.push(Ok(Generation::Text(text.to_string())));
    }

    pub fn push_calls(&self, calls: Vec<ToolInvocation>) {
        self.push(Ok(Generation::ToolCalls(calls)));
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(KursError::Generation("script exhausted".to_string())))
    }
}

pub fn search_call(id: &str, arguments: serde_json::Value) -> ToolInvocation {
    ToolInvocation {
        id: id.to_string(),
        name: "search_course_content".to_string(),
        arguments: arguments.to_string(),
    }
}

pub struct Harness {
    pub system: RagSystem,
    pub store: Arc<MemoryVectorStore>,
    pub embedder: Arc<KeywordEmbedder>,
    pub generator: Arc<ScriptedGenerator>,
}

pub fn harness() -> Harness {
    harness_with(Settings::default())
}

pub fn harness_with(settings: Settings) -> Harness {
    let store = Arc::new(MemoryVectorStore::new());
    let embedder = Arc::new(KeywordEmbedder::default());
    let generator = Arc::new(ScriptedGenerator::default());

    let system = RagSystem::with_components(
        settings,
        Prompts::default(),
        store.clone() as Arc<dyn VectorStore>,
        embedder.clone(),
        generator.clone(),
    );

    Harness {
        system,
        store,
        embedder,
        generator,
    }
}

pub fn write_docs(dir: &std::path::Path, docs: &[(&str, &str)]) {
    for (name, content) in docs {
        std::fs::write(dir.join(name), content).unwrap();
    }
}
