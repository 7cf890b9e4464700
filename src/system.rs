//! Top-level entry point wiring the index, tools, generator and sessions.

use crate::chunking::ChunkingConfig;
use crate::config::{Prompts, Settings};
use crate::course::Course;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{KursError, Result};
use crate::index::{CatalogSummary, SemanticIndex};
use crate::ingest::{IngestOutcome, IngestSummary, Ingestor};
use crate::rag::{Generator, OpenAIGenerator, QueryOrchestrator, SessionStore};
use crate::tools::{Source, ToolSet};
use crate::vector_store::{
    IndexedCourse, MemoryVectorStore, SearchResult, SqliteVectorStore, VectorStore,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Answer to one query, with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub session_id: String,
}

/// The course Q&A system.
pub struct RagSystem {
    settings: Settings,
    index: SemanticIndex,
    ingestor: Ingestor,
    orchestrator: QueryOrchestrator,
    sessions: SessionStore,
}

impl RagSystem {
    /// Create a system backed by OpenAI and the configured vector store.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let store: Arc<dyn VectorStore> = match settings.vector_store.provider.as_str() {
            "sqlite" => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
            "memory" => Arc::new(MemoryVectorStore::new()),
            other => {
                return Err(KursError::Config(format!(
                    "Unknown vector store provider: {}",
                    other
                )))
            }
        };

        let embedder: Arc<dyn Embedder> = match settings.embedding.provider.as_str() {
            "openai" => Arc::new(OpenAIEmbedder::with_config(
                &settings.embedding.model,
                settings.embedding.dimensions as usize,
            )?),
            other => {
                return Err(KursError::Config(format!(
                    "Unknown embedding provider: {}",
                    other
                )))
            }
        };

        let generator: Arc<dyn Generator> = Arc::new(
            OpenAIGenerator::new(&settings.rag.model)?
                .with_max_tokens(settings.rag.max_tokens)
                .with_temperature(settings.rag.temperature),
        );

        Ok(Self::with_components(
            settings, prompts, store, embedder, generator,
        ))
    }

    /// Create a system with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let index = SemanticIndex::new(store, embedder)
            .with_max_results(settings.rag.max_results)
            .with_course_match_threshold(settings.rag.course_match_threshold);

        let ingestor = Ingestor::new(index.clone(), ChunkingConfig::from(&settings.chunking))
            .with_extensions(settings.ingest.extensions.clone())
            .with_max_concurrent(settings.ingest.max_concurrent);

        let orchestrator = QueryOrchestrator::new(generator, ToolSet::new(index.clone()), prompts)
            .with_tool_timeout(Duration::from_secs(settings.rag.tool_timeout_secs))
            .with_generation_timeout(Duration::from_secs(settings.rag.generation_timeout_secs));

        let sessions = SessionStore::new(settings.rag.max_history);

        Self {
            settings,
            index,
            ingestor,
            orchestrator,
            sessions,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn index(&self) -> &SemanticIndex {
        &self.index
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Ingest one course document.
    pub async fn add_course_document(&self, path: &Path) -> Result<IngestOutcome> {
        self.ingestor.add_course_document(path).await
    }

    /// Ingest a folder of course documents, optionally wiping the index first.
    pub async fn add_course_folder(&self, dir: &Path, clear_existing: bool) -> Result<IngestSummary> {
        self.ingestor.add_course_folder(dir, clear_existing).await
    }

    /// Answer a question within a session.
    ///
    /// Without a token a new session is started. The exchange is recorded
    /// only after the answer is produced, so the current query never appears
    /// in its own history.
    #[instrument(skip(self, query))]
    pub async fn answer(&self, query: &str, session_token: Option<&str>) -> Result<QueryResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(KursError::InvalidInput("Query is empty".to_string()));
        }

        let session_id = self.sessions.get_or_create(session_token);
        let history = self.sessions.format_history(&session_id);

        let result = self.orchestrator.answer(query, history.as_deref()).await;
        self.sessions
            .add_exchange(&session_id, query, &result.answer);

        info!(
            session = %session_id,
            sources = result.sources.len(),
            "Answered query"
        );

        Ok(QueryResponse {
            answer: result.answer,
            sources: result.sources,
            session_id,
        })
    }

    /// Course count and titles.
    pub async fn catalog_summary(&self) -> Result<CatalogSummary> {
        self.index.catalog_summary().await
    }

    /// Indexed courses with chunk counts.
    pub async fn list_courses(&self) -> Result<Vec<IndexedCourse>> {
        self.index.list_courses().await
    }

    /// Resolve a course name and return its outline.
    pub async fn course_outline(&self, course_name: &str) -> Result<Course> {
        let title = self
            .index
            .resolve_course(course_name)
            .await?
            .ok_or_else(|| KursError::Resolution(course_name.to_string()))?;

        self.index
            .course_outline(&title)
            .await?
            .ok_or(KursError::Resolution(title))
    }

    /// Content search without the generator. The course name is resolved
    /// the same way the search tool resolves it.
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let course_title = match course_name {
            Some(name) => Some(
                self.index
                    .resolve_course(name)
                    .await?
                    .ok_or_else(|| KursError::Resolution(name.to_string()))?,
            ),
            None => None,
        };

        self.index
            .search(query, course_title.as_deref(), lesson_number, limit)
            .await
    }

    /// Wipe the index and all sessions.
    pub async fn reset(&self) -> Result<()> {
        self.index.clear().await?;
        self.sessions.clear_all();
        info!("Reset index and sessions");
        Ok(())
    }
}
