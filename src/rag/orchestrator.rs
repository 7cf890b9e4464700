//! Per-query control loop with a tool budget of one.
//!
//! The loop is: build the prompt, generate with tools offered, run at most one
//! requested tool, then generate the final answer with no tools offered. A
//! further tool request at that point is capped: the model is told to answer
//! from the observation it already has. Any generator failure degrades to a
//! fixed fallback answer.

use super::generator::{ChatTurn, Generation, GenerationRequest, Generator, ToolInvocation};
use crate::config::Prompts;
use crate::error::{KursError, Result};
use crate::tools::{parse_tool_call, Source, ToolCall, ToolOutput, ToolSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Result of one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAnswer {
    pub answer: String,
    /// Sources from this query's tool call only.
    pub sources: Vec<Source>,
    /// The tool that ran, if any.
    pub tool_used: Option<ToolCall>,
}

/// Drives one query end to end.
pub struct QueryOrchestrator {
    generator: Arc<dyn Generator>,
    tools: ToolSet,
    prompts: Prompts,
    tool_timeout: Duration,
    generation_timeout: Duration,
}

impl QueryOrchestrator {
    pub fn new(generator: Arc<dyn Generator>, tools: ToolSet, prompts: Prompts) -> Self {
        Self {
            generator,
            tools,
            prompts,
            tool_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_tool_timeout(mut self, tool_timeout: Duration) -> Self {
        self.tool_timeout = tool_timeout;
        self
    }

    pub fn with_generation_timeout(mut self, generation_timeout: Duration) -> Self {
        self.generation_timeout = generation_timeout;
        self
    }

    /// Answer `query`, given the formatted history of earlier turns.
    ///
    /// Never fails: generator errors produce the fallback answer.
    #[instrument(skip(self, history), fields(query = %query))]
    pub async fn answer(&self, query: &str, history: Option<&str>) -> QueryAnswer {
        match self.run(query, history).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Query failed, returning fallback answer: {}", e);
                QueryAnswer {
                    answer: self.prompts.query.fallback_answer.clone(),
                    sources: Vec::new(),
                    tool_used: None,
                }
            }
        }
    }

    async fn run(&self, query: &str, history: Option<&str>) -> Result<QueryAnswer> {
        let mut request = GenerationRequest {
            system: self.prompts.system_message(history),
            messages: vec![ChatTurn::User(query.to_string())],
            offer_tools: true,
        };

        let calls = match self.generate(&request).await? {
            Generation::Text(answer) => {
                debug!("Answered without a tool");
                return Ok(QueryAnswer {
                    answer,
                    sources: Vec::new(),
                    tool_used: None,
                });
            }
            Generation::ToolCalls(calls) => calls,
        };

        let mut calls = calls.into_iter();
        let call = calls
            .next()
            .ok_or_else(|| KursError::Generation("Tool call response had no calls".to_string()))?;

        let dropped = calls.len();
        if dropped > 0 {
            debug!(dropped, "Tool budget is one call per query, ignoring extra calls");
        }

        let (tool_used, output) = self.run_tool(&call).await;

        request.messages.push(ChatTurn::ToolRequest(vec![call.clone()]));
        request.messages.push(ChatTurn::ToolResult {
            call_id: call.id,
            content: output.content.clone(),
        });
        request.offer_tools = false;

        let answer = match self.generate(&request).await? {
            Generation::Text(answer) => answer,
            Generation::ToolCalls(extra) => {
                debug!(
                    requested = extra.len(),
                    "Tool budget spent, asking for an answer from the observation"
                );
                request
                    .messages
                    .push(ChatTurn::User(self.prompts.query.answer_now.clone()));

                match self.generate(&request).await? {
                    Generation::Text(answer) => answer,
                    Generation::ToolCalls(_) => {
                        debug!("Model still requested tools, answering with the observation");
                        output.content
                    }
                }
            }
        };

        Ok(QueryAnswer {
            answer,
            sources: output.sources,
            tool_used,
        })
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        timeout(self.generation_timeout, self.generator.generate(request))
            .await
            .map_err(|_| {
                KursError::Timeout(format!(
                    "generation exceeded {}s",
                    self.generation_timeout.as_secs_f32()
                ))
            })?
    }

    /// Run one tool call. Failures become observation text.
    async fn run_tool(&self, call: &ToolInvocation) -> (Option<ToolCall>, ToolOutput) {
        info!("Calling tool: {} with args: {}", call.name, call.arguments);

        let tool = match parse_tool_call(&call.name, &call.arguments) {
            Ok(tool) => tool,
            Err(e) => {
                warn!("Rejected tool call: {}", e);
                return (None, tool_error(&e));
            }
        };

        let output = match timeout(self.tool_timeout, self.tools.execute(&tool)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("Tool failed: {}", e);
                tool_error(&e)
            }
            Err(_) => {
                let e = KursError::Timeout(format!(
                    "{} exceeded {}s",
                    tool.name(),
                    self.tool_timeout.as_secs_f32()
                ));
                warn!("{}", e);
                tool_error(&e)
            }
        };

        (Some(tool), output)
    }
}

fn tool_error(e: &KursError) -> ToolOutput {
    ToolOutput {
        content: format!("Tool error: {}", e),
        sources: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::CourseChunk;
    use crate::course::{Course, Lesson};
    use crate::embedding::Embedder;
    use crate::index::SemanticIndex;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct FlatEmbedder;

    #[async_trait]
    impl Embedder for FlatEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    /// Replays queued generations and records every request.
    struct ScriptedGenerator {
        script: Mutex<VecDeque<Result<Generation>>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<Result<Generation>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<GenerationRequest> {
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

    fn search_call(id: &str, args: &str) -> ToolInvocation {
        ToolInvocation {
            id: id.to_string(),
            name: "search_course_content".to_string(),
            arguments: args.to_string(),
        }
    }

    async fn orchestrator(generator: Arc<ScriptedGenerator>) -> QueryOrchestrator {
        let index = SemanticIndex::new(Arc::new(MemoryVectorStore::new()), Arc::new(FlatEmbedder));
        let mut course = Course::new("Intro to X");
        course.lessons.push(Lesson {
            number: 1,
            title: "Basics".to_string(),
            link: None,
        });
        index
            .add_course(
                &course,
                &[CourseChunk {
                    course_title: "Intro to X".to_string(),
                    lesson_number: Some(1),
                    chunk_index: 0,
                    content: "Sentence one.".to_string(),
                }],
            )
            .await
            .unwrap();

        QueryOrchestrator::new(generator, ToolSet::new(index), Prompts::default())
    }

    #[tokio::test]
    async fn test_direct_answer_offers_tools_once() {
        let generator = ScriptedGenerator::new(vec![Ok(Generation::Text("Paris.".to_string()))]);
        let orchestrator = orchestrator(generator.clone()).await;

        let answer = orchestrator.answer("Capital of France?", None).await;
        assert_eq!(answer.answer, "Paris.");
        assert!(answer.sources.is_empty());
        assert_eq!(answer.tool_used, None);

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].offer_tools);
        assert!(!requests[0].system.contains("Previous conversation"));
    }

    #[tokio::test]
    async fn test_history_goes_into_system_prompt() {
        let generator = ScriptedGenerator::new(vec![Ok(Generation::Text("ok".to_string()))]);
        let orchestrator = orchestrator(generator.clone()).await;

        orchestrator
            .answer("and then?", Some("User: hi\nAssistant: hello"))
            .await;

        let system = &generator.requests()[0].system;
        assert!(system.ends_with("Previous conversation:\nUser: hi\nAssistant: hello"));
    }

    #[tokio::test]
    async fn test_only_first_tool_call_runs() {
        let generator = ScriptedGenerator::new(vec![
            Ok(Generation::ToolCalls(vec![
                search_call("call_1", r#"{"query": "basics", "lesson_number": 1}"#),
                search_call("call_2", r#"{"query": "more"}"#),
            ])),
            Ok(Generation::Text("Lesson 1 covers basics.".to_string())),
        ]);
        let orchestrator = orchestrator(generator.clone()).await;

        let answer = orchestrator.answer("What is in lesson 1?", None).await;
        assert_eq!(answer.answer, "Lesson 1 covers basics.");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].label, "Intro to X \u{2013} Lesson 1");

        let requests = generator.requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[1].offer_tools);

        let final_turns = &requests[1].messages;
        assert_eq!(final_turns.len(), 3);
        assert_eq!(
            final_turns[1],
            ChatTurn::ToolRequest(vec![search_call(
                "call_1",
                r#"{"query": "basics", "lesson_number": 1}"#
            )])
        );
        match &final_turns[2] {
            ChatTurn::ToolResult { call_id, content } => {
                assert_eq!(call_id, "call_1");
                assert_eq!(content, "[Intro to X \u{2013} Lesson 1]\nSentence one.");
            }
            other => panic!("Expected tool result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_tool_arguments_become_observation() {
        let generator = ScriptedGenerator::new(vec![
            Ok(Generation::ToolCalls(vec![search_call("c", r#"{"lesson_number": 1}"#)])),
            Ok(Generation::Text("Sorry.".to_string())),
        ]);
        let orchestrator = orchestrator(generator.clone()).await;

        let answer = orchestrator.answer("?", None).await;
        assert_eq!(answer.answer, "Sorry.");
        assert!(answer.sources.is_empty());
        assert_eq!(answer.tool_used, None);

        match &generator.requests()[1].messages[2] {
            ChatTurn::ToolResult { content, .. } => {
                assert!(content.starts_with("Tool error: "), "{}", content)
            }
            other => panic!("Expected tool result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generator_failure_degrades() {
        let generator = ScriptedGenerator::new(vec![Err(KursError::OpenAI("down".to_string()))]);
        let orchestrator = orchestrator(generator).await;

        let answer = orchestrator.answer("?", None).await;
        assert_eq!(answer.answer, Prompts::default().query.fallback_answer);
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_final_generation_failure_drops_sources() {
        let generator = ScriptedGenerator::new(vec![
            Ok(Generation::ToolCalls(vec![search_call("c", r#"{"query": "basics"}"#)])),
            Err(KursError::Generation("boom".to_string())),
        ]);
        let orchestrator = orchestrator(generator).await;

        let answer = orchestrator.answer("?", None).await;
        assert_eq!(answer.answer, Prompts::default().query.fallback_answer);
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_second_tool_request_is_not_executed() {
        let generator = ScriptedGenerator::new(vec![
            Ok(Generation::ToolCalls(vec![search_call("a", r#"{"query": "basics"}"#)])),
            Ok(Generation::ToolCalls(vec![search_call("b", r#"{"query": "again"}"#)])),
            Ok(Generation::Text("From the search: basics.".to_string())),
        ]);
        let orchestrator = orchestrator(generator.clone()).await;

        let answer = orchestrator.answer("?", None).await;
        assert_eq!(answer.answer, "From the search: basics.");
        assert_eq!(answer.sources.len(), 1);
        assert!(answer.tool_used.is_some());

        let requests = generator.requests();
        assert_eq!(requests.len(), 3);
        assert!(!requests[2].offer_tools);
        assert_eq!(
            requests[2].messages.last(),
            Some(&ChatTurn::User(Prompts::default().query.answer_now))
        );
        // Call "b" is never echoed back.
        assert!(!requests[2].messages.iter().any(|turn| matches!(
            turn,
            ChatTurn::ToolRequest(calls) if calls.iter().any(|c| c.id == "b")
        )));
    }

    #[tokio::test]
    async fn test_persistent_tool_requests_answer_with_observation() {
        let generator = ScriptedGenerator::new(vec![
            Ok(Generation::ToolCalls(vec![search_call("a", r#"{"query": "basics"}"#)])),
            Ok(Generation::ToolCalls(vec![search_call("b", r#"{"query": "again"}"#)])),
            Ok(Generation::ToolCalls(vec![search_call("c", r#"{"query": "again"}"#)])),
        ]);
        let orchestrator = orchestrator(generator.clone()).await;

        let answer = orchestrator.answer("?", None).await;
        assert_eq!(answer.answer, "[Intro to X \u{2013} Lesson 1]\nSentence one.");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(generator.requests().len(), 3);
    }

    struct SlowGenerator;

    #[async_trait]
    impl Generator for SlowGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<Generation> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Generation::Text("too late".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout_degrades() {
        let index = SemanticIndex::new(Arc::new(MemoryVectorStore::new()), Arc::new(FlatEmbedder));
        let orchestrator =
            QueryOrchestrator::new(Arc::new(SlowGenerator), ToolSet::new(index), Prompts::default())
                .with_generation_timeout(Duration::from_secs(5));

        let answer = orchestrator.answer("?", None).await;
        assert_eq!(answer.answer, Prompts::default().query.fallback_answer);
    }
}
