//! Tools offered to the generator.
//!
//! The tool set is closed: [`ToolCall`] has one variant per tool and
//! [`ToolSet::execute`] dispatches on it.

use crate::chunking::source_label;
use crate::error::{KursError, Result};
use crate::index::SemanticIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

pub const SEARCH_COURSE_CONTENT: &str = "search_course_content";
pub const GET_COURSE_OUTLINE: &str = "get_course_outline";

/// Available tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Search course transcripts, optionally narrowed to a course and lesson.
    SearchCourseContent {
        query: String,
        #[serde(default)]
        course_name: Option<String>,
        #[serde(default)]
        lesson_number: Option<u32>,
    },

    /// Get a course's title, link, instructor and lesson list.
    GetCourseOutline { course_name: String },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::SearchCourseContent { .. } => SEARCH_COURSE_CONTENT,
            ToolCall::GetCourseOutline { .. } => GET_COURSE_OUTLINE,
        }
    }
}

/// A source shown to the user alongside an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// "Course – Lesson N", or the course title for course-level text.
    pub label: String,
    /// Lesson link, or course link for course-level text.
    pub link: Option<String>,
}

/// Result of running one tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Observation text handed back to the generator. Never empty.
    pub content: String,
    /// Sources for the retrieved content, in ranked order.
    pub sources: Vec<Source>,
}

impl ToolOutput {
    fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }
}

/// Tool execution context.
#[derive(Clone)]
pub struct ToolSet {
    index: SemanticIndex,
}

impl ToolSet {
    pub fn new(index: SemanticIndex) -> Self {
        Self { index }
    }

    /// Execute a tool call.
    ///
    /// Unknown courses and search failures come back as observation text, not
    /// as errors. Only storage failures while building an outline are errors.
    #[instrument(skip(self), fields(tool = tool.name()))]
    pub async fn execute(&self, tool: &ToolCall) -> Result<ToolOutput> {
        match tool {
            ToolCall::SearchCourseContent {
                query,
                course_name,
                lesson_number,
            } => Ok(self
                .search_course_content(query, course_name.as_deref(), *lesson_number)
                .await),
            ToolCall::GetCourseOutline { course_name } => {
                self.get_course_outline(course_name).await
            }
        }
    }

    async fn search_course_content(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> ToolOutput {
        let course_title = match course_name {
            Some(name) => match self.index.resolve_course(name).await {
                Ok(Some(title)) => Some(title),
                Ok(None) => {
                    debug!(course_name = name, "Course not resolved");
                    return ToolOutput::text(format!("{}.", KursError::Resolution(name.to_string())));
                }
                Err(e) => {
                    warn!("Course resolution failed: {}", e);
                    return ToolOutput::text(format!("Search error: {}", e));
                }
            },
            None => None,
        };

        let results = match self
            .index
            .search(query, course_title.as_deref(), lesson_number, None)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                warn!("Content search failed: {}", e);
                return ToolOutput::text(format!("Search error: {}", e));
            }
        };

        if results.is_empty() {
            let mut message = "No relevant content found".to_string();
            if let Some(title) = &course_title {
                message.push_str(&format!(" in course '{}'", title));
            }
            if let Some(n) = lesson_number {
                message.push_str(&format!(" in lesson {}", n));
            }
            message.push('.');
            return ToolOutput::text(message);
        }

        let mut blocks = Vec::with_capacity(results.len());
        let mut sources = Vec::with_capacity(results.len());

        for result in &results {
            let chunk = &result.chunk;
            let label = chunk.label();

            let link = match chunk.lesson_number {
                Some(n) => self.index.lesson_link(&chunk.course_title, n).await,
                None => self.index.course_link(&chunk.course_title).await,
            }
            .unwrap_or_else(|e| {
                warn!("Link lookup failed: {}", e);
                None
            });

            blocks.push(format!("[{}]\n{}", label, chunk.content));
            sources.push(Source { label, link });
        }

        ToolOutput {
            content: blocks.join("\n\n"),
            sources,
        }
    }

    async fn get_course_outline(&self, course_name: &str) -> Result<ToolOutput> {
        let Some(title) = self.index.resolve_course(course_name).await? else {
            return Ok(ToolOutput::text(format!(
                "{}.",
                KursError::Resolution(course_name.to_string())
            )));
        };

        let Some(course) = self.index.course_outline(&title).await? else {
            return Ok(ToolOutput::text(format!(
                "{}.",
                KursError::Resolution(course_name.to_string())
            )));
        };

        let mut lines = vec![format!("Course: {}", course.title)];
        if let Some(link) = &course.link {
            lines.push(format!("Link: {}", link));
        }
        if let Some(instructor) = &course.instructor {
            lines.push(format!("Instructor: {}", instructor));
        }

        if course.lessons.is_empty() {
            lines.push("Lessons: none".to_string());
        } else {
            lines.push(format!("Lessons ({}):", course.lessons.len()));
            for lesson in &course.lessons {
                match &lesson.link {
                    Some(link) => {
                        lines.push(format!("{}. {} - {}", lesson.number, lesson.title, link))
                    }
                    None => lines.push(format!("{}. {}", lesson.number, lesson.title)),
                }
            }
        }

        Ok(ToolOutput {
            content: lines.join("\n"),
            sources: vec![Source {
                label: source_label(&course.title, None),
                link: course.link.clone(),
            }],
        })
    }
}

/// Get OpenAI function/tool definitions.
pub fn tool_definitions() -> Vec<async_openai::types::ChatCompletionTool> {
    use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};

    vec![
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: SEARCH_COURSE_CONTENT.to_string(),
                description: Some(
                    "Search course transcripts for specific content. \
                    Use this for questions about what a course or lesson teaches."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "What to search for in the course content"
                        },
                        "course_name": {
                            "type": "string",
                            "description": "Course title; partial or approximate names work"
                        },
                        "lesson_number": {
                            "type": "integer",
                            "description": "Restrict the search to this lesson number"
                        }
                    },
                    "required": ["query"]
                })),
                strict: None,
            },
        },
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: GET_COURSE_OUTLINE.to_string(),
                description: Some(
                    "Get a course's outline: title, link, instructor and numbered lesson list. \
                    Use this for questions about course structure."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "course_name": {
                            "type": "string",
                            "description": "Course title; partial or approximate names work"
                        }
                    },
                    "required": ["course_name"]
                })),
                strict: None,
            },
        },
    ]
}

/// Parse a tool call from the OpenAI response format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: serde_json::Value = serde_json::from_str(arguments)
        .map_err(|e| KursError::Tool(format!("Invalid tool arguments: {}", e)))?;

    match name {
        SEARCH_COURSE_CONTENT => {
            let query = required_str(&args, "query")?;
            let course_name = args["course_name"]
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            let lesson_number = match &args["lesson_number"] {
                serde_json::Value::Null => None,
                value => Some(
                    value
                        .as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| {
                            KursError::Tool(format!(
                                "'lesson_number' must be a non-negative integer, got {}",
                                value
                            ))
                        })?,
                ),
            };
            Ok(ToolCall::SearchCourseContent {
                query,
                course_name,
                lesson_number,
            })
        }
        GET_COURSE_OUTLINE => Ok(ToolCall::GetCourseOutline {
            course_name: required_str(&args, "course_name")?,
        }),
        _ => Err(KursError::Tool(format!("Unknown tool: {}", name))),
    }
}

fn required_str(args: &serde_json::Value, key: &str) -> Result<String> {
    args[key]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| KursError::Tool(format!("Missing '{}' argument", key)))
}
