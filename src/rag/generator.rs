//! Language-model generation capability.

use crate::error::{KursError, Result};
use crate::openai::create_client;
use crate::tools::tool_definitions;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// A tool call requested by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Provider-assigned call ID, echoed back with the tool result.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Raw JSON arguments.
    pub arguments: String,
}

/// One message after the system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTurn {
    User(String),
    /// An assistant turn that requested tools.
    ToolRequest(Vec<ToolInvocation>),
    /// The observation for a requested tool call.
    ToolResult { call_id: String, content: String },
}

/// Input to a single generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub messages: Vec<ChatTurn>,
    /// Whether tool schemas are offered on this call.
    pub offer_tools: bool,
}

/// Output of a single generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// A final text answer.
    Text(String),
    /// One or more tool calls, in the order requested.
    ToolCalls(Vec<ToolInvocation>),
}

/// Trait for generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation>;
}

/// OpenAI chat-completions generator.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIGenerator {
    pub fn new(model: &str) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            max_tokens: 800,
            temperature: 0.0,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_messages(request: &GenerationRequest) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(|e| KursError::Generation(e.to_string()))?
                .into(),
        ];

        for turn in &request.messages {
            let message: ChatCompletionRequestMessage = match turn {
                ChatTurn::User(text) => ChatCompletionRequestUserMessageArgs::default()
                    .content(text.clone())
                    .build()
                    .map_err(|e| KursError::Generation(e.to_string()))?
                    .into(),
                ChatTurn::ToolRequest(calls) => {
                    let tool_calls: Vec<ChatCompletionMessageToolCall> = calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect();

                    ChatCompletionRequestAssistantMessageArgs::default()
                        .tool_calls(tool_calls)
                        .build()
                        .map_err(|e| KursError::Generation(e.to_string()))?
                        .into()
                }
                ChatTurn::ToolResult { call_id, content } => {
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(call_id.clone())
                        .content(content.clone())
                        .build()
                        .map_err(|e| KursError::Generation(e.to_string()))?
                        .into()
                }
            };
            messages.push(message);
        }

        Ok(messages)
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, request), fields(model = %self.model, tools = request.offer_tools))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let messages = Self::build_messages(request)?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens);
        if request.offer_tools {
            args.tools(tool_definitions());
        }
        let chat_request = args
            .build()
            .map_err(|e| KursError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| KursError::OpenAI(format!("Failed to generate response: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| KursError::Generation("No response from model".to_string()))?;

        if let Some(tool_calls) = choice.message.tool_calls.filter(|calls| !calls.is_empty()) {
            debug!("Model requested {} tool call(s)", tool_calls.len());
            return Ok(Generation::ToolCalls(
                tool_calls
                    .into_iter()
                    .map(|call| ToolInvocation {
                        id: call.id,
                        name: call.function.name,
                        arguments: call.function.arguments,
                    })
                    .collect(),
            ));
        }

        choice
            .message
            .content
            .filter(|text| !text.trim().is_empty())
            .map(Generation::Text)
            .ok_or_else(|| KursError::Generation("Empty response from model".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_keeps_turn_order() {
        let request = GenerationRequest {
            system: "You answer questions.".to_string(),
            messages: vec![
                ChatTurn::User("What is covered?".to_string()),
                ChatTurn::ToolRequest(vec![ToolInvocation {
                    id: "call_1".to_string(),
                    name: "search_course_content".to_string(),
                    arguments: r#"{"query":"basics"}"#.to_string(),
                }]),
                ChatTurn::ToolResult {
                    call_id: "call_1".to_string(),
                    content: "[Intro \u{2013} Lesson 1]\nBasics.".to_string(),
                },
            ],
            offer_tools: false,
        };

        let messages = OpenAIGenerator::build_messages(&request).unwrap();
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[3], ChatCompletionRequestMessage::Tool(_)));
    }
}
