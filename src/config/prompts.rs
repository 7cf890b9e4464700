//! Prompt templates for Kurs.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub query: QueryPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts used when answering a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryPrompts {
    /// Static instruction sent as the system message.
    pub system: String,
    /// Template wrapping prior turns; `{{history}}` is replaced with the formatted turns.
    pub history: String,
    /// Sent when the model asks for a tool after its one call was used.
    pub answer_now: String,
    /// Answer returned when generation fails.
    pub fallback_answer: String,
}

impl Default for QueryPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an assistant that answers questions about course materials and lecture transcripts.

Tools:
- search_course_content: look up what a course or lesson actually says. Use it for questions about specific course content or detailed educational material.
- get_course_outline: get a course title, course link and full lesson list. Use it for questions about course structure, lesson lists or what a course covers.

Rules:
- Use at most one tool per question. You will not get a second tool call.
- Answer general knowledge questions directly, without a tool.
- If a tool reports that nothing was found, say so plainly instead of guessing.
- Synthesize the tool output into a direct answer. Do not describe your search process, and do not mention the tools.
- Keep answers brief, accurate and focused. Include examples when they help."#
                .to_string(),

            history: "Previous conversation:\n{{history}}".to_string(),

            answer_now: "No more tool calls are available for this question. Answer now using only the tool result above."
                .to_string(),

            fallback_answer:
                "I'm sorry, I was unable to complete the request. Please try again in a moment."
                    .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let query_path = custom_path.join("query.toml");
            if query_path.exists() {
                let content = std::fs::read_to_string(&query_path)?;
                prompts.query = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Build the system message for a query, appending prior turns when present.
    pub fn system_message(&self, history: Option<&str>) -> String {
        let system = self.render_with_custom(&self.query.system, &HashMap::new());

        match history {
            Some(turns) if !turns.trim().is_empty() => {
                let mut vars = HashMap::new();
                vars.insert("history".to_string(), turns.to_string());
                format!(
                    "{}\n\n{}",
                    system,
                    self.render_with_custom(&self.query.history, &vars)
                )
            }
            _ => system,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.query.system.contains("search_course_content"));
        assert!(prompts.query.system.contains("at most one tool"));
        assert!(!prompts.query.fallback_answer.is_empty());
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_system_message_without_history() {
        let prompts = Prompts::default();
        assert_eq!(prompts.system_message(None), prompts.query.system);
        assert_eq!(prompts.system_message(Some("   ")), prompts.query.system);
    }

    #[test]
    fn test_system_message_with_history() {
        let prompts = Prompts::default();
        let message = prompts.system_message(Some("User: hi\nAssistant: hello"));
        assert!(message.starts_with(&prompts.query.system));
        assert!(message.contains("Previous conversation:\nUser: hi\nAssistant: hello"));
    }

    #[test]
    fn test_load_custom_query_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("query.toml"),
            "system = \"Custom instructions for {{audience}}.\"\n",
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert("audience".to_string(), "students".to_string());

        let prompts = Prompts::load(dir.path().to_str(), Some(&vars)).unwrap();
        assert_eq!(
            prompts.system_message(None),
            "Custom instructions for students."
        );
        // Unset fields keep their defaults.
        assert!(prompts.query.history.contains("{{history}}"));
    }
}
