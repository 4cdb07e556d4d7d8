//! Retrieval-augmented generation for study tasks
//!
//! The orchestrator turns retrieved records into a context block, renders the
//! task prompt and asks the configured agent. JSON tasks are decoded from the
//! agent's reply; a reply that does not decode is logged and yields
//! `GenerationOutput::Empty`.

mod agent;
pub mod prompts;

pub use agent::{create_agent, AnthropicAgent, GeminiAgent, GenerationAgent, OpenAiAgent};
pub use prompts::{Difficulty, Level, QuestionType, SummaryStyle};

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::models::{ContentType, RetrievalResult};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, error, info};

/// A study task and its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationTask {
    Questions {
        count: u32,
        difficulty: Difficulty,
        question_types: Vec<QuestionType>,
    },
    Summary {
        style: SummaryStyle,
        max_length: u32,
    },
    StudyPlan {
        hours: u32,
        level: Level,
        focus_areas: Vec<String>,
    },
}

impl GenerationTask {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationTask::Questions { .. } => "questions",
            GenerationTask::Summary { .. } => "summary",
            GenerationTask::StudyPlan { .. } => "study plan",
        }
    }

    /// Reject parameters outside their accepted ranges
    pub fn validate(&self) -> Result<()> {
        match self {
            GenerationTask::Questions {
                count,
                question_types,
                ..
            } => {
                if !(1..=20).contains(count) {
                    return Err(Error::Config(format!(
                        "Question count must be between 1 and 20, got {}",
                        count
                    )));
                }
                if question_types.is_empty() {
                    return Err(Error::Config("At least one question type is required".to_string()));
                }
            }
            GenerationTask::Summary { max_length, .. } => {
                if !(100..=5000).contains(max_length) {
                    return Err(Error::Config(format!(
                        "Summary length must be between 100 and 5000, got {}",
                        max_length
                    )));
                }
            }
            GenerationTask::StudyPlan { hours, .. } => {
                if !(1..=168).contains(hours) {
                    return Err(Error::Config(format!(
                        "Study plan hours must be between 1 and 168, got {}",
                        hours
                    )));
                }
            }
        }
        Ok(())
    }

    fn expects_json(&self) -> bool {
        !matches!(self, GenerationTask::Summary { .. })
    }
}

/// What the agent produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationOutput {
    Structured(Value),
    Text(String),
    /// Nothing usable; JSON callers render this as `[]`
    Empty,
}

impl GenerationOutput {
    /// JSON view of the output
    pub fn to_json(&self) -> Value {
        match self {
            GenerationOutput::Structured(value) => value.clone(),
            GenerationOutput::Text(text) => Value::String(text.clone()),
            GenerationOutput::Empty => Value::Array(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, GenerationOutput::Empty)
    }
}

/// Context block: each record's content followed by a blank line
pub fn assemble_context(content: &[RetrievalResult]) -> String {
    content
        .iter()
        .map(|item| format!("{}\n\n", item.content))
        .collect()
}

fn fence_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\s*```$").ok())
        .as_ref()
}

/// Decode JSON that may be wrapped in a Markdown code fence
pub fn decode_markdown_json(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    let body = fence_pattern()
        .and_then(|re| re.captures(trimmed))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);
    serde_json::from_str(body).map_err(|e| Error::GenerationParse(e.to_string()))
}

pub struct Orchestrator {
    agent: Box<dyn GenerationAgent>,
    max_tokens: u32,
}

impl Orchestrator {
    pub fn new(agent: Box<dyn GenerationAgent>, max_tokens: u32) -> Self {
        Self { agent, max_tokens }
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Ok(Self::new(create_agent(config)?, config.max_tokens))
    }

    /// Build the prompt for `task` over `content` and run it through the agent
    pub async fn assemble_and_generate(
        &self,
        content: &[RetrievalResult],
        task: &GenerationTask,
    ) -> Result<GenerationOutput> {
        task.validate()?;
        let context = assemble_context(content);
        let prompt = match task {
            GenerationTask::Questions {
                count,
                difficulty,
                question_types,
            } => prompts::questions(&context, *count, *difficulty, question_types),
            GenerationTask::Summary { style, max_length } => {
                let has_visual = content
                    .iter()
                    .any(|item| item.content_type() == Some(ContentType::ImageDescription));
                prompts::summary(&context, *style, *max_length, has_visual)
            }
            GenerationTask::StudyPlan {
                hours,
                level,
                focus_areas,
            } => prompts::study_plan(&context, *hours, *level, focus_areas),
        };

        info!(
            task = task.name(),
            items = content.len(),
            model = self.agent.model_name(),
            "Generating"
        );
        let reply = self.agent.complete(&prompt, self.max_tokens).await?;
        debug!("Agent replied with {} chars", reply.len());

        if !task.expects_json() {
            let text = reply.trim();
            return Ok(if text.is_empty() {
                GenerationOutput::Empty
            } else {
                GenerationOutput::Text(text.to_string())
            });
        }

        match decode_markdown_json(&reply) {
            Ok(value) => Ok(GenerationOutput::Structured(value)),
            Err(e) => {
                error!(raw = %reply, "Failed to decode {} output: {}", task.name(), e);
                Ok(GenerationOutput::Empty)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedAgent {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedAgent {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerationAgent for ScriptedAgent {
        async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct SharedAgent(std::sync::Arc<ScriptedAgent>);

    #[async_trait]
    impl GenerationAgent for SharedAgent {
        async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
            self.0.complete(prompt, max_tokens).await
        }

        fn model_name(&self) -> &str {
            self.0.model_name()
        }
    }

    fn record(content: &str, content_type: &str) -> RetrievalResult {
        RetrievalResult {
            id: format!("doc_1_{}_0", content_type),
            content: content.to_string(),
            metadata: json!({"document_id": "doc_1", "content_type": content_type})
                .as_object()
                .cloned()
                .unwrap(),
            distance: Some(0.1),
        }
    }

    fn questions() -> GenerationTask {
        GenerationTask::Questions {
            count: 2,
            difficulty: Difficulty::Medium,
            question_types: vec![QuestionType::MultipleChoice],
        }
    }

    #[test]
    fn test_decode_fenced_json() {
        let raw = "```json\n[{\"question\": \"What is ATP?\"}]\n```";
        assert_eq!(
            decode_markdown_json(raw).unwrap(),
            json!([{"question": "What is ATP?"}])
        );
        assert_eq!(decode_markdown_json("```\n{\"a\": 1}\n```").unwrap(), json!({"a": 1}));
        assert_eq!(decode_markdown_json("  [1, 2] ").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_decode_garbage_is_parse_error() {
        assert!(matches!(
            decode_markdown_json("Sure! Here are your questions."),
            Err(Error::GenerationParse(_))
        ));
    }

    #[test]
    fn test_context_block() {
        let content = vec![record("first", "text"), record("second", "combined")];
        assert_eq!(assemble_context(&content), "first\n\nsecond\n\n");
    }

    #[tokio::test]
    async fn test_questions_structured() {
        let agent = ScriptedAgent::new("```json\n[{\"question\": \"Q1\"}, {\"question\": \"Q2\"}]\n```");
        let orchestrator = Orchestrator::new(Box::new(agent), 1500);
        let output = orchestrator
            .assemble_and_generate(&[record("cells", "text")], &questions())
            .await
            .unwrap();
        assert_eq!(
            output,
            GenerationOutput::Structured(json!([{"question": "Q1"}, {"question": "Q2"}]))
        );
    }

    #[tokio::test]
    async fn test_undecodable_reply_is_empty() {
        let orchestrator = Orchestrator::new(Box::new(ScriptedAgent::new("no json here")), 1500);
        let output = orchestrator
            .assemble_and_generate(&[record("cells", "text")], &questions())
            .await
            .unwrap();
        assert!(output.is_empty());
        assert_eq!(output.to_json(), json!([]));
    }

    #[tokio::test]
    async fn test_summary_mentions_visuals_when_present() {
        let agent = std::sync::Arc::new(ScriptedAgent::new("  A short summary. "));
        let orchestrator = Orchestrator::new(Box::new(SharedAgent(agent.clone())), 1500);
        let task = GenerationTask::Summary {
            style: SummaryStyle::Detailed,
            max_length: 2000,
        };

        let output = orchestrator
            .assemble_and_generate(
                &[record("cells", "text"), record("a diagram", "image_description")],
                &task,
            )
            .await
            .unwrap();
        assert_eq!(output, GenerationOutput::Text("A short summary.".to_string()));

        let prompts = agent.prompts.lock().unwrap();
        assert!(prompts[0].contains("visual elements (images, charts, diagrams)"));
        assert!(prompts[0].ends_with("Content:\ncells\n\na diagram\n\n"));
    }

    #[tokio::test]
    async fn test_out_of_range_task_rejected() {
        let orchestrator = Orchestrator::new(Box::new(ScriptedAgent::new("[]")), 1500);
        let task = GenerationTask::StudyPlan {
            hours: 0,
            level: Level::Beginner,
            focus_areas: Vec::new(),
        };
        let result = orchestrator
            .assemble_and_generate(&[record("cells", "text")], &task)
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
