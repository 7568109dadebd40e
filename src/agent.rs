//! LLM agent module for structured summarization.
//!
//! Builds the prompt from the configured persona plus the schema's format
//! instructions, invokes a model handle and parses whatever comes back.

use crate::config::Prompts;
use crate::parser::{self, Strategy};
use crate::providers::{Message, ModelHandle, ProviderError};
use crate::summary::StructuredSummary;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Error generating summary: {0}")]
    Provider(#[from] ProviderError),
}

/// Messages for a summarization request
pub fn summarize_messages(text: &str, prompts: &Prompts) -> Vec<Message> {
    let system_prompt = format!(
        "{}\n\n{}",
        prompts.summarize.system,
        StructuredSummary::format_instructions()
    );
    vec![
        Message::system(system_prompt),
        Message::user(format!("Content: {text}")),
    ]
}

/// Run the summarization agent on the provided text.
///
/// Only a failed model call is an error; a malformed response degrades to the raw
/// text with a placeholder topic.
pub async fn summarize(
    text: &str,
    model: &ModelHandle,
    prompts: &Prompts,
) -> Result<StructuredSummary, AgentError> {
    tracing::info!(
        provider = %model.provider(),
        model = model.model(),
        chars = text.chars().count(),
        "summarizing content with structured output"
    );

    let messages = summarize_messages(text, prompts);
    let response = model.invoke(&messages).await?;
    tracing::info!(chars = response.chars().count(), "model response received");

    let parsed = parser::parse(&response);
    if parsed.strategy != Strategy::Schema {
        tracing::warn!(strategy = ?parsed.strategy, "structured output degraded");
    }
    Ok(StructuredSummary::new(parsed.topic, parsed.summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatModel, ProviderKind, Role};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedModel(String);

    #[async_trait]
    impl ChatModel for FixedModel {
        async fn invoke(&self, messages: &[Message]) -> Result<String, ProviderError> {
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].role, Role::System);
            assert!(messages[1].content.starts_with("Content: "));
            Ok(self.0.clone())
        }

        fn provider(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }

        fn model(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn system_prompt_carries_format_instructions() {
        let messages = summarize_messages("page text", &Prompts::default());
        assert!(messages[0].content.starts_with(&Prompts::default().summarize.system));
        assert!(messages[0].content.contains("JSON schema"));
        assert_eq!(messages[1], Message::user("Content: page text"));
    }

    #[tokio::test]
    async fn structured_response_is_returned() {
        let summary = "Detailed paragraph about the subject. ".repeat(10);
        let raw = serde_json::json!({ "topic": "Subject Overview", "summary": summary }).to_string();
        let model: ModelHandle = Arc::new(FixedModel(raw));
        let result = summarize("page text", &model, &Prompts::default())
            .await
            .unwrap();
        assert_eq!(result.topic, "Subject Overview");
        assert_eq!(result.summary, summary);
    }

    #[tokio::test]
    async fn unstructured_response_degrades() {
        let model: ModelHandle = Arc::new(FixedModel("Just prose.".to_string()));
        let result = summarize("page text", &model, &Prompts::default())
            .await
            .unwrap();
        assert_eq!(result.topic, parser::FALLBACK_TOPIC);
        assert_eq!(result.summary, "Just prose.");
    }
}
