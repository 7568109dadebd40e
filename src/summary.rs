//! StructuredSummary - the structured output the model is instructed to emit.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TOPIC_MIN_CHARS: usize = 3;
pub const TOPIC_MAX_CHARS: usize = 50;
pub const SUMMARY_MIN_CHARS: usize = 300;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("topic must be {TOPIC_MIN_CHARS}-{TOPIC_MAX_CHARS} characters, got {0}")]
    TopicLength(usize),
    #[error("summary must be at least {SUMMARY_MIN_CHARS} characters, got {0}")]
    SummaryTooShort(usize),
}

/// Structured summary output from the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StructuredSummary {
    /// Main topic in 3-6 descriptive words that identifies the subject matter
    #[schemars(length(min = 3, max = 50))]
    pub topic: String,
    /// Comprehensive and extremely detailed summary (8-10 substantial paragraphs,
    /// 300-500+ words minimum) with specific facts, dates, numbers, quotes, and
    /// comprehensive coverage of all aspects
    #[schemars(length(min = 300))]
    pub summary: String,
}

impl StructuredSummary {
    pub fn new(topic: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            summary: summary.into(),
        }
    }

    /// Check the length constraints the schema declares
    pub fn validate(&self) -> Result<(), ValidationError> {
        let topic_len = self.topic.chars().count();
        if !(TOPIC_MIN_CHARS..=TOPIC_MAX_CHARS).contains(&topic_len) {
            return Err(ValidationError::TopicLength(topic_len));
        }
        let summary_len = self.summary.chars().count();
        if summary_len < SUMMARY_MIN_CHARS {
            return Err(ValidationError::SummaryTooShort(summary_len));
        }
        Ok(())
    }

    /// Instructions appended to the system prompt describing the expected output
    pub fn format_instructions() -> String {
        let schema = schemars::schema_for!(StructuredSummary);
        let schema = serde_json::to_string_pretty(&schema).unwrap_or_default();
        format!(
            "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\n\
             Here is the output schema:\n```\n{schema}\n```\n\n\
             Only output the JSON object, without any explanation."
        )
    }
}
