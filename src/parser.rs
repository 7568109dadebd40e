//! Tolerant parsing of model responses into a `(summary, topic)` pair.
//!
//! Strategies are tried in order; the first one that yields a pair wins. The chain
//! ends in a default that always succeeds, so parsing never fails outward.

use crate::summary::StructuredSummary;

/// Topic used when nothing structured can be recovered from a response
pub const FALLBACK_TOPIC: &str = "Content Analysis";

/// Which strategy produced a parsed summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Strict decode against the schema, constraints included
    Schema,
    /// Generic JSON decode of a fenced block or `{...}` span
    Fragment,
    /// Raw response text with the placeholder topic
    Raw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSummary {
    pub summary: String,
    pub topic: String,
    pub strategy: Strategy,
}

type Attempt = fn(&str) -> Result<StructuredSummary, String>;

const CHAIN: [(Strategy, Attempt); 2] = [
    (Strategy::Schema, decode_schema),
    (Strategy::Fragment, decode_fragment),
];

/// Parse a raw model response
pub fn parse(raw: &str) -> ParsedSummary {
    for (strategy, attempt) in CHAIN {
        match attempt(raw) {
            Ok(result) => {
                tracing::debug!(?strategy, topic = %result.topic, "parsed model response");
                return ParsedSummary {
                    summary: result.summary,
                    topic: result.topic,
                    strategy,
                };
            }
            Err(reason) => tracing::warn!(?strategy, %reason, "parse strategy failed"),
        }
    }

    ParsedSummary {
        summary: raw.to_string(),
        topic: FALLBACK_TOPIC.to_string(),
        strategy: Strategy::Raw,
    }
}

fn decode_schema(raw: &str) -> Result<StructuredSummary, String> {
    let cleaned = strip_markdown_json(raw);
    let result: StructuredSummary = serde_json::from_str(cleaned).map_err(|e| e.to_string())?;
    result.validate().map_err(|e| e.to_string())?;
    Ok(result)
}

fn decode_fragment(raw: &str) -> Result<StructuredSummary, String> {
    let candidate = json_candidate(raw);
    let value: serde_json::Value = serde_json::from_str(candidate).map_err(|e| e.to_string())?;

    let field = |name: &str| {
        value
            .get(name)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    };
    match (field("summary"), field("topic")) {
        (Some(summary), Some(topic)) => Ok(StructuredSummary { topic, summary }),
        _ => Err("missing summary or topic in response".to_string()),
    }
}

/// Strip a markdown code block wrapping the whole response
fn strip_markdown_json(text: &str) -> &str {
    let trimmed = text.trim();

    // Remove ```json ... ``` or ``` ... ```
    if let Some(rest) = trimmed.strip_prefix("```") {
        let without_prefix = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end_idx) = without_prefix.rfind("```") {
            return without_prefix[..end_idx].trim();
        }
    }

    trimmed
}

/// Locate the most likely JSON span inside free text
fn json_candidate(text: &str) -> &str {
    if let Some((_, after)) = text.split_once("```json") {
        let block = after.split("```").next().unwrap_or(after);
        return block.trim();
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        return text.get(start..=end).unwrap_or("");
    }

    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_summary() -> String {
        "The article walks through the history of the project in detail. ".repeat(6)
    }

    #[test]
    fn schema_strategy_returns_exact_pair() {
        let summary = long_summary();
        let raw = serde_json::json!({ "topic": "Project History Overview", "summary": summary })
            .to_string();
        let parsed = parse(&raw);
        assert_eq!(parsed.strategy, Strategy::Schema);
        assert_eq!(parsed.topic, "Project History Overview");
        assert_eq!(parsed.summary, summary);
    }

    #[test]
    fn schema_strategy_ignores_extra_keys() {
        let summary = long_summary();
        let raw = serde_json::json!({
            "topic": "Project History Overview",
            "summary": summary,
            "confidence": 0.9
        })
        .to_string();
        let parsed = parse(&raw);
        assert_eq!(parsed.strategy, Strategy::Schema);
        assert_eq!(parsed.summary, summary);
    }

    #[test]
    fn fragment_keeps_values_verbatim() {
        let raw = r#"{"topic": "  Padded ", "summary": "Short text.\n"}"#;
        let parsed = parse(raw);
        assert_eq!(parsed.strategy, Strategy::Fragment);
        assert_eq!(parsed.topic, "  Padded ");
        assert_eq!(parsed.summary, "Short text.\n");
    }

    #[test]
    fn schema_strategy_accepts_fenced_response() {
        let raw = format!(
            "```json\n{}\n```",
            serde_json::json!({ "topic": "Fenced Topic", "summary": long_summary() })
        );
        assert_eq!(parse(&raw).strategy, Strategy::Schema);
    }

    #[test]
    fn short_summary_falls_through_to_fragment() {
        let raw = r#"Sure! Here it is: {"topic": "Tiny", "summary": "Brief text."} Hope it helps."#;
        let parsed = parse(raw);
        assert_eq!(parsed.strategy, Strategy::Fragment);
        assert_eq!(parsed.topic, "Tiny");
        assert_eq!(parsed.summary, "Brief text.");
    }

    #[test]
    fn fragment_prefers_json_fence() {
        let raw = "Notes {not json}\n```json\n{\"summary\": \"From the fence\", \"topic\": \"Fence\", \"extra\": 1}\n```\ntrailing }";
        let parsed = parse(raw);
        assert_eq!(parsed.strategy, Strategy::Fragment);
        assert_eq!(parsed.summary, "From the fence");
    }

    #[test]
    fn missing_fields_fall_back_to_raw() {
        let raw = r#"{"summary": "", "topic": "Something"}"#;
        let parsed = parse(raw);
        assert_eq!(parsed.strategy, Strategy::Raw);
        assert_eq!(parsed.summary, raw);
        assert_eq!(parsed.topic, FALLBACK_TOPIC);
    }

    #[test]
    fn free_text_falls_back_to_raw() {
        let raw = "I could not produce JSON, but the page is about gardening.";
        let parsed = parse(raw);
        assert_eq!(parsed.strategy, Strategy::Raw);
        assert_eq!(parsed.summary, raw);
        assert_eq!(parsed.topic, FALLBACK_TOPIC);
    }

    #[test]
    fn reversed_braces_do_not_panic() {
        let raw = "} backwards {";
        assert_eq!(parse(raw).strategy, Strategy::Raw);
    }
}
