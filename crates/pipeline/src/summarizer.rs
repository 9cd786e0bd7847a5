//! Conversation summarization stage.

use {anyhow::Result, tracing::info};

use {
    chorus_llm::{LlmClient, prompts},
    chorus_store::StoredMessage,
};

use crate::buffer::format_messages;

const SUMMARIZER_TEMPERATURE: f32 = 0.3;

/// Structured output of the summarization stage.
#[derive(Debug, Clone, Default)]
pub struct ConversationSummary {
    pub summary: String,
    pub key_ideas: Vec<String>,
    pub opinions: Vec<String>,
    pub decisions: Vec<String>,
    pub interesting_phrases: Vec<String>,
}

/// Summarize a message window.
///
/// Returns `None` when the model finds nothing worth summarizing (empty
/// summary text); callers clear the buffer and move on.
pub async fn summarize(
    llm: &dyn LlmClient,
    messages: &[StoredMessage],
) -> Result<Option<ConversationSummary>> {
    if messages.is_empty() {
        return Ok(None);
    }

    let prompt = prompts::summarizer(&format_messages(messages));
    let result = llm.complete_json(&prompt, SUMMARIZER_TEMPERATURE).await?;

    let summary = ConversationSummary {
        summary: string_field(&result, "summary"),
        key_ideas: list_field(&result, "key_ideas"),
        opinions: list_field(&result, "opinions"),
        decisions: list_field(&result, "decisions"),
        interesting_phrases: list_field(&result, "interesting_phrases"),
    };

    if summary.summary.is_empty() {
        return Ok(None);
    }

    info!(key_ideas = summary.key_ideas.len(), "generated summary");
    Ok(Some(summary))
}

pub(crate) fn string_field(value: &serde_json::Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

pub(crate) fn list_field(value: &serde_json::Value, key: &str) -> Vec<String> {
    value[key]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn field_helpers_tolerate_missing_keys() {
        let value = json!({ "summary": "talked about launches", "key_ideas": ["ship smaller", 42] });
        assert_eq!(string_field(&value, "summary"), "talked about launches");
        assert_eq!(string_field(&value, "missing"), "");
        assert_eq!(list_field(&value, "key_ideas"), vec!["ship smaller"]);
        assert!(list_field(&value, "opinions").is_empty());
    }
}
