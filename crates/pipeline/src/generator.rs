//! Platform-specific draft generation and cleanup.

use std::sync::LazyLock;

use {regex::Regex, tracing::error};

use chorus_llm::{CompletionParams, LlmClient, prompts};

use crate::detector::PostIdea;

const X_MAX_CHARS: usize = 280;

#[allow(clippy::unwrap_used)]
static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        "[\u{1F600}-\u{1F64F}",
        "\u{1F300}-\u{1F5FF}",
        "\u{1F680}-\u{1F6FF}",
        "\u{1F1E0}-\u{1F1FF}",
        "\u{2702}-\u{27B0}",
        "\u{24C2}-\u{1F251}]+",
    ))
    .unwrap()
});

#[allow(clippy::unwrap_used)]
static HASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\w+\s*").unwrap());

#[allow(clippy::unwrap_used)]
static EXCESS_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Drafts produced for one insight.
#[derive(Debug, Clone, Default)]
pub struct GeneratedContent {
    pub core_insight: String,
    pub why_it_works: String,
    pub linkedin_draft: String,
    pub x_draft: String,
}

impl GeneratedContent {
    /// Both drafts came back usable.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.linkedin_draft.is_empty() && !self.x_draft.is_empty()
    }
}

/// Generate LinkedIn and X drafts for an idea. Failed generations leave the
/// corresponding draft empty; callers skip incomplete content.
pub async fn generate(llm: &dyn LlmClient, idea: &PostIdea, summary: &str) -> GeneratedContent {
    let linkedin_prompt = prompts::linkedin(&idea.core_insight, &idea.why_it_works, summary);
    let linkedin_draft = match llm
        .complete(&linkedin_prompt, CompletionParams {
            temperature: 0.7,
            max_tokens: 1000,
        })
        .await
    {
        Ok(draft) => clean_linkedin_draft(&draft),
        Err(e) => {
            error!(error = %e, "failed to generate LinkedIn draft");
            String::new()
        },
    };

    let x_prompt = prompts::x_post(&idea.core_insight);
    let x_draft = match llm
        .complete(&x_prompt, CompletionParams {
            temperature: 0.8,
            max_tokens: 100,
        })
        .await
    {
        Ok(draft) => clean_x_draft(&draft),
        Err(e) => {
            error!(error = %e, "failed to generate X draft");
            String::new()
        },
    };

    GeneratedContent {
        core_insight: idea.core_insight.clone(),
        why_it_works: idea.why_it_works.clone(),
        linkedin_draft,
        x_draft,
    }
}

/// Rewrite both drafts with a fresh angle. Failed rewrites fall back to the
/// original draft.
pub async fn rewrite(
    llm: &dyn LlmClient,
    original_linkedin: &str,
    original_x: &str,
    core_insight: &str,
    summary: &str,
) -> (String, String) {
    let linkedin_prompt = prompts::rewrite_linkedin(original_linkedin, core_insight, summary);
    let linkedin_draft = match llm
        .complete(&linkedin_prompt, CompletionParams {
            temperature: 0.8,
            max_tokens: 1000,
        })
        .await
    {
        Ok(draft) => clean_linkedin_draft(&draft),
        Err(e) => {
            error!(error = %e, "failed to rewrite LinkedIn draft");
            original_linkedin.to_string()
        },
    };

    let x_prompt = prompts::rewrite_x(original_x, core_insight);
    let x_draft = match llm
        .complete(&x_prompt, CompletionParams {
            temperature: 0.9,
            max_tokens: 100,
        })
        .await
    {
        Ok(draft) => clean_x_draft(&draft),
        Err(e) => {
            error!(error = %e, "failed to rewrite X draft");
            original_x.to_string()
        },
    };

    (linkedin_draft, x_draft)
}

/// Strip emojis and hashtags the model slipped in and collapse runs of blank
/// lines.
#[must_use]
pub fn clean_linkedin_draft(draft: &str) -> String {
    let draft = EMOJI.replace_all(draft, "");
    let draft = HASHTAG.replace_all(&draft, "");
    let draft = EXCESS_BLANK_LINES.replace_all(&draft, "\n\n");
    draft.trim().to_string()
}

/// Strip hashtags and emojis and enforce the 280-character ceiling.
#[must_use]
pub fn clean_x_draft(draft: &str) -> String {
    let draft = HASHTAG.replace_all(draft, "");
    let draft = EMOJI.replace_all(&draft, "");
    let draft = draft.trim();

    if draft.chars().count() > X_MAX_CHARS {
        let truncated: String = draft.chars().take(X_MAX_CHARS - 3).collect();
        return format!("{}...", truncated.trim_end());
    }
    draft.to_string()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linkedin_cleanup_strips_emoji_and_hashtags() {
        let raw = "We shipped too much. \u{1F680}\n\n\n\nLess is a feature. #startups #building";
        let cleaned = clean_linkedin_draft(raw);
        assert_eq!(cleaned, "We shipped too much.\n\nLess is a feature.");
    }

    #[test]
    fn x_cleanup_truncates_to_280_chars() {
        let raw = "a".repeat(400);
        let cleaned = clean_x_draft(&raw);
        assert_eq!(cleaned.chars().count(), 280);
        assert!(cleaned.ends_with("..."));
    }

    #[test]
    fn x_cleanup_keeps_short_drafts_intact() {
        let cleaned = clean_x_draft("Ship smaller. #advice");
        assert_eq!(cleaned, "Ship smaller.");
    }

    #[test]
    fn x_cleanup_is_char_boundary_safe() {
        // Multibyte content longer than the ceiling must not panic.
        let raw = "\u{00E9}".repeat(300);
        let cleaned = clean_x_draft(&raw);
        assert_eq!(cleaned.chars().count(), 280);
    }
}
