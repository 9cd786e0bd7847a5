//! Post-worthiness detection and idea filtering.

use {
    anyhow::Result,
    tracing::{info, warn},
};

use chorus_llm::{LlmClient, prompts};

use crate::summarizer::ConversationSummary;

const DETECTOR_TEMPERATURE: f32 = 0.4;
const FILTER_TEMPERATURE: f32 = 0.2;

/// A single post-worthy idea extracted from a summary.
#[derive(Debug, Clone)]
pub struct PostIdea {
    pub core_insight: String,
    pub why_it_works: String,
}

/// Result of the post-worthiness check.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub is_post_worthy: bool,
    pub ideas: Vec<PostIdea>,
}

/// Ask the model whether the summary holds anything post-worthy.
pub async fn detect(llm: &dyn LlmClient, summary: &ConversationSummary) -> Result<Detection> {
    let prompt = prompts::post_worthiness(
        &summary.summary,
        &bulleted(&summary.key_ideas),
        &bulleted(&summary.interesting_phrases),
    );
    let result = llm.complete_json(&prompt, DETECTOR_TEMPERATURE).await?;

    let ideas = result["ideas"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|idea| PostIdea {
                    core_insight: crate::summarizer::string_field(idea, "core_insight"),
                    why_it_works: crate::summarizer::string_field(idea, "why_it_works"),
                })
                .filter(|idea| !idea.core_insight.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(Detection {
        is_post_worthy: result["is_post_worthy"].as_bool().unwrap_or(false),
        ideas,
    })
}

/// Whether a new insight repeats one of the already-saved insights.
///
/// Filter failures are non-fatal: an unanswerable dedup check lets the idea
/// through.
pub async fn is_duplicate(
    llm: &dyn LlmClient,
    new_insight: &str,
    existing_insights: &[String],
) -> bool {
    if existing_insights.is_empty() {
        return false;
    }

    let prompt = prompts::deduplication(&bulleted(existing_insights), new_insight);
    match llm.complete_json(&prompt, FILTER_TEMPERATURE).await {
        Ok(result) => {
            let duplicate = result["is_duplicate"].as_bool().unwrap_or(false);
            if duplicate {
                info!(
                    reason = result["reason"].as_str().unwrap_or("n/a"),
                    "duplicate insight detected"
                );
            }
            duplicate
        },
        Err(e) => {
            warn!(error = %e, "dedup check failed, keeping idea");
            false
        },
    }
}

/// Whether an insight leaks something that must not be posted publicly.
///
/// An unanswerable sensitivity check errs on the side of caution and treats
/// the insight as sensitive.
pub async fn is_sensitive(llm: &dyn LlmClient, insight: &str, summary: &str) -> bool {
    let prompt = prompts::sensitivity(insight, summary);
    match llm.complete_json(&prompt, FILTER_TEMPERATURE).await {
        Ok(result) => {
            let sensitive = result["is_sensitive"].as_bool().unwrap_or(false);
            if sensitive {
                warn!(
                    reason = result["reason"].as_str().unwrap_or("n/a"),
                    "sensitive content detected"
                );
            }
            sensitive
        },
        Err(e) => {
            warn!(error = %e, "sensitivity check failed, dropping idea");
            true
        },
    }
}

/// Filter detected ideas against recently saved insights (dedup) and the
/// sensitivity check. Ideas surviving the filter also dedup against each
/// other within the batch.
pub async fn filter_ideas(
    llm: &dyn LlmClient,
    ideas: Vec<PostIdea>,
    summary: &str,
    mut existing_insights: Vec<String>,
) -> Vec<PostIdea> {
    let mut filtered = Vec::new();
    for idea in ideas {
        if is_duplicate(llm, &idea.core_insight, &existing_insights).await {
            continue;
        }
        if is_sensitive(llm, &idea.core_insight, summary).await {
            continue;
        }
        existing_insights.push(idea.core_insight.clone());
        filtered.push(idea);
    }
    filtered
}

fn bulleted(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
