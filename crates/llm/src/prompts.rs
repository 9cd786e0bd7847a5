//! Prompt templates for every LLM interaction.
//!
//! Templates are plain `format!` builders; JSON braces in the expected
//! response shapes are escaped accordingly.

/// Global system prompt sent with every completion.
pub const SYSTEM_PROMPT: &str = "\
You are a quiet observer embedded in a founding team's daily Slack.

You watch everything - product debates, growth experiments, hiring \
frustrations, random jokes, code snippets, late-night rabbit holes, \
half-baked ideas, and the occasional existential crisis.

Your job is to notice when something genuinely interesting surfaces. Not \
manufactured insights - the real stuff that emerges organically when smart \
people are just talking.

You have taste. You know the difference between a throwaway comment and a \
hard-won realization. You never force content. Most conversations are just \
conversations. But sometimes someone says something worth sharing - and you \
catch it.";

/// Conversation summarization prompt.
#[must_use]
pub fn summarizer(messages: &str) -> String {
    format!(
        "Summarize the following Slack conversation from a founding team.\n\n\
         This could be anything - product strategy, growth experiments, technical \
         debates, hiring rants, random tangents, jokes, or just people thinking out \
         loud. Treat it all as raw material.\n\n\
         Extract:\n\
         - Key ideas discussed (product, growth, tech, team, whatever came up)\n\
         - Opinions or strong views (even if casual or half-joking)\n\
         - Decisions made (if any)\n\
         - Interesting phrasing, metaphors, or turns of phrase\n\
         - Any hard-won realizations or \"aha\" moments\n\n\
         Be concise but insightful. Capture the texture of the conversation.\n\n\
         Conversation:\n{messages}\n\n\
         Respond with a JSON object in this exact format:\n\
         {{\n\
           \"summary\": \"A concise summary of the conversation\",\n\
           \"key_ideas\": [\"idea 1\", \"idea 2\"],\n\
           \"opinions\": [\"opinion 1\", \"opinion 2\"],\n\
           \"decisions\": [\"decision 1\"],\n\
           \"interesting_phrases\": [\"phrase 1\", \"phrase 2\"]\n\
         }}"
    )
}

/// Post-worthiness detection prompt.
#[must_use]
pub fn post_worthiness(summary: &str, key_ideas: &str, interesting_phrases: &str) -> String {
    format!(
        "Based on the summary below, decide if there is any post-worthy insight.\n\n\
         A post-worthy insight is:\n\
         - Founder-relevant\n\
         - Non-obvious\n\
         - Opinionated or reflective\n\
         - Something others would save or share\n\n\
         If nothing qualifies, return:\n\
         {{ \"is_post_worthy\": false, \"ideas\": [] }}\n\n\
         If something qualifies, return structured ideas.\n\n\
         Summary:\n{summary}\n\n\
         Key ideas from conversation:\n{key_ideas}\n\n\
         Interesting phrases:\n{interesting_phrases}\n\n\
         Respond with a JSON object in this exact format:\n\
         {{\n\
           \"is_post_worthy\": true,\n\
           \"ideas\": [\n\
             {{\n\
               \"core_insight\": \"The main insight in one clear sentence\",\n\
               \"why_it_works\": \"Why this would resonate with founders\"\n\
             }}\n\
           ]\n\
         }}\n\n\
         Only include genuinely interesting insights. Quality over quantity."
    )
}

/// LinkedIn post generation prompt.
#[must_use]
pub fn linkedin(core_insight: &str, why_it_works: &str, summary: &str) -> String {
    format!(
        "Write a LinkedIn post in the voice of a thoughtful founder.\n\n\
         Guidelines:\n\
         - 5\u{2013}8 short paragraphs\n\
         - Plainspoken, honest\n\
         - No emojis\n\
         - No marketing language\n\
         - No hashtags\n\
         - End with a reflective question\n\n\
         Insight:\n{core_insight}\n\n\
         Context:\n{summary}\n\n\
         Why this works:\n{why_it_works}\n\n\
         Write the post directly, no preamble or explanation. Just the post content."
    )
}

/// X/Twitter post generation prompt.
#[must_use]
pub fn x_post(core_insight: &str) -> String {
    format!(
        "Write a Twitter/X post.\n\n\
         Guidelines:\n\
         - Max 280 characters\n\
         - Direct and opinionated\n\
         - Founder-to-founder tone\n\
         - No hashtags unless essential\n\
         - No emojis\n\n\
         Insight:\n{core_insight}\n\n\
         Write the post directly, no preamble or explanation. Just the tweet."
    )
}

/// LinkedIn rewrite prompt (fresh angle).
#[must_use]
pub fn rewrite_linkedin(original_draft: &str, core_insight: &str, summary: &str) -> String {
    format!(
        "Rewrite this LinkedIn post with a fresh angle.\n\n\
         Original post:\n{original_draft}\n\n\
         Core insight:\n{core_insight}\n\n\
         Context:\n{summary}\n\n\
         Guidelines:\n\
         - 5\u{2013}8 short paragraphs\n\
         - Plainspoken, honest\n\
         - No emojis\n\
         - No marketing language\n\
         - No hashtags\n\
         - End with a reflective question\n\
         - Take a DIFFERENT angle than the original\n\n\
         Write the post directly, no preamble or explanation."
    )
}

/// X rewrite prompt (fresh angle).
#[must_use]
pub fn rewrite_x(original_draft: &str, core_insight: &str) -> String {
    format!(
        "Rewrite this tweet with a fresh angle.\n\n\
         Original tweet:\n{original_draft}\n\n\
         Core insight:\n{core_insight}\n\n\
         Guidelines:\n\
         - Max 280 characters\n\
         - Direct and opinionated\n\
         - Founder-to-founder tone\n\
         - No hashtags unless essential\n\
         - No emojis\n\
         - Take a DIFFERENT angle than the original\n\n\
         Write the tweet directly, no preamble or explanation."
    )
}

/// Duplicate-insight check prompt.
#[must_use]
pub fn deduplication(existing_insights: &str, new_insight: &str) -> String {
    format!(
        "Compare these insights and determine if the new insight is too similar \
         to any existing ones.\n\n\
         Existing insights:\n{existing_insights}\n\n\
         New insight:\n{new_insight}\n\n\
         Return JSON:\n\
         {{\n\
           \"is_duplicate\": true/false,\n\
           \"reason\": \"Brief explanation if duplicate\"\n\
         }}\n\n\
         Only mark as duplicate if the core idea is essentially the same."
    )
}

/// Sensitive-content check prompt.
#[must_use]
pub fn sensitivity(insight: &str, summary: &str) -> String {
    format!(
        "Review this insight for any sensitive or private information that \
         should NOT be shared publicly.\n\n\
         Insight:\n{insight}\n\n\
         Context summary:\n{summary}\n\n\
         Check for:\n\
         - Personal financial details\n\
         - Health information\n\
         - Private business metrics (revenue, runway, etc.)\n\
         - Names of people who haven't consented\n\
         - Confidential deal or partnership details\n\
         - Anything that could harm someone's reputation\n\n\
         Return JSON:\n\
         {{\n\
           \"is_sensitive\": true/false,\n\
           \"reason\": \"Explanation if sensitive\"\n\
         }}"
    )
}
