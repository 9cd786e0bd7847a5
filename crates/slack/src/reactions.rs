//! Emoji reaction feedback on delivered suggestions.

use {anyhow::Result, tracing::info};

use chorus_store::{Store, Suggestion, SuggestionStatus};

/// Curation action expressed by a reaction emoji.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackAction {
    Save,
    Rewrite,
    Reject,
}

impl FeedbackAction {
    fn status(self) -> SuggestionStatus {
        match self {
            Self::Save => SuggestionStatus::Saved,
            Self::Rewrite => SuggestionStatus::RewriteRequested,
            Self::Reject => SuggestionStatus::Rejected,
        }
    }
}

/// Map a Slack reaction name to a curation action. Slack reports both the
/// short and long names for the emoji we care about.
#[must_use]
pub fn action_for_reaction(name: &str) -> Option<FeedbackAction> {
    match name {
        "+1" | "thumbsup" => Some(FeedbackAction::Save),
        "repeat" | "arrows_counterclockwise" => Some(FeedbackAction::Rewrite),
        "x" | "negative_squared_cross_mark" => Some(FeedbackAction::Reject),
        _ => None,
    }
}

/// What a reaction did to the suggestion it landed on.
#[derive(Debug, Clone)]
pub enum ReactionOutcome {
    /// Unknown emoji, unrelated message, or a suggestion no longer pending.
    Ignored,
    Saved(Suggestion),
    RewriteRequested(Suggestion),
    Rejected(Suggestion),
}

/// Apply a reaction to whatever suggestion was delivered as `(channel, ts)`.
///
/// Only `pending` suggestions transition; everything else is ignored, so the
/// first reaction wins and later ones are no-ops.
pub async fn apply_reaction(
    store: &dyn Store,
    channel: &str,
    ts: &str,
    reaction: &str,
) -> Result<ReactionOutcome> {
    let Some(action) = action_for_reaction(reaction) else {
        return Ok(ReactionOutcome::Ignored);
    };

    let Some(suggestion) = store.suggestion_by_delivery(channel, ts).await? else {
        return Ok(ReactionOutcome::Ignored);
    };

    if !store.transition_status(suggestion.id, action.status()).await? {
        return Ok(ReactionOutcome::Ignored);
    }
    info!(
        suggestion_id = %suggestion.id,
        status = action.status().as_str(),
        "suggestion transitioned"
    );

    // Re-read so the caller sees the post-transition row.
    let suggestion = store
        .suggestion(suggestion.id)
        .await?
        .unwrap_or(suggestion);

    Ok(match action {
        FeedbackAction::Save => ReactionOutcome::Saved(suggestion),
        FeedbackAction::Rewrite => ReactionOutcome::RewriteRequested(suggestion),
        FeedbackAction::Reject => ReactionOutcome::Rejected(suggestion),
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use chorus_store::{MemoryStore, NewSuggestion};

    use super::*;

    async fn delivered_suggestion(store: &MemoryStore) -> Suggestion {
        let suggestion = store
            .save_suggestion(NewSuggestion {
                channel_id: "C1".into(),
                summary_id: None,
                insight: "Ship smaller".into(),
                why_it_works: "counterintuitive".into(),
                linkedin_draft: "draft".into(),
                x_draft: "draft".into(),
            })
            .await
            .unwrap();
        store
            .set_delivery(suggestion.id, "D42", "1700000000.000100")
            .await
            .unwrap();
        suggestion
    }

    #[test]
    fn reaction_names_map_to_actions() {
        assert_eq!(action_for_reaction("+1"), Some(FeedbackAction::Save));
        assert_eq!(action_for_reaction("thumbsup"), Some(FeedbackAction::Save));
        assert_eq!(action_for_reaction("repeat"), Some(FeedbackAction::Rewrite));
        assert_eq!(
            action_for_reaction("arrows_counterclockwise"),
            Some(FeedbackAction::Rewrite)
        );
        assert_eq!(action_for_reaction("x"), Some(FeedbackAction::Reject));
        assert_eq!(
            action_for_reaction("negative_squared_cross_mark"),
            Some(FeedbackAction::Reject)
        );
        assert_eq!(action_for_reaction("tada"), None);
    }

    #[tokio::test]
    async fn thumbs_up_saves_and_locks_the_suggestion() {
        let store = MemoryStore::new();
        let suggestion = delivered_suggestion(&store).await;

        let outcome = apply_reaction(&store, "D42", "1700000000.000100", "+1").await.unwrap();
        assert!(matches!(outcome, ReactionOutcome::Saved(_)));

        // No further reaction changes its status.
        let outcome = apply_reaction(&store, "D42", "1700000000.000100", "x").await.unwrap();
        assert!(matches!(outcome, ReactionOutcome::Ignored));

        let current = store.suggestion(suggestion.id).await.unwrap().unwrap();
        assert_eq!(current.status, SuggestionStatus::Saved);
    }

    #[tokio::test]
    async fn reactions_on_unrelated_messages_are_ignored() {
        let store = MemoryStore::new();
        let suggestion = delivered_suggestion(&store).await;

        let outcome = apply_reaction(&store, "D42", "1799999999.999999", "+1").await.unwrap();
        assert!(matches!(outcome, ReactionOutcome::Ignored));

        let current = store.suggestion(suggestion.id).await.unwrap().unwrap();
        assert_eq!(current.status, SuggestionStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_emoji_is_ignored() {
        let store = MemoryStore::new();
        delivered_suggestion(&store).await;

        let outcome = apply_reaction(&store, "D42", "1700000000.000100", "tada").await.unwrap();
        assert!(matches!(outcome, ReactionOutcome::Ignored));
    }

    #[tokio::test]
    async fn cross_rejects_pending_suggestion() {
        let store = MemoryStore::new();
        let suggestion = delivered_suggestion(&store).await;

        let outcome = apply_reaction(&store, "D42", "1700000000.000100", "x").await.unwrap();
        assert!(matches!(outcome, ReactionOutcome::Rejected(_)));

        let current = store.suggestion(suggestion.id).await.unwrap().unwrap();
        assert_eq!(current.status, SuggestionStatus::Rejected);
    }
}
