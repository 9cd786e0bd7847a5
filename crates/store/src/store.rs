//! Persistence trait for chorus state.

use {
    anyhow::Result,
    async_trait::async_trait,
    chrono::{DateTime, Duration, Utc},
    uuid::Uuid,
};

use crate::types::{
    MonitoredChannel, NewMessage, NewSuggestion, PipelineRun, StoredMessage, Suggestion,
    SuggestionStatus, SummaryMetadata, SummaryRecord,
};

/// Persistence backend for channels, messages, summaries, suggestions, and
/// pipeline runs.
#[async_trait]
pub trait Store: Send + Sync {
    // ── Monitored channels ───────────────────────────────────────────────

    /// Activate monitoring for a channel. Idempotent: re-activating an
    /// already-active channel refreshes `added_by` without error.
    async fn activate_channel(&self, channel_id: &str, added_by: &str)
    -> Result<MonitoredChannel>;

    /// Deactivate monitoring. Returns `false` when the channel was not
    /// actively monitored (callers surface a friendly message, not an error).
    async fn deactivate_channel(&self, channel_id: &str) -> Result<bool>;

    /// Deactivate every active channel, returning how many were active.
    async fn deactivate_all_channels(&self) -> Result<u64>;

    /// All channels currently under active monitoring.
    async fn active_channels(&self) -> Result<Vec<MonitoredChannel>>;

    /// Whether a channel is actively monitored.
    async fn is_listening(&self, channel_id: &str) -> Result<bool>;

    // ── Message buffer ───────────────────────────────────────────────────

    /// Buffer an inbound message.
    async fn save_message(&self, message: NewMessage) -> Result<StoredMessage>;

    /// Messages for a channel inside the rolling window, oldest first.
    async fn messages_in_window(
        &self,
        channel_id: &str,
        window: Duration,
    ) -> Result<Vec<StoredMessage>>;

    /// Drop a channel's buffered messages after they have been summarized.
    async fn clear_buffer(&self, channel_id: &str) -> Result<u64>;

    // ── Summaries ────────────────────────────────────────────────────────

    async fn save_summary(
        &self,
        channel_id: &str,
        summary: &str,
        metadata: SummaryMetadata,
    ) -> Result<SummaryRecord>;

    // ── Suggestions ──────────────────────────────────────────────────────

    async fn save_suggestion(&self, suggestion: NewSuggestion) -> Result<Suggestion>;

    /// Record where a suggestion's DM landed (channel + message ts).
    async fn set_delivery(&self, id: Uuid, channel: &str, ts: &str) -> Result<()>;

    /// Transition a suggestion out of `pending`. Returns `false` when the
    /// suggestion is unknown or already left `pending` — the transition is
    /// a single conditional update, so a second reaction can never win.
    async fn transition_status(&self, id: Uuid, status: SuggestionStatus) -> Result<bool>;

    async fn suggestion(&self, id: Uuid) -> Result<Option<Suggestion>>;

    /// Look up the suggestion delivered as a given Slack message.
    async fn suggestion_by_delivery(&self, channel: &str, ts: &str) -> Result<Option<Suggestion>>;

    /// Suggestions created at or after `since`, in creation order.
    async fn suggestions_since(&self, since: DateTime<Utc>) -> Result<Vec<Suggestion>>;

    /// Most recently saved suggestions, newest first.
    async fn saved_suggestions(&self, limit: u32) -> Result<Vec<Suggestion>>;

    // ── Pipeline runs ────────────────────────────────────────────────────

    async fn append_run(&self, run: &PipelineRun) -> Result<()>;

    /// Most recent runs, newest first.
    async fn recent_runs(&self, limit: u32) -> Result<Vec<PipelineRun>>;
}
