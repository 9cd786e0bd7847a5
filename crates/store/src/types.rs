//! Core data types persisted by the store.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

/// A channel under active (or previously active) monitoring.
///
/// One row per channel; "stop listening" flips `is_active` instead of
/// deleting, so a channel has at most one monitoring record at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredChannel {
    pub channel_id: String,
    /// User who issued the most recent "start listening".
    pub added_by: String,
    pub is_active: bool,
    pub started_at: DateTime<Utc>,
}

/// Input for buffering an inbound channel message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub channel_id: String,
    pub author_id: String,
    pub text: String,
    pub posted_at: DateTime<Utc>,
}

/// A buffered channel message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub channel_id: String,
    pub author_id: String,
    pub text: String,
    pub posted_at: DateTime<Utc>,
}

/// Structured extras stored alongside a conversation summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryMetadata {
    pub key_ideas: Vec<String>,
    pub opinions: Vec<String>,
    pub decisions: Vec<String>,
    pub interesting_phrases: Vec<String>,
    pub message_count: i64,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
}

/// A persisted conversation summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: Uuid,
    pub channel_id: String,
    pub summary: String,
    pub metadata: SummaryMetadata,
    pub created_at: DateTime<Utc>,
}

/// Curation state of a suggestion. Reactions only move suggestions that are
/// still `Pending`; rows are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
    Saved,
    RewriteRequested,
    Rejected,
}

impl SuggestionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Saved => "saved",
            Self::RewriteRequested => "rewrite_requested",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "saved" => Some(Self::Saved),
            "rewrite_requested" => Some(Self::RewriteRequested),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Input for persisting a freshly generated suggestion.
#[derive(Debug, Clone)]
pub struct NewSuggestion {
    pub channel_id: String,
    pub summary_id: Option<Uuid>,
    pub insight: String,
    pub why_it_works: String,
    pub linkedin_draft: String,
    pub x_draft: String,
}

/// A drafted social post awaiting curation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub channel_id: String,
    pub summary_id: Option<Uuid>,
    pub insight: String,
    pub why_it_works: String,
    pub linkedin_draft: String,
    pub x_draft: String,
    pub status: SuggestionStatus,
    /// DM channel the suggestion was delivered to, set after send.
    pub delivery_channel: Option<String>,
    /// Slack ts of the delivered message; reactions are matched against it.
    pub delivery_ts: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What started a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    Scheduled,
    Manual,
}

impl RunTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scheduled" => Some(Self::Scheduled),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Outcome of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Error,
    Skipped,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ok" => Some(Self::Ok),
            "error" => Some(Self::Error),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// Record of a completed pipeline run. Failures surface here (and through
/// the status API), never in the founder's DMs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub trigger: RunTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub error: Option<String>,
    pub suggestion_count: i64,
}
