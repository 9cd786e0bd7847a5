//! The suggestion pipeline: buffer readiness, summarization, post-worthiness
//! detection, draft generation, and the orchestrator that ties the stages to
//! the store and the delivery sink.

pub mod buffer;
pub mod detector;
pub mod generator;
pub mod pipeline;
pub mod summarizer;

pub use pipeline::ContentPipeline;
use {anyhow::Result, async_trait::async_trait, chorus_store::Suggestion};

/// Where a delivered suggestion landed in Slack.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub channel: String,
    pub ts: String,
}

/// Sink that puts a drafted suggestion in front of the founder — the slack
/// crate provides the concrete implementation.
#[async_trait]
pub trait SuggestionDelivery: Send + Sync {
    /// Deliver one suggestion and return where the message landed, so
    /// reactions on it can be matched back to the suggestion.
    async fn deliver(&self, suggestion: &Suggestion) -> Result<DeliveryReceipt>;
}
