//! In-memory store for testing.

use std::{collections::HashMap, sync::Mutex};

use {
    anyhow::Result,
    async_trait::async_trait,
    chrono::{DateTime, Duration, Utc},
    uuid::Uuid,
};

use crate::{
    store::Store,
    types::{
        MonitoredChannel, NewMessage, NewSuggestion, PipelineRun, StoredMessage, Suggestion,
        SuggestionStatus, SummaryMetadata, SummaryRecord,
    },
};

/// In-memory store backed by `HashMap`s and `Vec`s. No persistence — for
/// tests only.
#[derive(Default)]
pub struct MemoryStore {
    channels: Mutex<HashMap<String, MonitoredChannel>>,
    messages: Mutex<Vec<StoredMessage>>,
    summaries: Mutex<Vec<SummaryRecord>>,
    suggestions: Mutex<Vec<Suggestion>>,
    runs: Mutex<Vec<PipelineRun>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn activate_channel(
        &self,
        channel_id: &str,
        added_by: &str,
    ) -> Result<MonitoredChannel> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let entry = channels
            .entry(channel_id.to_string())
            .or_insert_with(|| MonitoredChannel {
                channel_id: channel_id.to_string(),
                added_by: added_by.to_string(),
                is_active: true,
                started_at: Utc::now(),
            });
        if !entry.is_active {
            entry.is_active = true;
            entry.started_at = Utc::now();
        }
        entry.added_by = added_by.to_string();
        Ok(entry.clone())
    }

    async fn deactivate_channel(&self, channel_id: &str) -> Result<bool> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        match channels.get_mut(channel_id) {
            Some(channel) if channel.is_active => {
                channel.is_active = false;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn deactivate_all_channels(&self) -> Result<u64> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let mut count = 0;
        for channel in channels.values_mut() {
            if channel.is_active {
                channel.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn active_channels(&self) -> Result<Vec<MonitoredChannel>> {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let mut active: Vec<_> = channels.values().filter(|c| c.is_active).cloned().collect();
        active.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        Ok(active)
    }

    async fn is_listening(&self, channel_id: &str) -> Result<bool> {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        Ok(channels.get(channel_id).is_some_and(|c| c.is_active))
    }

    async fn save_message(&self, message: NewMessage) -> Result<StoredMessage> {
        let stored = StoredMessage {
            id: Uuid::new_v4(),
            channel_id: message.channel_id,
            author_id: message.author_id,
            text: message.text,
            posted_at: message.posted_at,
        };
        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        messages.push(stored.clone());
        Ok(stored)
    }

    async fn messages_in_window(
        &self,
        channel_id: &str,
        window: Duration,
    ) -> Result<Vec<StoredMessage>> {
        let cutoff = Utc::now() - window;
        let messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        let mut in_window: Vec<_> = messages
            .iter()
            .filter(|m| m.channel_id == channel_id && m.posted_at >= cutoff)
            .cloned()
            .collect();
        in_window.sort_by_key(|m| m.posted_at);
        Ok(in_window)
    }

    async fn clear_buffer(&self, channel_id: &str) -> Result<u64> {
        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        let before = messages.len();
        messages.retain(|m| m.channel_id != channel_id);
        Ok((before - messages.len()) as u64)
    }

    async fn save_summary(
        &self,
        channel_id: &str,
        summary: &str,
        metadata: SummaryMetadata,
    ) -> Result<SummaryRecord> {
        let record = SummaryRecord {
            id: Uuid::new_v4(),
            channel_id: channel_id.to_string(),
            summary: summary.to_string(),
            metadata,
            created_at: Utc::now(),
        };
        let mut summaries = self.summaries.lock().unwrap_or_else(|e| e.into_inner());
        summaries.push(record.clone());
        Ok(record)
    }

    async fn save_suggestion(&self, suggestion: NewSuggestion) -> Result<Suggestion> {
        let stored = Suggestion {
            id: Uuid::new_v4(),
            channel_id: suggestion.channel_id,
            summary_id: suggestion.summary_id,
            insight: suggestion.insight,
            why_it_works: suggestion.why_it_works,
            linkedin_draft: suggestion.linkedin_draft,
            x_draft: suggestion.x_draft,
            status: SuggestionStatus::Pending,
            delivery_channel: None,
            delivery_ts: None,
            created_at: Utc::now(),
        };
        let mut suggestions = self.suggestions.lock().unwrap_or_else(|e| e.into_inner());
        suggestions.push(stored.clone());
        Ok(stored)
    }

    async fn set_delivery(&self, id: Uuid, channel: &str, ts: &str) -> Result<()> {
        let mut suggestions = self.suggestions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(suggestion) = suggestions.iter_mut().find(|s| s.id == id) {
            suggestion.delivery_channel = Some(channel.to_string());
            suggestion.delivery_ts = Some(ts.to_string());
        }
        Ok(())
    }

    async fn transition_status(&self, id: Uuid, status: SuggestionStatus) -> Result<bool> {
        let mut suggestions = self.suggestions.lock().unwrap_or_else(|e| e.into_inner());
        match suggestions
            .iter_mut()
            .find(|s| s.id == id && s.status == SuggestionStatus::Pending)
        {
            Some(suggestion) => {
                suggestion.status = status;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn suggestion(&self, id: Uuid) -> Result<Option<Suggestion>> {
        let suggestions = self.suggestions.lock().unwrap_or_else(|e| e.into_inner());
        Ok(suggestions.iter().find(|s| s.id == id).cloned())
    }

    async fn suggestion_by_delivery(&self, channel: &str, ts: &str) -> Result<Option<Suggestion>> {
        let suggestions = self.suggestions.lock().unwrap_or_else(|e| e.into_inner());
        Ok(suggestions
            .iter()
            .find(|s| {
                s.delivery_channel.as_deref() == Some(channel)
                    && s.delivery_ts.as_deref() == Some(ts)
            })
            .cloned())
    }

    async fn suggestions_since(&self, since: DateTime<Utc>) -> Result<Vec<Suggestion>> {
        let suggestions = self.suggestions.lock().unwrap_or_else(|e| e.into_inner());
        let mut recent: Vec<_> = suggestions
            .iter()
            .filter(|s| s.created_at >= since)
            .cloned()
            .collect();
        recent.sort_by_key(|s| s.created_at);
        Ok(recent)
    }

    async fn saved_suggestions(&self, limit: u32) -> Result<Vec<Suggestion>> {
        let suggestions = self.suggestions.lock().unwrap_or_else(|e| e.into_inner());
        let mut saved: Vec<_> = suggestions
            .iter()
            .filter(|s| s.status == SuggestionStatus::Saved)
            .cloned()
            .collect();
        saved.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        saved.truncate(limit as usize);
        Ok(saved)
    }

    async fn append_run(&self, run: &PipelineRun) -> Result<()> {
        let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        runs.push(run.clone());
        Ok(())
    }

    async fn recent_runs(&self, limit: u32) -> Result<Vec<PipelineRun>> {
        let runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        let mut recent: Vec<_> = runs.clone();
        recent.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        recent.truncate(limit as usize);
        Ok(recent)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::types::{RunStatus, RunTrigger},
    };

    fn make_suggestion(channel_id: &str) -> NewSuggestion {
        NewSuggestion {
            channel_id: channel_id.into(),
            summary_id: None,
            insight: "ship smaller".into(),
            why_it_works: "counterintuitive".into(),
            linkedin_draft: "Shipping less taught us more.".into(),
            x_draft: "Ship smaller.".into(),
        }
    }

    #[tokio::test]
    async fn start_then_stop_leaves_channel_inactive() {
        let store = MemoryStore::new();
        store.activate_channel("C1", "U1").await.unwrap();
        assert!(store.is_listening("C1").await.unwrap());

        assert!(store.deactivate_channel("C1").await.unwrap());
        assert!(!store.is_listening("C1").await.unwrap());
        assert!(store.active_channels().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_start_is_idempotent() {
        let store = MemoryStore::new();
        store.activate_channel("C1", "U1").await.unwrap();
        let again = store.activate_channel("C1", "U2").await.unwrap();
        assert!(again.is_active);
        assert_eq!(store.active_channels().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deactivate_unknown_channel_is_noop() {
        let store = MemoryStore::new();
        assert!(!store.deactivate_channel("C404").await.unwrap());
    }

    #[tokio::test]
    async fn reactivation_keeps_single_record() {
        let store = MemoryStore::new();
        store.activate_channel("C1", "U1").await.unwrap();
        store.deactivate_channel("C1").await.unwrap();
        store.activate_channel("C1", "U1").await.unwrap();
        let active = store.active_channels().await.unwrap();
        assert_eq!(active.len(), 1);
        assert!(active[0].is_active);
    }

    #[tokio::test]
    async fn transition_only_applies_to_pending() {
        let store = MemoryStore::new();
        let suggestion = store.save_suggestion(make_suggestion("C1")).await.unwrap();
        assert_eq!(suggestion.status, SuggestionStatus::Pending);

        assert!(
            store
                .transition_status(suggestion.id, SuggestionStatus::Saved)
                .await
                .unwrap()
        );
        // A later reaction must not move it again.
        assert!(
            !store
                .transition_status(suggestion.id, SuggestionStatus::Rejected)
                .await
                .unwrap()
        );
        let current = store.suggestion(suggestion.id).await.unwrap().unwrap();
        assert_eq!(current.status, SuggestionStatus::Saved);
    }

    #[tokio::test]
    async fn delivery_lookup_matches_exact_message() {
        let store = MemoryStore::new();
        let suggestion = store.save_suggestion(make_suggestion("C1")).await.unwrap();
        store
            .set_delivery(suggestion.id, "D999", "1700000000.000100")
            .await
            .unwrap();

        let hit = store
            .suggestion_by_delivery("D999", "1700000000.000100")
            .await
            .unwrap();
        assert_eq!(hit.map(|s| s.id), Some(suggestion.id));

        let miss = store
            .suggestion_by_delivery("D999", "1700000000.000200")
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn suggestions_since_returns_creation_order() {
        let store = MemoryStore::new();
        let first = store.save_suggestion(make_suggestion("C1")).await.unwrap();
        let second = store.save_suggestion(make_suggestion("C1")).await.unwrap();
        let since = first.created_at - Duration::seconds(1);

        let listed = store.suggestions_since(since).await.unwrap();
        assert_eq!(
            listed.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
    }

    #[tokio::test]
    async fn clear_buffer_only_touches_one_channel() {
        let store = MemoryStore::new();
        for channel in ["C1", "C1", "C2"] {
            store
                .save_message(NewMessage {
                    channel_id: channel.into(),
                    author_id: "U1".into(),
                    text: "hello".into(),
                    posted_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.clear_buffer("C1").await.unwrap(), 2);
        let remaining = store
            .messages_in_window("C2", Duration::minutes(60))
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn recent_runs_newest_first() {
        let store = MemoryStore::new();
        for i in 0..3 {
            let started = Utc::now() - Duration::minutes(10 - i);
            store
                .append_run(&PipelineRun {
                    id: Uuid::new_v4(),
                    trigger: RunTrigger::Scheduled,
                    started_at: started,
                    finished_at: started + Duration::seconds(5),
                    status: RunStatus::Ok,
                    error: None,
                    suggestion_count: i,
                })
                .await
                .unwrap();
        }
        let runs = store.recent_runs(2).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].suggestion_count, 2);
    }
}
