//! Pipeline orchestrator: runs the staged sequence over every monitored
//! channel, records run history, and owns the interval scheduler.

use std::sync::Arc;

use {
    anyhow::Result,
    chrono::{DateTime, Duration, NaiveTime, Utc},
    tokio::{sync::Mutex, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    uuid::Uuid,
};

use {
    chorus_config::PipelineConfig,
    chorus_llm::LlmClient,
    chorus_store::{
        NewSuggestion, PipelineRun, RunStatus, RunTrigger, Store, Suggestion, SummaryMetadata,
    },
};

use crate::{SuggestionDelivery, buffer, detector, generator, summarizer};

/// How many saved insights are fed to the dedup filter.
const DEDUP_LOOKBACK: u32 = 20;

/// Orchestrates buffer → summary → detection → generation → delivery.
pub struct ContentPipeline {
    store: Arc<dyn Store>,
    llm: Arc<dyn LlmClient>,
    delivery: Arc<dyn SuggestionDelivery>,
    config: PipelineConfig,
    /// Serializes runs so a manual trigger cannot overlap a scheduled one.
    run_lock: Mutex<()>,
}

impl ContentPipeline {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        llm: Arc<dyn LlmClient>,
        delivery: Arc<dyn SuggestionDelivery>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            llm,
            delivery,
            config,
            run_lock: Mutex::new(()),
        }
    }

    fn window(&self) -> Duration {
        Duration::minutes(self.config.buffer_window_minutes)
    }

    fn today_start() -> DateTime<Utc> {
        Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
    }

    /// Process every monitored channel and record the run.
    pub async fn run(&self, trigger: RunTrigger) -> Result<PipelineRun> {
        let _guard = self.run_lock.lock().await;
        let started_at = Utc::now();
        info!(trigger = trigger.as_str(), "pipeline run starting");

        let channels = self.store.active_channels().await?;
        let mut suggestion_count: i64 = 0;
        let mut first_error: Option<String> = None;

        for channel in &channels {
            match self.process_channel(&channel.channel_id, true).await {
                Ok(created) => suggestion_count += created.len() as i64,
                Err(e) => {
                    error!(channel_id = %channel.channel_id, error = %e, "channel processing failed");
                    if first_error.is_none() {
                        first_error = Some(format!("{}: {e:#}", channel.channel_id));
                    }
                },
            }
        }

        let status = if channels.is_empty() {
            RunStatus::Skipped
        } else if first_error.is_some() {
            RunStatus::Error
        } else {
            RunStatus::Ok
        };

        let run = PipelineRun {
            id: Uuid::new_v4(),
            trigger,
            started_at,
            finished_at: Utc::now(),
            status,
            error: first_error,
            suggestion_count,
        };
        self.store.append_run(&run).await?;
        info!(
            status = run.status.as_str(),
            suggestions = run.suggestion_count,
            "pipeline run finished"
        );
        Ok(run)
    }

    /// Volume-threshold entry point, called after a message is buffered.
    /// Only fires once the channel holds enough messages to summarize.
    pub async fn process_on_volume(&self, channel_id: &str) {
        let count = match self
            .store
            .messages_in_window(channel_id, self.window())
            .await
        {
            Ok(messages) => messages.len(),
            Err(e) => {
                error!(channel_id, error = %e, "failed to read message buffer");
                return;
            },
        };

        if !buffer::readiness(count, self.config.min_messages_for_summary, false).is_ready() {
            return;
        }

        info!(channel_id, count, "volume threshold reached");
        if let Err(e) = self.process_channel(channel_id, false).await {
            error!(channel_id, error = %e, "volume-triggered processing failed");
        }
    }

    /// Run the staged sequence for one channel. Returns the suggestions
    /// created (already persisted and delivered), in creation order.
    pub async fn process_channel(
        &self,
        channel_id: &str,
        window_elapsed: bool,
    ) -> Result<Vec<Suggestion>> {
        let messages = self
            .store
            .messages_in_window(channel_id, self.window())
            .await?;
        info!(
            channel_id,
            buffered = messages.len(),
            needed = self.config.min_messages_for_summary,
            "checking channel buffer"
        );

        let readiness = buffer::readiness(
            messages.len(),
            self.config.min_messages_for_summary,
            window_elapsed,
        );
        if !readiness.is_ready() {
            info!(channel_id, "channel not ready, skipping");
            return Ok(Vec::new());
        }

        let today = self.store.suggestions_since(Self::today_start()).await?;
        if today.len() >= self.config.max_suggestions_per_day {
            info!(channel_id, "daily suggestion limit reached");
            return Ok(Vec::new());
        }

        // Stage 1: summarize the window.
        let Some(summary) = summarizer::summarize(self.llm.as_ref(), &messages).await? else {
            info!(channel_id, "no meaningful summary, clearing buffer");
            self.store.clear_buffer(channel_id).await?;
            return Ok(Vec::new());
        };

        let metadata = SummaryMetadata {
            key_ideas: summary.key_ideas.clone(),
            opinions: summary.opinions.clone(),
            decisions: summary.decisions.clone(),
            interesting_phrases: summary.interesting_phrases.clone(),
            message_count: messages.len() as i64,
            window_start: messages.first().map(|m| m.posted_at),
            window_end: messages.last().map(|m| m.posted_at),
        };
        let summary_record = self
            .store
            .save_summary(channel_id, &summary.summary, metadata)
            .await?;
        self.store.clear_buffer(channel_id).await?;

        // Stage 2: detect post-worthy insights.
        let detection = detector::detect(self.llm.as_ref(), &summary).await?;
        if !detection.is_post_worthy || detection.ideas.is_empty() {
            info!(channel_id, "no post-worthy insights");
            return Ok(Vec::new());
        }

        // Stage 3: filter for duplicates and sensitive content.
        let existing_insights: Vec<String> = self
            .store
            .saved_suggestions(DEDUP_LOOKBACK)
            .await?
            .into_iter()
            .map(|s| s.insight)
            .collect();
        let filtered = detector::filter_ideas(
            self.llm.as_ref(),
            detection.ideas,
            &summary.summary,
            existing_insights,
        )
        .await;
        if filtered.is_empty() {
            info!(channel_id, "all ideas filtered out");
            return Ok(Vec::new());
        }

        // Stage 4: generate drafts and persist, respecting the daily cap.
        let remaining_slots = self.config.max_suggestions_per_day - today.len();
        let mut created = Vec::new();
        for idea in filtered.into_iter().take(remaining_slots) {
            let content = generator::generate(self.llm.as_ref(), &idea, &summary.summary).await;
            if !content.is_complete() {
                warn!(
                    channel_id,
                    insight = %idea.core_insight,
                    "draft generation incomplete, skipping idea"
                );
                continue;
            }

            let suggestion = self
                .store
                .save_suggestion(NewSuggestion {
                    channel_id: channel_id.to_string(),
                    summary_id: Some(summary_record.id),
                    insight: content.core_insight,
                    why_it_works: content.why_it_works,
                    linkedin_draft: content.linkedin_draft,
                    x_draft: content.x_draft,
                })
                .await?;
            info!(channel_id, suggestion_id = %suggestion.id, "created suggestion");

            self.deliver(&suggestion).await;
            created.push(suggestion);
        }

        Ok(created)
    }

    /// Regenerate drafts for a suggestion with a fresh angle, persist the
    /// result as a new `pending` suggestion, and deliver it.
    pub async fn rewrite_suggestion(&self, original: &Suggestion) -> Result<Suggestion> {
        let (linkedin_draft, x_draft) = generator::rewrite(
            self.llm.as_ref(),
            &original.linkedin_draft,
            &original.x_draft,
            &original.insight,
            "",
        )
        .await;

        let rewritten = self
            .store
            .save_suggestion(NewSuggestion {
                channel_id: original.channel_id.clone(),
                summary_id: original.summary_id,
                insight: original.insight.clone(),
                why_it_works: "Fresh angle on your earlier insight".into(),
                linkedin_draft,
                x_draft,
            })
            .await?;
        info!(
            original_id = %original.id,
            rewritten_id = %rewritten.id,
            "created rewrite suggestion"
        );

        self.deliver(&rewritten).await;
        Ok(rewritten)
    }

    /// Delivery failures are logged, never fatal to the run.
    async fn deliver(&self, suggestion: &Suggestion) {
        match self.delivery.deliver(suggestion).await {
            Ok(receipt) => {
                if let Err(e) = self
                    .store
                    .set_delivery(suggestion.id, &receipt.channel, &receipt.ts)
                    .await
                {
                    error!(suggestion_id = %suggestion.id, error = %e, "failed to record delivery");
                }
            },
            Err(e) => {
                error!(suggestion_id = %suggestion.id, error = %e, "failed to deliver suggestion");
            },
        }
    }

    /// Spawn the interval scheduler. One tick per buffer window; the first
    /// window must elapse before the first run.
    pub fn spawn_scheduler(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        let interval =
            std::time::Duration::from_secs(self.config.buffer_window_minutes.max(1) as u64 * 60);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval() fires immediately; swallow the first tick.
            ticker.tick().await;

            info!(interval_secs = interval.as_secs(), "pipeline scheduler started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("pipeline scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = pipeline.run(RunTrigger::Scheduled).await {
                            error!(error = %e, "scheduled pipeline run failed");
                        }
                    }
                }
            }
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Mutex as StdMutex, atomic::{AtomicUsize, Ordering}},
    };

    use {
        async_trait::async_trait,
        chorus_llm::CompletionParams,
        chorus_store::{MemoryStore, NewMessage, SuggestionStatus},
        serde_json::json,
    };

    use {super::*, crate::DeliveryReceipt};

    struct ScriptedLlm {
        json: StdMutex<VecDeque<Result<serde_json::Value, String>>>,
        text: StdMutex<VecDeque<Result<String, String>>>,
    }

    impl ScriptedLlm {
        fn new(
            json: Vec<Result<serde_json::Value, String>>,
            text: Vec<Result<String, String>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                json: StdMutex::new(json.into()),
                text: StdMutex::new(text.into()),
            })
        }

        fn empty() -> Arc<Self> {
            Self::new(Vec::new(), Vec::new())
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _prompt: &str, _params: CompletionParams) -> Result<String> {
            self.text
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("unscripted text completion".into()))
                .map_err(anyhow::Error::msg)
        }

        async fn complete_json(
            &self,
            _prompt: &str,
            _temperature: f32,
        ) -> Result<serde_json::Value> {
            self.json
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("unscripted JSON completion".into()))
                .map_err(anyhow::Error::msg)
        }
    }

    #[derive(Default)]
    struct RecordingDelivery {
        delivered: StdMutex<Vec<Uuid>>,
        counter: AtomicUsize,
    }

    #[async_trait]
    impl SuggestionDelivery for RecordingDelivery {
        async fn deliver(&self, suggestion: &Suggestion) -> Result<DeliveryReceipt> {
            self.delivered.lock().unwrap().push(suggestion.id);
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(DeliveryReceipt {
                channel: "D42".into(),
                ts: format!("1700000000.{n:06}"),
            })
        }
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            buffer_window_minutes: 60,
            min_messages_for_summary: 8,
            max_suggestions_per_day: 3,
        }
    }

    fn pipeline_with(
        store: Arc<MemoryStore>,
        llm: Arc<ScriptedLlm>,
    ) -> (ContentPipeline, Arc<RecordingDelivery>) {
        let delivery = Arc::new(RecordingDelivery::default());
        let pipeline = ContentPipeline::new(
            store,
            llm,
            Arc::clone(&delivery) as Arc<dyn SuggestionDelivery>,
            test_config(),
        );
        (pipeline, delivery)
    }

    async fn seed_messages(store: &MemoryStore, channel_id: &str, count: usize) {
        for i in 0..count {
            store
                .save_message(NewMessage {
                    channel_id: channel_id.into(),
                    author_id: format!("U{i:04}"),
                    text: format!("message {i}"),
                    posted_at: Utc::now(),
                })
                .await
                .unwrap();
        }
    }

    fn summary_json() -> serde_json::Value {
        json!({
            "summary": "The team debated shipping cadence.",
            "key_ideas": ["ship smaller"],
            "opinions": ["big launches hide learning"],
            "decisions": [],
            "interesting_phrases": ["launch theater"]
        })
    }

    #[tokio::test]
    async fn zero_buffered_messages_produce_zero_suggestions() {
        let store = Arc::new(MemoryStore::new());
        store.activate_channel("C1", "U1").await.unwrap();

        let (pipeline, delivery) = pipeline_with(Arc::clone(&store), ScriptedLlm::empty());
        let run = pipeline.run(RunTrigger::Manual).await.unwrap();

        assert_eq!(run.status, RunStatus::Ok);
        assert_eq!(run.suggestion_count, 0);
        assert!(delivery.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_with_no_active_channels_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let (pipeline, _delivery) = pipeline_with(Arc::clone(&store), ScriptedLlm::empty());

        let run = pipeline.run(RunTrigger::Scheduled).await.unwrap();
        assert_eq!(run.status, RunStatus::Skipped);
        assert_eq!(store.recent_runs(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn happy_path_creates_delivers_and_orders_suggestions() {
        let store = Arc::new(MemoryStore::new());
        store.activate_channel("C1", "U1").await.unwrap();
        seed_messages(&store, "C1", 8).await;

        let detection = json!({
            "is_post_worthy": true,
            "ideas": [
                { "core_insight": "Ship smaller", "why_it_works": "counterintuitive" },
                { "core_insight": "Launches are theater", "why_it_works": "spicy" }
            ]
        });
        let llm = ScriptedLlm::new(
            vec![
                Ok(summary_json()),
                Ok(detection),
                // idea 1 has no saved insights to dedup against.
                Ok(json!({ "is_sensitive": false })),
                // idea 2 dedups against idea 1, then passes sensitivity.
                Ok(json!({ "is_duplicate": false })),
                Ok(json!({ "is_sensitive": false })),
            ],
            vec![
                Ok("LinkedIn draft one".into()),
                Ok("X draft one".into()),
                Ok("LinkedIn draft two".into()),
                Ok("X draft two".into()),
            ],
        );

        let (pipeline, delivery) = pipeline_with(Arc::clone(&store), llm);
        let run = pipeline.run(RunTrigger::Manual).await.unwrap();

        assert_eq!(run.status, RunStatus::Ok);
        assert_eq!(run.suggestion_count, 2);

        let created = store
            .suggestions_since(Utc::now() - Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].insight, "Ship smaller");
        assert_eq!(created[1].insight, "Launches are theater");
        assert!(created.iter().all(|s| s.status == SuggestionStatus::Pending));
        assert!(created.iter().all(|s| s.delivery_ts.is_some()));

        // Delivered in creation order.
        let delivered = delivery.delivered.lock().unwrap();
        assert_eq!(*delivered, vec![created[0].id, created[1].id]);

        // Buffer is consumed.
        let remaining = store
            .messages_in_window("C1", Duration::minutes(60))
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn empty_summary_clears_buffer_without_suggestions() {
        let store = Arc::new(MemoryStore::new());
        store.activate_channel("C1", "U1").await.unwrap();
        seed_messages(&store, "C1", 8).await;

        let llm = ScriptedLlm::new(vec![Ok(json!({ "summary": "" }))], Vec::new());
        let (pipeline, delivery) = pipeline_with(Arc::clone(&store), llm);
        let run = pipeline.run(RunTrigger::Manual).await.unwrap();

        assert_eq!(run.status, RunStatus::Ok);
        assert_eq!(run.suggestion_count, 0);
        assert!(delivery.delivered.lock().unwrap().is_empty());
        assert!(
            store
                .messages_in_window("C1", Duration::minutes(60))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn daily_cap_blocks_new_suggestions() {
        let store = Arc::new(MemoryStore::new());
        store.activate_channel("C1", "U1").await.unwrap();
        seed_messages(&store, "C1", 8).await;
        for _ in 0..3 {
            store
                .save_suggestion(NewSuggestion {
                    channel_id: "C1".into(),
                    summary_id: None,
                    insight: "earlier".into(),
                    why_it_works: "earlier".into(),
                    linkedin_draft: "earlier".into(),
                    x_draft: "earlier".into(),
                })
                .await
                .unwrap();
        }

        let (pipeline, delivery) = pipeline_with(Arc::clone(&store), ScriptedLlm::empty());
        let run = pipeline.run(RunTrigger::Manual).await.unwrap();

        // Cap hit before any LLM call; the run itself is healthy.
        assert_eq!(run.status, RunStatus::Ok);
        assert_eq!(run.suggestion_count, 0);
        assert!(delivery.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_llm_output_records_failed_run() {
        let store = Arc::new(MemoryStore::new());
        store.activate_channel("C1", "U1").await.unwrap();
        seed_messages(&store, "C1", 8).await;

        let llm = ScriptedLlm::new(vec![Err("malformed JSON completion".into())], Vec::new());
        let (pipeline, delivery) = pipeline_with(Arc::clone(&store), llm);
        let run = pipeline.run(RunTrigger::Scheduled).await.unwrap();

        assert_eq!(run.status, RunStatus::Error);
        assert!(run.error.as_deref().is_some_and(|e| e.contains("C1")));
        // The failure surfaces in run history, never in the founder's DMs.
        assert!(delivery.delivered.lock().unwrap().is_empty());
        let runs = store.recent_runs(1).await.unwrap();
        assert_eq!(runs[0].status, RunStatus::Error);
    }

    #[tokio::test]
    async fn volume_trigger_ignores_short_buffers() {
        let store = Arc::new(MemoryStore::new());
        store.activate_channel("C1", "U1").await.unwrap();
        seed_messages(&store, "C1", 7).await;

        let (pipeline, delivery) = pipeline_with(Arc::clone(&store), ScriptedLlm::empty());
        pipeline.process_on_volume("C1").await;

        // Below the threshold nothing is summarized and the buffer is kept.
        assert!(delivery.delivered.lock().unwrap().is_empty());
        assert_eq!(
            store
                .messages_in_window("C1", Duration::minutes(60))
                .await
                .unwrap()
                .len(),
            7
        );
    }

    #[tokio::test]
    async fn incomplete_drafts_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.activate_channel("C1", "U1").await.unwrap();
        seed_messages(&store, "C1", 8).await;

        let detection = json!({
            "is_post_worthy": true,
            "ideas": [{ "core_insight": "Ship smaller", "why_it_works": "counterintuitive" }]
        });
        let llm = ScriptedLlm::new(
            vec![Ok(summary_json()), Ok(detection), Ok(json!({ "is_sensitive": false }))],
            vec![Ok("LinkedIn draft".into()), Err("x generation failed".into())],
        );

        let (pipeline, delivery) = pipeline_with(Arc::clone(&store), llm);
        let run = pipeline.run(RunTrigger::Manual).await.unwrap();

        assert_eq!(run.status, RunStatus::Ok);
        assert_eq!(run.suggestion_count, 0);
        assert!(delivery.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rewrite_creates_new_pending_suggestion() {
        let store = Arc::new(MemoryStore::new());
        let original = store
            .save_suggestion(NewSuggestion {
                channel_id: "C1".into(),
                summary_id: None,
                insight: "Ship smaller".into(),
                why_it_works: "counterintuitive".into(),
                linkedin_draft: "old linkedin".into(),
                x_draft: "old x".into(),
            })
            .await
            .unwrap();

        let llm = ScriptedLlm::new(
            Vec::new(),
            vec![Ok("fresh linkedin".into()), Ok("fresh x".into())],
        );
        let (pipeline, delivery) = pipeline_with(Arc::clone(&store), llm);

        let rewritten = pipeline.rewrite_suggestion(&original).await.unwrap();
        assert_ne!(rewritten.id, original.id);
        assert_eq!(rewritten.status, SuggestionStatus::Pending);
        assert_eq!(rewritten.insight, "Ship smaller");
        assert_eq!(rewritten.linkedin_draft, "fresh linkedin");
        assert_eq!(delivery.delivered.lock().unwrap().len(), 1);
    }
}
