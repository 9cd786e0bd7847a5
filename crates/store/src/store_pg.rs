//! Postgres-backed store using sqlx.

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    chrono::{DateTime, Duration, Utc},
    sqlx::{PgPool, Row, postgres::PgPoolOptions},
    uuid::Uuid,
};

use crate::{
    store::Store,
    types::{
        MonitoredChannel, NewMessage, NewSuggestion, PipelineRun, RunStatus, RunTrigger,
        StoredMessage, Suggestion, SuggestionStatus, SummaryMetadata, SummaryRecord,
    },
};

/// Postgres persistence for all chorus state.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store with its own connection pool and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store using an existing pool (migrations must already be run).
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Create the chorus tables when they do not exist yet.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    const STATEMENTS: &[&str] = &[
        "CREATE TABLE IF NOT EXISTS listening_channels (
            channel_id TEXT PRIMARY KEY,
            added_by   TEXT NOT NULL,
            is_active  BOOLEAN NOT NULL DEFAULT TRUE,
            started_at TIMESTAMPTZ NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS messages (
            id         UUID PRIMARY KEY,
            channel_id TEXT NOT NULL,
            author_id  TEXT NOT NULL,
            body       TEXT NOT NULL,
            posted_at  TIMESTAMPTZ NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS messages_channel_posted_idx
            ON messages (channel_id, posted_at)",
        "CREATE TABLE IF NOT EXISTS summaries (
            id         UUID PRIMARY KEY,
            channel_id TEXT NOT NULL,
            summary    TEXT NOT NULL,
            metadata   TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS suggestions (
            id               UUID PRIMARY KEY,
            channel_id       TEXT NOT NULL,
            summary_id       UUID,
            insight          TEXT NOT NULL,
            why_it_works     TEXT NOT NULL,
            linkedin_draft   TEXT NOT NULL,
            x_draft          TEXT NOT NULL,
            status           TEXT NOT NULL,
            delivery_channel TEXT,
            delivery_ts      TEXT,
            created_at       TIMESTAMPTZ NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS suggestions_created_idx ON suggestions (created_at)",
        "CREATE INDEX IF NOT EXISTS suggestions_delivery_idx
            ON suggestions (delivery_channel, delivery_ts)",
        "CREATE TABLE IF NOT EXISTS pipeline_runs (
            id               UUID PRIMARY KEY,
            triggered_by     TEXT NOT NULL,
            started_at       TIMESTAMPTZ NOT NULL,
            finished_at      TIMESTAMPTZ NOT NULL,
            status           TEXT NOT NULL,
            error            TEXT,
            suggestion_count BIGINT NOT NULL
        )",
    ];

    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("failed to run migration statement")?;
    }
    Ok(())
}

fn suggestion_from_row(row: &sqlx::postgres::PgRow) -> Result<Suggestion> {
    let status_raw: String = row.get("status");
    let status = SuggestionStatus::parse(&status_raw)
        .with_context(|| format!("unknown suggestion status: {status_raw}"))?;
    Ok(Suggestion {
        id: row.get("id"),
        channel_id: row.get("channel_id"),
        summary_id: row.get("summary_id"),
        insight: row.get("insight"),
        why_it_works: row.get("why_it_works"),
        linkedin_draft: row.get("linkedin_draft"),
        x_draft: row.get("x_draft"),
        status,
        delivery_channel: row.get("delivery_channel"),
        delivery_ts: row.get("delivery_ts"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl Store for PgStore {
    async fn activate_channel(
        &self,
        channel_id: &str,
        added_by: &str,
    ) -> Result<MonitoredChannel> {
        let row = sqlx::query(
            "INSERT INTO listening_channels (channel_id, added_by, is_active, started_at)
             VALUES ($1, $2, TRUE, $3)
             ON CONFLICT (channel_id) DO UPDATE SET
                 added_by   = excluded.added_by,
                 is_active  = TRUE,
                 started_at = CASE
                     WHEN listening_channels.is_active THEN listening_channels.started_at
                     ELSE excluded.started_at
                 END
             RETURNING channel_id, added_by, is_active, started_at",
        )
        .bind(channel_id)
        .bind(added_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(MonitoredChannel {
            channel_id: row.get("channel_id"),
            added_by: row.get("added_by"),
            is_active: row.get("is_active"),
            started_at: row.get("started_at"),
        })
    }

    async fn deactivate_channel(&self, channel_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE listening_channels SET is_active = FALSE
             WHERE channel_id = $1 AND is_active",
        )
        .bind(channel_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_all_channels(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE listening_channels SET is_active = FALSE WHERE is_active")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn active_channels(&self) -> Result<Vec<MonitoredChannel>> {
        let rows = sqlx::query(
            "SELECT channel_id, added_by, is_active, started_at
             FROM listening_channels WHERE is_active ORDER BY channel_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| MonitoredChannel {
                channel_id: row.get("channel_id"),
                added_by: row.get("added_by"),
                is_active: row.get("is_active"),
                started_at: row.get("started_at"),
            })
            .collect())
    }

    async fn is_listening(&self, channel_id: &str) -> Result<bool> {
        let row =
            sqlx::query("SELECT 1 AS one FROM listening_channels WHERE channel_id = $1 AND is_active")
                .bind(channel_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn save_message(&self, message: NewMessage) -> Result<StoredMessage> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO messages (id, channel_id, author_id, body, posted_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&message.channel_id)
        .bind(&message.author_id)
        .bind(&message.text)
        .bind(message.posted_at)
        .execute(&self.pool)
        .await?;

        Ok(StoredMessage {
            id,
            channel_id: message.channel_id,
            author_id: message.author_id,
            text: message.text,
            posted_at: message.posted_at,
        })
    }

    async fn messages_in_window(
        &self,
        channel_id: &str,
        window: Duration,
    ) -> Result<Vec<StoredMessage>> {
        let cutoff = Utc::now() - window;
        let rows = sqlx::query(
            "SELECT id, channel_id, author_id, body, posted_at
             FROM messages
             WHERE channel_id = $1 AND posted_at >= $2
             ORDER BY posted_at",
        )
        .bind(channel_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StoredMessage {
                id: row.get("id"),
                channel_id: row.get("channel_id"),
                author_id: row.get("author_id"),
                text: row.get("body"),
                posted_at: row.get("posted_at"),
            })
            .collect())
    }

    async fn clear_buffer(&self, channel_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE channel_id = $1")
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn save_summary(
        &self,
        channel_id: &str,
        summary: &str,
        metadata: SummaryMetadata,
    ) -> Result<SummaryRecord> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let metadata_json = serde_json::to_string(&metadata)?;
        sqlx::query(
            "INSERT INTO summaries (id, channel_id, summary, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(channel_id)
        .bind(summary)
        .bind(&metadata_json)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(SummaryRecord {
            id,
            channel_id: channel_id.to_string(),
            summary: summary.to_string(),
            metadata,
            created_at,
        })
    }

    async fn save_suggestion(&self, suggestion: NewSuggestion) -> Result<Suggestion> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        sqlx::query(
            "INSERT INTO suggestions
                 (id, channel_id, summary_id, insight, why_it_works,
                  linkedin_draft, x_draft, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(id)
        .bind(&suggestion.channel_id)
        .bind(suggestion.summary_id)
        .bind(&suggestion.insight)
        .bind(&suggestion.why_it_works)
        .bind(&suggestion.linkedin_draft)
        .bind(&suggestion.x_draft)
        .bind(SuggestionStatus::Pending.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Suggestion {
            id,
            channel_id: suggestion.channel_id,
            summary_id: suggestion.summary_id,
            insight: suggestion.insight,
            why_it_works: suggestion.why_it_works,
            linkedin_draft: suggestion.linkedin_draft,
            x_draft: suggestion.x_draft,
            status: SuggestionStatus::Pending,
            delivery_channel: None,
            delivery_ts: None,
            created_at,
        })
    }

    async fn set_delivery(&self, id: Uuid, channel: &str, ts: &str) -> Result<()> {
        sqlx::query("UPDATE suggestions SET delivery_channel = $2, delivery_ts = $3 WHERE id = $1")
            .bind(id)
            .bind(channel)
            .bind(ts)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn transition_status(&self, id: Uuid, status: SuggestionStatus) -> Result<bool> {
        let result =
            sqlx::query("UPDATE suggestions SET status = $2 WHERE id = $1 AND status = 'pending'")
                .bind(id)
                .bind(status.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn suggestion(&self, id: Uuid) -> Result<Option<Suggestion>> {
        let row = sqlx::query("SELECT * FROM suggestions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(suggestion_from_row).transpose()
    }

    async fn suggestion_by_delivery(&self, channel: &str, ts: &str) -> Result<Option<Suggestion>> {
        let row = sqlx::query(
            "SELECT * FROM suggestions WHERE delivery_channel = $1 AND delivery_ts = $2",
        )
        .bind(channel)
        .bind(ts)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(suggestion_from_row).transpose()
    }

    async fn suggestions_since(&self, since: DateTime<Utc>) -> Result<Vec<Suggestion>> {
        let rows = sqlx::query(
            "SELECT * FROM suggestions WHERE created_at >= $1 ORDER BY created_at",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(suggestion_from_row).collect()
    }

    async fn saved_suggestions(&self, limit: u32) -> Result<Vec<Suggestion>> {
        let rows = sqlx::query(
            "SELECT * FROM suggestions WHERE status = 'saved'
             ORDER BY created_at DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(suggestion_from_row).collect()
    }

    async fn append_run(&self, run: &PipelineRun) -> Result<()> {
        sqlx::query(
            "INSERT INTO pipeline_runs
                 (id, triggered_by, started_at, finished_at, status, error, suggestion_count)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(run.id)
        .bind(run.trigger.as_str())
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.status.as_str())
        .bind(&run.error)
        .bind(run.suggestion_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_runs(&self, limit: u32) -> Result<Vec<PipelineRun>> {
        let rows = sqlx::query(
            "SELECT id, triggered_by, started_at, finished_at, status, error, suggestion_count
             FROM pipeline_runs ORDER BY started_at DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let trigger_raw: String = row.get("triggered_by");
                let status_raw: String = row.get("status");
                Ok(PipelineRun {
                    id: row.get("id"),
                    trigger: RunTrigger::parse(&trigger_raw)
                        .with_context(|| format!("unknown run trigger: {trigger_raw}"))?,
                    started_at: row.get("started_at"),
                    finished_at: row.get("finished_at"),
                    status: RunStatus::parse(&status_raw)
                        .with_context(|| format!("unknown run status: {status_raw}"))?,
                    error: row.get("error"),
                    suggestion_count: row.get("suggestion_count"),
                })
            })
            .collect()
    }
}
