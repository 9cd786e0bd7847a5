//! Config schema types (slack, openai, database, pipeline, server).

use secrecy::Secret;

/// Root configuration.
#[derive(Debug, Clone, Default)]
pub struct ChorusConfig {
    pub slack: SlackConfig,
    pub openai: OpenAiConfig,
    pub database: DatabaseConfig,
    pub pipeline: PipelineConfig,
    pub server: ServerConfig,
}

/// Slack workspace credentials and the founder to deliver suggestions to.
#[derive(Clone)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`) for Web API calls.
    pub bot_token: Secret<String>,
    /// App-level token (`xapp-...`) for the Socket Mode connection.
    pub app_token: Secret<String>,
    /// Signing secret for request verification.
    pub signing_secret: Secret<String>,
    /// Slack user ID of the founder who receives suggestion DMs.
    pub founder_user_id: String,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .field("founder_user_id", &self.founder_user_id)
            .finish()
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: Secret::new(String::new()),
            app_token: Secret::new(String::new()),
            signing_secret: Secret::new(String::new()),
            founder_user_id: String::new(),
        }
    }
}

/// OpenAI-compatible completion API settings.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: Secret<String>,
    /// Model ID sent with every completion request.
    pub model: String,
    /// Base URL without the trailing `/chat/completions` path.
    pub base_url: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::new(String::new()),
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
        }
    }
}

/// Postgres connection settings.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Full connection string; may embed credentials, so kept secret.
    pub url: Secret<String>,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Secret::new(String::new()),
        }
    }
}

/// Pipeline cadence and volume thresholds.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Width of the rolling message window in minutes; also the scheduler
    /// interval.
    pub buffer_window_minutes: i64,
    /// Messages required in the window before a channel is summarized.
    pub min_messages_for_summary: usize,
    /// Cap on suggestions created per UTC day, across all channels.
    pub max_suggestions_per_day: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_window_minutes: 60,
            min_messages_for_summary: 8,
            max_suggestions_per_day: 3,
        }
    }
}

/// HTTP API server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
        }
    }
}
