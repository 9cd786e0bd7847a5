//! Environment-driven config loader.
//!
//! Required variables fail loading with a named error; optional variables
//! fall back to the schema defaults, warning when a value is present but
//! unparsable.

use {anyhow::Context, secrecy::Secret, tracing::warn};

use crate::schema::{
    ChorusConfig, DatabaseConfig, OpenAiConfig, PipelineConfig, ServerConfig, SlackConfig,
};

/// Load configuration from process environment variables.
pub fn from_env() -> anyhow::Result<ChorusConfig> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary key lookup (tests pass a map).
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<ChorusConfig> {
    let defaults = PipelineConfig::default();
    let server_defaults = ServerConfig::default();

    Ok(ChorusConfig {
        slack: SlackConfig {
            bot_token: required_secret(&lookup, "SLACK_BOT_TOKEN")?,
            app_token: required_secret(&lookup, "SLACK_APP_TOKEN")?,
            signing_secret: required_secret(&lookup, "SLACK_SIGNING_SECRET")?,
            founder_user_id: required(&lookup, "FOUNDER_USER_ID")?,
        },
        openai: OpenAiConfig {
            api_key: required_secret(&lookup, "OPENAI_API_KEY")?,
            model: optional(&lookup, "OPENAI_MODEL").unwrap_or_else(|| OpenAiConfig::default().model),
            base_url: optional(&lookup, "OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| OpenAiConfig::default().base_url),
        },
        database: DatabaseConfig {
            url: required_secret(&lookup, "DATABASE_URL")?,
        },
        pipeline: PipelineConfig {
            buffer_window_minutes: parsed(&lookup, "BUFFER_WINDOW_MINUTES", defaults.buffer_window_minutes),
            min_messages_for_summary: parsed(
                &lookup,
                "MIN_MESSAGES_FOR_SUMMARY",
                defaults.min_messages_for_summary,
            ),
            max_suggestions_per_day: parsed(
                &lookup,
                "MAX_SUGGESTIONS_PER_DAY",
                defaults.max_suggestions_per_day,
            ),
        },
        server: ServerConfig {
            bind: optional(&lookup, "CHORUS_BIND").unwrap_or(server_defaults.bind),
            port: parsed(&lookup, "CHORUS_PORT", server_defaults.port),
        },
    })
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("missing required environment variable {key}"))
}

fn required_secret(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> anyhow::Result<Secret<String>> {
    required(lookup, key).map(Secret::new)
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match optional(lookup, key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "unparsable value, using default");
                default
            },
        },
        None => default,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use {secrecy::ExposeSecret, super::*};

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SLACK_BOT_TOKEN", "xoxb-test"),
            ("SLACK_APP_TOKEN", "xapp-test"),
            ("SLACK_SIGNING_SECRET", "sig-test"),
            ("FOUNDER_USER_ID", "U012FOUNDER"),
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_URL", "postgres://chorus:pw@localhost/chorus"),
        ])
    }

    fn load(env: &HashMap<&str, &str>) -> anyhow::Result<ChorusConfig> {
        from_lookup(|key| env.get(key).map(|v| (*v).to_string()))
    }

    #[test]
    fn loads_with_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.slack.founder_user_id, "U012FOUNDER");
        assert_eq!(config.pipeline.buffer_window_minutes, 60);
        assert_eq!(config.pipeline.min_messages_for_summary, 8);
        assert_eq!(config.pipeline.max_suggestions_per_day, 3);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn missing_required_var_errors() {
        let mut env = base_env();
        env.remove("SLACK_BOT_TOKEN");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("SLACK_BOT_TOKEN"));
    }

    #[test]
    fn overrides_and_trailing_slash() {
        let mut env = base_env();
        env.insert("OPENAI_BASE_URL", "http://localhost:1234/v1/");
        env.insert("BUFFER_WINDOW_MINUTES", "15");
        env.insert("CHORUS_PORT", "8080");
        let config = load(&env).unwrap();
        assert_eq!(config.openai.base_url, "http://localhost:1234/v1");
        assert_eq!(config.pipeline.buffer_window_minutes, 15);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn unparsable_numeric_falls_back() {
        let mut env = base_env();
        env.insert("MAX_SUGGESTIONS_PER_DAY", "lots");
        let config = load(&env).unwrap();
        assert_eq!(config.pipeline.max_suggestions_per_day, 3);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = load(&base_env()).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("xoxb-test"));
        assert!(!rendered.contains("sk-test"));
        assert!(rendered.contains("[REDACTED]"));
        // The secret is still reachable for API calls.
        assert_eq!(config.slack.bot_token.expose_secret(), "xoxb-test");
    }
}
