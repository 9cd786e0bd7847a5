//! Bot command parsing and execution.
//!
//! Commands arrive as app-mentions in channels ("@chorus start listening")
//! or as plain DMs ("status", "saved posts"). Replies are returned as text
//! for the caller to post.

use std::sync::LazyLock;

use {
    anyhow::Result,
    chrono::{NaiveTime, Utc},
    regex::Regex,
    tracing::info,
};

use chorus_store::Store;

#[allow(clippy::unwrap_used)]
static MENTION_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<@[^>]+>").unwrap());

/// A recognized bot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    StartListening,
    StopListening,
    Status,
    ShowSaved,
}

/// Remove `<@U...>` mention tags so command text can be matched.
#[must_use]
pub fn strip_mentions(text: &str) -> String {
    MENTION_TAG.replace_all(text, "").trim().to_string()
}

/// Parse a command out of message text. Mention tags are stripped first;
/// matching is case-insensitive.
#[must_use]
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let text = strip_mentions(text).to_lowercase();

    if text.contains("start listening") {
        return Some(BotCommand::StartListening);
    }
    if text.contains("stop listening") {
        return Some(BotCommand::StopListening);
    }
    match text.as_str() {
        "status" | "stats" | "info" => Some(BotCommand::Status),
        "saved" | "saved posts" | "my posts" => Some(BotCommand::ShowSaved),
        _ if text.contains("status") => Some(BotCommand::Status),
        _ => None,
    }
}

/// Execute a command issued by mentioning the bot inside a channel.
pub async fn handle_mention_command(
    command: BotCommand,
    channel_id: &str,
    user_id: &str,
    store: &dyn Store,
    max_suggestions_per_day: usize,
) -> Result<String> {
    match command {
        BotCommand::StartListening => {
            store.activate_channel(channel_id, user_id).await?;
            info!(channel_id, user_id, "started listening");
            Ok("\u{1F440} Got it! I'm now listening to this channel. \
                I'll stay quiet and only reach out when I spot something worth posting."
                .into())
        },
        BotCommand::StopListening => {
            if store.deactivate_channel(channel_id).await? {
                info!(channel_id, "stopped listening");
                Ok("Okay, I've stopped listening to this channel.".into())
            } else {
                Ok("I wasn't listening to this channel.".into())
            }
        },
        BotCommand::Status | BotCommand::ShowSaved => {
            status_reply(store, max_suggestions_per_day).await
        },
    }
}

/// Execute a command sent as a direct message.
pub async fn handle_dm_command(
    command: BotCommand,
    store: &dyn Store,
    max_suggestions_per_day: usize,
) -> Result<String> {
    match command {
        BotCommand::StartListening => Ok("To start listening, mention me in a channel with:\n\
             `@Chorus start listening`"
            .into()),
        BotCommand::StopListening => {
            let stopped = store.deactivate_all_channels().await?;
            if stopped == 0 {
                Ok("I'm not currently listening to any channels.".into())
            } else {
                Ok(format!("Stopped listening to {stopped} channel(s)."))
            }
        },
        BotCommand::Status => {
            let channels = store.active_channels().await?.len();
            let today = store.suggestions_since(today_start()).await?.len();
            let saved = store.saved_suggestions(100).await?.len();
            Ok(format!(
                "\u{1F4CA} *Chorus Status*\n\n\
                 \u{2022} Listening to {channels} channel(s)\n\
                 \u{2022} {today}/{max_suggestions_per_day} suggestions today\n\
                 \u{2022} {saved} saved posts total"
            ))
        },
        BotCommand::ShowSaved => {
            let saved = store.saved_suggestions(5).await?;
            if saved.is_empty() {
                return Ok(
                    "No saved posts yet. I'll suggest some when I spot good insights!".into(),
                );
            }
            let mut message = String::from("\u{1F4DA} *Your Saved Posts*\n\n");
            for (i, suggestion) in saved.iter().enumerate() {
                let insight: String = suggestion.insight.chars().take(100).collect();
                message.push_str(&format!("*{}.* {insight}...\n\n", i + 1));
            }
            Ok(message)
        },
    }
}

async fn status_reply(store: &dyn Store, max_suggestions_per_day: usize) -> Result<String> {
    let channels = store.active_channels().await?.len();
    let today = store.suggestions_since(today_start()).await?.len();
    Ok(format!(
        "\u{1F4CA} *Status*\n\
         \u{2022} Listening to {channels} channel(s)\n\
         \u{2022} {today} suggestion(s) today\n\
         \u{2022} Max {max_suggestions_per_day} suggestions/day"
    ))
}

fn today_start() -> chrono::DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}
