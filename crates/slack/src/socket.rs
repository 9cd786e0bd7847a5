//! Socket Mode connection handler for Slack.
//!
//! Uses slack-morphism's socket mode listener to receive events via WebSocket
//! without requiring a public HTTP endpoint.

use std::sync::Arc;

use {
    anyhow::Result,
    secrecy::ExposeSecret,
    slack_morphism::prelude::*,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {
    chorus_config::{PipelineConfig, SlackConfig},
    chorus_pipeline::ContentPipeline,
    chorus_store::{NewMessage, Store},
};

use crate::{
    commands,
    outbound::SlackOutbound,
    reactions::{self, ReactionOutcome},
};

/// Shared state for socket mode callbacks.
#[derive(Clone)]
struct SocketModeState {
    store: Arc<dyn Store>,
    pipeline: Arc<ContentPipeline>,
    outbound: Arc<SlackOutbound>,
    bot_user_id: Option<String>,
    max_suggestions_per_day: usize,
}

/// Create the shared hyper-backed Slack client.
pub fn build_client() -> Result<Arc<SlackHyperClient>> {
    Ok(Arc::new(SlackClient::new(SlackClientHyperConnector::new()?)))
}

/// Start the Socket Mode listener and run it until `cancel` fires.
pub async fn start_socket_mode(
    client: Arc<SlackHyperClient>,
    config: SlackConfig,
    pipeline_config: PipelineConfig,
    store: Arc<dyn Store>,
    pipeline: Arc<ContentPipeline>,
    outbound: Arc<SlackOutbound>,
    cancel: CancellationToken,
) -> Result<()> {
    let bot_token = SlackApiToken::new(config.bot_token.expose_secret().into());
    let session = client.open_session(&bot_token);
    let auth_test = session.auth_test().await?;

    info!(bot_user = ?auth_test.user, "slack bot authenticated");

    let state = SocketModeState {
        store,
        pipeline,
        outbound,
        bot_user_id: Some(auth_test.user_id.to_string()),
        max_suggestions_per_day: pipeline_config.max_suggestions_per_day,
    };

    let callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_events);
    let listener_env =
        Arc::new(SlackClientEventsListenerEnvironment::new(client).with_user_state(state));
    let socket_listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        listener_env,
        callbacks,
    );

    let app_token = SlackApiToken::new(config.app_token.expose_secret().into());
    tokio::select! {
        result = socket_listener.listen_for(&app_token) => {
            if let Err(e) = result {
                error!(error = %e, "socket mode error");
            }
        }
        _ = cancel.cancelled() => {
            info!("socket mode cancelled");
        }
    }

    Ok(())
}

/// Handle push events (messages, mentions, reactions).
async fn handle_push_events(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let guard = states.read().await;
    let state = guard
        .get_user_state::<SocketModeState>()
        .ok_or("missing socket mode state")?;

    if let Err(e) = handle_push_event_inner(state, event).await {
        warn!(error = %e, "failed to handle push event");
    }

    Ok(())
}

async fn handle_push_event_inner(
    state: &SocketModeState,
    event: SlackPushEventCallback,
) -> Result<()> {
    match &event.event {
        SlackEventCallbackBody::Message(msg) => handle_message_event(state, msg).await,
        SlackEventCallbackBody::AppMention(mention) => handle_mention_event(state, mention).await,
        SlackEventCallbackBody::ReactionAdded(reaction) => {
            handle_reaction_event(state, reaction).await
        },
        _ => {
            debug!("ignoring event callback type");
            Ok(())
        },
    }
}

async fn handle_message_event(state: &SocketModeState, event: &SlackMessageEvent) -> Result<()> {
    // Skip bot messages to prevent loops.
    if event.sender.bot_id.is_some() {
        return Ok(());
    }

    // Skip message subtypes (edits, deletes, etc.)
    if event.subtype.is_some() {
        return Ok(());
    }

    let channel_id = event
        .origin
        .channel
        .as_ref()
        .map(|c| c.to_string())
        .unwrap_or_default();
    let user_id = event
        .sender
        .user
        .as_ref()
        .map(|u| u.to_string())
        .unwrap_or_default();
    let text = event
        .content
        .as_ref()
        .and_then(|c| c.text.clone())
        .unwrap_or_default();

    if channel_id.is_empty() || text.is_empty() {
        return Ok(());
    }

    // Determine if DM or channel.
    if channel_id.starts_with('D') {
        return handle_dm(state, &channel_id, &user_id, &text).await;
    }

    // Thread replies are not buffered.
    if event.origin.thread_ts.is_some() {
        return Ok(());
    }

    if !state.store.is_listening(&channel_id).await? {
        return Ok(());
    }

    state
        .store
        .save_message(NewMessage {
            channel_id: channel_id.clone(),
            author_id: user_id,
            text,
            posted_at: chrono::Utc::now(),
        })
        .await?;
    debug!(channel_id = %channel_id, "buffered channel message");

    // The volume threshold may tip the channel into processing; don't hold
    // the event handler across LLM calls.
    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        pipeline.process_on_volume(&channel_id).await;
    });

    Ok(())
}

async fn handle_dm(
    state: &SocketModeState,
    channel_id: &str,
    user_id: &str,
    text: &str,
) -> Result<()> {
    info!(user_id, "processing DM command");

    let Some(command) = commands::parse_command(text) else {
        debug!(user_id, "unknown DM command");
        return Ok(());
    };

    let reply =
        commands::handle_dm_command(command, state.store.as_ref(), state.max_suggestions_per_day)
            .await?;
    state
        .outbound
        .post_message(&channel_id.to_string().into(), &reply)
        .await?;
    Ok(())
}

async fn handle_mention_event(
    state: &SocketModeState,
    event: &SlackAppMentionEvent,
) -> Result<()> {
    // The bot mentioning itself cannot issue commands.
    if state
        .bot_user_id
        .as_deref()
        .is_some_and(|bot| bot == event.user.to_string())
    {
        return Ok(());
    }

    let text = event.content.text.clone().unwrap_or_default();
    let Some(command) = commands::parse_command(&text) else {
        debug!(channel_id = %event.channel, "mention without a recognized command");
        return Ok(());
    };

    let reply = commands::handle_mention_command(
        command,
        &event.channel.to_string(),
        &event.user.to_string(),
        state.store.as_ref(),
        state.max_suggestions_per_day,
    )
    .await?;
    state.outbound.post_message(&event.channel, &reply).await?;
    Ok(())
}

async fn handle_reaction_event(
    state: &SocketModeState,
    event: &SlackReactionAddedEvent,
) -> Result<()> {
    let SlackReactionsItem::Message(message) = &event.item else {
        return Ok(());
    };
    let Some(channel) = message.origin.channel.clone() else {
        return Ok(());
    };
    let ts = message.origin.ts.clone();

    let outcome = reactions::apply_reaction(
        state.store.as_ref(),
        &channel.to_string(),
        &ts.to_string(),
        &event.reaction.to_string(),
    )
    .await?;

    match outcome {
        ReactionOutcome::Saved(suggestion) => {
            info!(suggestion_id = %suggestion.id, "suggestion saved");
            state
                .outbound
                .post_threaded(
                    &channel,
                    &ts,
                    "\u{2705} Saved! Find it anytime with `saved posts`",
                )
                .await?;
        },
        ReactionOutcome::RewriteRequested(suggestion) => {
            let pipeline = Arc::clone(&state.pipeline);
            tokio::spawn(async move {
                if let Err(e) = pipeline.rewrite_suggestion(&suggestion).await {
                    error!(suggestion_id = %suggestion.id, error = %e, "rewrite failed");
                }
            });
        },
        ReactionOutcome::Rejected(suggestion) => {
            info!(suggestion_id = %suggestion.id, "suggestion rejected");
        },
        ReactionOutcome::Ignored => {
            debug!("reaction ignored");
        },
    }

    Ok(())
}
