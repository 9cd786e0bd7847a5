//! Outbound Slack messaging: DM delivery of suggestions and replies.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    secrecy::ExposeSecret,
    slack_morphism::prelude::*,
    tracing::{debug, info},
};

use {
    chorus_config::SlackConfig,
    chorus_pipeline::{DeliveryReceipt, SuggestionDelivery},
    chorus_store::Suggestion,
};

/// Sends messages through the Slack Web API on behalf of the bot.
pub struct SlackOutbound {
    client: Arc<SlackHyperClient>,
    bot_token: SlackApiToken,
    founder_user_id: String,
}

impl SlackOutbound {
    #[must_use]
    pub fn new(client: Arc<SlackHyperClient>, config: &SlackConfig) -> Self {
        Self {
            client,
            bot_token: SlackApiToken::new(config.bot_token.expose_secret().into()),
            founder_user_id: config.founder_user_id.clone(),
        }
    }

    /// Post a message to a channel, returning the message ts.
    pub async fn post_message(&self, channel: &SlackChannelId, text: &str) -> Result<SlackTs> {
        let session = self.client.open_session(&self.bot_token);
        let request = SlackApiChatPostMessageRequest::new(
            channel.clone(),
            SlackMessageContent::new().with_text(text.into()),
        );
        let response = session.chat_post_message(&request).await?;
        debug!(channel = %channel, ts = %response.ts, "posted message");
        Ok(response.ts)
    }

    /// Post a threaded reply under an existing message.
    pub async fn post_threaded(
        &self,
        channel: &SlackChannelId,
        thread_ts: &SlackTs,
        text: &str,
    ) -> Result<()> {
        let session = self.client.open_session(&self.bot_token);
        let request = SlackApiChatPostMessageRequest::new(
            channel.clone(),
            SlackMessageContent::new().with_text(text.into()),
        )
        .with_thread_ts(thread_ts.clone());
        session.chat_post_message(&request).await?;
        Ok(())
    }

    /// Open (or fetch) the DM channel with a user.
    pub async fn open_dm(&self, user_id: &str) -> Result<SlackChannelId> {
        let session = self.client.open_session(&self.bot_token);
        let request =
            SlackApiConversationsOpenRequest::new().with_users(vec![user_id.to_string().into()]);
        let response = session.conversations_open(&request).await?;
        Ok(response.channel.id)
    }

    /// Render the founder-facing suggestion DM.
    #[must_use]
    pub fn format_suggestion_message(suggestion: &Suggestion) -> String {
        format!(
            "\u{1F440} This might be worth posting:\n\n\
             *INSIGHT:*\n{insight}\n\n\
             *Why this works:*\n{why}\n\n\
             *LinkedIn Draft:*\n---\n{linkedin}\n---\n\n\
             *X Draft:*\n---\n{x}\n---\n\n\
             React with:\n\
             \u{1F44D} Save   \u{1F501} Rewrite   \u{274C} Reject",
            insight = suggestion.insight,
            why = suggestion.why_it_works,
            linkedin = suggestion.linkedin_draft,
            x = suggestion.x_draft,
        )
    }
}

#[async_trait]
impl SuggestionDelivery for SlackOutbound {
    async fn deliver(&self, suggestion: &Suggestion) -> Result<DeliveryReceipt> {
        let channel = self.open_dm(&self.founder_user_id).await?;
        let ts = self
            .post_message(&channel, &Self::format_suggestion_message(suggestion))
            .await?;
        info!(suggestion_id = %suggestion.id, channel = %channel, "delivered suggestion");
        Ok(DeliveryReceipt {
            channel: channel.to_string(),
            ts: ts.to_string(),
        })
    }
}
