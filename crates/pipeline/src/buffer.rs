//! Message-buffer readiness rules and LLM formatting.

use chorus_store::StoredMessage;

/// Channels with at least this many messages are summarized on a scheduled
/// run even below the volume threshold.
pub const MIN_MESSAGES_TIME_TRIGGER: usize = 3;

/// Why (or whether) a channel's buffer should be summarized now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferReadiness {
    NotReady,
    /// The buffer reached `min_messages_for_summary`.
    VolumeThreshold,
    /// A scheduled run arrived and the buffer holds enough to bother.
    WindowElapsed,
}

impl BufferReadiness {
    #[must_use]
    pub fn is_ready(self) -> bool {
        !matches!(self, Self::NotReady)
    }
}

/// Decide whether a buffer should be summarized.
///
/// `window_elapsed` is true for scheduled runs (the rolling window just
/// closed) and false for volume checks on message arrival.
#[must_use]
pub fn readiness(
    message_count: usize,
    min_messages: usize,
    window_elapsed: bool,
) -> BufferReadiness {
    if message_count >= min_messages {
        return BufferReadiness::VolumeThreshold;
    }
    if window_elapsed && message_count >= MIN_MESSAGES_TIME_TRIGGER {
        return BufferReadiness::WindowElapsed;
    }
    BufferReadiness::NotReady
}

/// Format buffered messages for LLM consumption: `[HH:MM] User xxxx: text`,
/// one per line, author IDs shortened to their last four characters.
#[must_use]
pub fn format_messages(messages: &[StoredMessage]) -> String {
    messages
        .iter()
        .map(|message| {
            format!(
                "[{}] User {}: {}",
                message.posted_at.format("%H:%M"),
                author_suffix(&message.author_id),
                message.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn author_suffix(author_id: &str) -> &str {
    let len = author_id.len();
    if len <= 4 { author_id } else { &author_id[len - 4..] }
}
