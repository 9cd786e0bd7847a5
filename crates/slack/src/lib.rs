//! Slack integration for chorus.
//!
//! Uses slack-morphism's Socket Mode listener to receive events via WebSocket
//! without requiring a public HTTP endpoint, and the Web API session for
//! outbound messages.

pub mod commands;
pub mod outbound;
pub mod reactions;
pub mod socket;

pub use {
    outbound::SlackOutbound,
    socket::{build_client, start_socket_mode},
};
