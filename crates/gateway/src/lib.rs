//! Thin HTTP API over persisted state plus the manual pipeline trigger.

pub mod server;
pub mod state;

pub use {
    server::{build_app, start_server},
    state::AppState,
};
