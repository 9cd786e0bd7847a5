//! Configuration loading for chorus.
//!
//! All configuration is supplied through the environment (a `.env` file is
//! honored when the CLI calls dotenvy before loading). Secrets are wrapped in
//! [`secrecy::Secret`] so they never land in logs or Debug output.

pub mod loader;
pub mod schema;

pub use {
    loader::from_env,
    schema::{ChorusConfig, DatabaseConfig, OpenAiConfig, PipelineConfig, ServerConfig, SlackConfig},
};
