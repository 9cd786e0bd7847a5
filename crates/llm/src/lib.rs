//! Language-model client for chorus.
//!
//! Everything hard (summarization, ranking, generation) is delegated to an
//! OpenAI-compatible chat-completions endpoint; this crate is the thin typed
//! wrapper around it plus the prompt templates the pipeline uses.

pub mod openai;
pub mod prompts;

use {anyhow::Result, async_trait::async_trait};

pub use openai::OpenAiClient;

/// Shared HTTP client for LLM calls.
///
/// Reused across requests to share connection pools, DNS cache, and TLS
/// sessions.
pub fn shared_http_client() -> &'static reqwest::Client {
    static CLIENT: std::sync::LazyLock<reqwest::Client> =
        std::sync::LazyLock::new(reqwest::Client::new);
    &CLIENT
}

/// Sampling parameters for a single completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// Completion interface the pipeline stages program against.
///
/// The production implementation is [`OpenAiClient`]; tests substitute a
/// scripted fake.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Plain text completion under the global system prompt.
    async fn complete(&self, prompt: &str, params: CompletionParams) -> Result<String>;

    /// JSON-mode completion. Malformed or empty output is retried once
    /// before the error is reported to the caller.
    async fn complete_json(&self, prompt: &str, temperature: f32) -> Result<serde_json::Value>;
}
