//! OpenAI-compatible chat-completions client.

use {
    anyhow::Result,
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde_json::json,
    tracing::{debug, trace, warn},
};

use crate::{CompletionParams, LlmClient, prompts::SYSTEM_PROMPT, shared_http_client};

/// Client for any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAiClient {
    api_key: Secret<String>,
    model: String,
    base_url: String,
    client: &'static reqwest::Client,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(api_key: Secret<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            base_url: base_url.into(),
            client: shared_http_client(),
        }
    }

    async fn chat(&self, body: serde_json::Value) -> Result<String> {
        debug!(model = %self.model, "chat completion request");
        trace!(body = %body, "request body");

        let http_resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(status = %status, model = %self.model, body = %body_text, "completion API error");
            anyhow::bail!("completion API error HTTP {status}: {body_text}");
        }

        let resp = http_resp.json::<serde_json::Value>().await?;
        trace!(response = %resp, "raw response");

        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToString::to_string);

        content.ok_or_else(|| anyhow::anyhow!("completion API returned no content"))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str, params: CompletionParams) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });
        self.chat(body).await
    }

    async fn complete_json(&self, prompt: &str, temperature: f32) -> Result<serde_json::Value> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": temperature,
            "response_format": { "type": "json_object" },
        });

        // One retry on malformed/empty output before giving up.
        let mut last_error = None;
        for attempt in 0..2 {
            match self.chat(body.clone()).await {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(value) => return Ok(value),
                    Err(e) => {
                        warn!(attempt, error = %e, "completion was not valid JSON");
                        last_error = Some(anyhow::Error::from(e).context("malformed JSON completion"));
                    },
                },
                Err(e) => {
                    warn!(attempt, error = %e, "JSON completion call failed");
                    last_error = Some(e);
                },
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("JSON completion failed")))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> OpenAiClient {
        OpenAiClient::new(Secret::new("sk-test".into()), "test-model", server.url())
    }

    fn completion_body(content: &str) -> String {
        serde_json::to_string(&json!({
            "choices": [ { "message": { "role": "assistant", "content": content } } ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn complete_returns_trimmed_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(completion_body("  a draft post  "))
            .create_async()
            .await;

        let text = client_for(&server)
            .complete("write something", CompletionParams::default())
            .await
            .unwrap();
        assert_eq!(text, "a draft post");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("upstream broke")
            .create_async()
            .await;

        let err = client_for(&server)
            .complete("write something", CompletionParams::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn complete_json_retries_once_on_malformed_output() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let mut server = mockito::Server::new_async().await;
        let calls = std::sync::Arc::new(AtomicUsize::new(0));
        let calls_in_mock = std::sync::Arc::clone(&calls);
        // First response is garbage, the retry gets valid JSON.
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body_from_request(move |_| {
                if calls_in_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                    completion_body("not json at all").into_bytes()
                } else {
                    completion_body(r#"{"summary": "ok"}"#).into_bytes()
                }
            })
            .expect(2)
            .create_async()
            .await;

        let value = client_for(&server).complete_json("summarize", 0.3).await.unwrap();
        assert_eq!(value["summary"], "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_json_gives_up_after_second_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion_body("still not json"))
            .expect(2)
            .create_async()
            .await;

        let err = client_for(&server).complete_json("summarize", 0.3).await.unwrap_err();
        assert!(err.to_string().contains("malformed"));
        mock.assert_async().await;
    }
}
