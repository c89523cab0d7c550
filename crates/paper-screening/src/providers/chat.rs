//! OpenAI-compatible chat completions (OpenAI, OpenRouter, Doubao).

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::{AiProvider, MAX_TOKENS, ProviderKind, SYSTEM_PROMPT, TEMPERATURE, empty_envelope};
use crate::client::HttpClient;
use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// `POST {base}/chat/completions` with a bearer token.
pub struct ChatCompletionsProvider {
    kind: ProviderKind,
    http: HttpClient,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl ChatCompletionsProvider {
    /// Create a provider for one of the OpenAI-compatible backends.
    #[must_use]
    pub fn new(
        kind: ProviderKind,
        http: HttpClient,
        base_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Self {
        Self {
            kind,
            http,
            endpoint: format!("{base_url}/chat/completions"),
            api_key,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl AiProvider for ChatCompletionsProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn call(&self, prompt: &str, model: &str) -> PipelineResult<String> {
        let body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE
        });

        let auth = format!("Bearer {}", self.api_key);
        let mut headers = vec![("Authorization", auth.as_str())];
        if self.kind == ProviderKind::OpenRouter {
            headers.push(("HTTP-Referer", "https://github.com/paper-screening/paper-screening-rs"));
            headers.push(("X-Title", "Paper Screening Tool"));
        }

        let response: ChatResponse = self
            .http
            .post_json(&self.endpoint, &[], &headers, &body, self.timeout)
            .await
            .map_err(PipelineError::from_provider)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| empty_envelope(self.kind))
    }
}
