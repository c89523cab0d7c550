//! Anthropic messages API.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::{AiProvider, MAX_TOKENS, ProviderKind, SYSTEM_PROMPT, empty_envelope};
use crate::client::HttpClient;
use crate::error::{PipelineError, PipelineResult};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// `POST {base}/messages` with `x-api-key`.
pub struct AnthropicProvider {
    http: HttpClient,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl AnthropicProvider {
    /// Create the provider.
    #[must_use]
    pub fn new(http: HttpClient, base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            http,
            endpoint: format!("{base_url}/messages"),
            api_key,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl AiProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    async fn call(&self, prompt: &str, model: &str) -> PipelineResult<String> {
        let body = json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "system": SYSTEM_PROMPT,
            "messages": [{"role": "user", "content": prompt}]
        });
        let headers = [
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
        ];

        let response: MessagesResponse = self
            .http
            .post_json(&self.endpoint, &[], &headers, &body, self.timeout)
            .await
            .map_err(PipelineError::from_provider)?;

        // First text block; tool-use blocks carry no text.
        response
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| empty_envelope(ProviderKind::Claude))
    }
}
