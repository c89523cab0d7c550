//! Google Gemini generateContent.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::{AiProvider, ProviderKind, empty_envelope};
use crate::client::HttpClient;
use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// `POST {base}/models/{model}:generateContent?key=...`.
pub struct GeminiProvider {
    http: HttpClient,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiProvider {
    /// Create the provider.
    #[must_use]
    pub fn new(http: HttpClient, base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            api_key,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl AiProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn call(&self, prompt: &str, model: &str) -> PipelineResult<String> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let params = vec![("key".to_string(), self.api_key.clone())];
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let response: GenerateResponse = self
            .http
            .post_json(&url, &params, &[], &body, self.timeout)
            .await
            .map_err(PipelineError::from_provider)?;

        response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| empty_envelope(ProviderKind::Gemini))
    }
}
