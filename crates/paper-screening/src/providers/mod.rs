//! AI providers behind one capability interface.
//!
//! Each provider owns its endpoint, auth scheme and response envelope; the
//! analysis engine only sees [`AiProvider::call`].

mod anthropic;
mod chat;
mod gemini;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::HttpClient;
use crate::error::{PipelineError, PipelineResult};

pub use anthropic::AnthropicProvider;
pub use chat::ChatCompletionsProvider;
pub use gemini::GeminiProvider;

/// Shared instruction sent as the system message where the envelope has one.
pub(crate) const SYSTEM_PROMPT: &str = "You are an expert academic paper analyst who writes \
     precise, evidence-based assessments of research papers. \
     Always answer with a single JSON object.";

/// Completion budget for one analysis.
pub(crate) const MAX_TOKENS: u32 = 2000;

/// Sampling temperature for analyses.
pub(crate) const TEMPERATURE: f64 = 0.7;

/// Known AI providers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// No network; deterministic local analysis only.
    #[default]
    #[value(name = "rulebased", alias = "rule-based", alias = "default", alias = "none")]
    RuleBased,
    /// OpenAI chat completions.
    #[value(name = "openai")]
    OpenAi,
    /// OpenRouter (OpenAI-compatible).
    #[value(name = "openrouter")]
    OpenRouter,
    /// Volcengine Ark / Doubao (OpenAI-compatible).
    #[value(alias = "ark")]
    Doubao,
    /// Anthropic messages API.
    #[value(alias = "anthropic")]
    Claude,
    /// Google Gemini generateContent.
    #[value(alias = "google")]
    Gemini,
}

impl ProviderKind {
    /// Lowercase provider name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RuleBased => "rulebased",
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::Doubao => "doubao",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
        }
    }

    /// Model used when none is configured.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::RuleBased => "rule-based",
            Self::OpenAi => "gpt-3.5-turbo",
            Self::OpenRouter => "openai/gpt-4o",
            Self::Doubao => "doubao-pro-32k",
            Self::Claude => "claude-3-sonnet-20240229",
            Self::Gemini => "gemini-pro",
        }
    }

    /// API base URL used when none is configured.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::RuleBased => "",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Doubao => "https://ark.cn-beijing.volces.com/api/v3",
            Self::Claude => "https://api.anthropic.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized provider names.
#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "unknown AI provider '{0}' (expected openai, openrouter, doubao, claude, gemini or rulebased)"
)]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" | "none" | "rulebased" | "rule-based" => Ok(Self::RuleBased),
            "openai" => Ok(Self::OpenAi),
            "openrouter" => Ok(Self::OpenRouter),
            "doubao" | "ark" => Ok(Self::Doubao),
            "claude" | "anthropic" => Ok(Self::Claude),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Provider selection and credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Which provider to call.
    pub kind: ProviderKind,

    /// API credential.
    pub api_key: Option<String>,

    /// Model name.
    pub model: String,

    /// Base URL override (tests, proxies).
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Provider with its default model.
    ///
    /// The key is trimmed here so validation and the outgoing auth header
    /// see the same value.
    #[must_use]
    pub fn new(kind: ProviderKind, api_key: Option<String>) -> Self {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        Self {
            kind,
            api_key,
            model: kind.default_model().to_string(),
            base_url: None,
        }
    }

    /// The network-free provider.
    #[must_use]
    pub fn rule_based() -> Self {
        Self::new(ProviderKind::RuleBased, None)
    }

    /// Override the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Effective API base URL without a trailing slash.
    #[must_use]
    pub fn endpoint_base(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
            .trim_end_matches('/')
    }

    /// Check if an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::rule_based()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("has_api_key", &self.has_api_key())
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Check the credential format for the configured provider.
///
/// Every key must be at least 10 characters; provider prefixes are checked
/// where the provider has one. The rule-based provider never validates.
pub fn validate_credential(config: &ProviderConfig) -> PipelineResult<()> {
    let invalid = |reason: &str| {
        Err(PipelineError::ProviderAuthInvalid(format!("{}: {reason}", config.kind)))
    };

    if config.kind == ProviderKind::RuleBased {
        return invalid("no network provider configured");
    }
    let Some(key) = config.api_key.as_deref() else {
        return invalid("missing API key");
    };
    if key.len() < 10 {
        return invalid("API key too short");
    }

    let well_formed = match config.kind {
        ProviderKind::OpenAi => key.starts_with("sk-") && !key.starts_with("sk-or-v1-"),
        ProviderKind::OpenRouter => key.starts_with("sk-or-v1-"),
        ProviderKind::Claude => key.starts_with("sk-ant-"),
        ProviderKind::Gemini => key.starts_with("AIza"),
        ProviderKind::Doubao => uuid::Uuid::parse_str(key).is_ok(),
        ProviderKind::RuleBased => false,
    };

    if well_formed {
        Ok(())
    } else {
        invalid("API key has the wrong format")
    }
}

/// Uniform contract over every AI backend.
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider identity.
    fn kind(&self) -> ProviderKind;

    /// Send a prompt and return the raw completion text.
    async fn call(&self, prompt: &str, model: &str) -> PipelineResult<String>;
}

/// Build the network provider for a configuration.
///
/// Returns `None` for [`ProviderKind::RuleBased`].
#[must_use]
pub fn build_provider(
    config: &ProviderConfig,
    http: HttpClient,
    timeout: Duration,
) -> Option<Box<dyn AiProvider>> {
    let key = config.api_key.clone().unwrap_or_default();
    let base = config.endpoint_base().to_string();
    match config.kind {
        ProviderKind::RuleBased => None,
        kind @ (ProviderKind::OpenAi | ProviderKind::OpenRouter | ProviderKind::Doubao) => {
            Some(Box::new(ChatCompletionsProvider::new(kind, http, base, key, timeout)))
        }
        ProviderKind::Claude => Some(Box::new(AnthropicProvider::new(http, base, key, timeout))),
        ProviderKind::Gemini => Some(Box::new(GeminiProvider::new(http, base, key, timeout))),
    }
}

/// Text completion missing from an otherwise valid envelope.
pub(crate) fn empty_envelope(kind: ProviderKind) -> PipelineError {
    PipelineError::ProviderCallFailure(format!("{kind} response contained no completion text"))
}
