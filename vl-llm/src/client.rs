use crate::anthropic::{ANTHROPIC_API_BASE, AnthropicBackend};
use crate::backend::{ChatBackend, ChatRequest};
use crate::error::{LlmError, Result};
use crate::openai::{GROQ_API_BASE, OPENAI_API_BASE, OpenAiBackend};
use crate::types::ChatResponse;
use async_trait::async_trait;
use std::fmt;

const GROQ_MODELS: &[&str] = &[
    "llama3-8b-8192",
    "llama3-70b-8192",
    "mixtral-8x7b-32768",
    "gemma-7b-it",
    "gemma2-9b-it",
    "whisper-large-v3",
];

const OPENAI_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-2024-05-13",
    "gpt-4o-2024-08-06",
    "gpt-4o-mini",
    "gpt-4o-mini-2024-07-18",
    "gpt-4-turbo",
    "gpt-4-turbo-2024-04-09",
    "gpt-4-0125-preview",
    "gpt-4-turbo-preview",
    "gpt-4-1106-preview",
    "gpt-4-vision-preview",
    "gpt-4",
    "gpt-4-0314",
    "gpt-4-0613",
    "gpt-4-32k",
    "gpt-4-32k-0314",
    "gpt-4-32k-0613",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    "gpt-3.5-turbo-0301",
    "gpt-3.5-turbo-0613",
    "gpt-3.5-turbo-1106",
    "gpt-3.5-turbo-0125",
    "gpt-3.5-turbo-16k-0613",
];

const ANTHROPIC_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20240620",
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Groq,
    OpenAi,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Groq, Provider::OpenAi, Provider::Anthropic];

    /// Resolve a model name by exact match against the known model tables.
    pub fn for_model(model: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.models().contains(&model))
            .ok_or_else(|| LlmError::UnknownModel(model.to_string()))
    }

    pub fn models(self) -> &'static [&'static str] {
        match self {
            Self::Groq => GROQ_MODELS,
            Self::OpenAi => OPENAI_MODELS,
            Self::Anthropic => ANTHROPIC_MODELS,
        }
    }

    /// Environment variable consulted when no API key is configured.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Groq => GROQ_API_BASE,
            Self::OpenAi => OPENAI_API_BASE,
            Self::Anthropic => ANTHROPIC_API_BASE,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        };
        f.write_str(name)
    }
}

/// HTTP backend for one provider, selected at construction time.
#[derive(Clone)]
pub struct LlmClient {
    provider: Provider,
    backend: ProviderBackend,
}

#[derive(Clone)]
enum ProviderBackend {
    OpenAiCompatible(OpenAiBackend),
    Anthropic(AnthropicBackend),
}

impl LlmClient {
    #[tracing::instrument(level = "debug", skip_all, fields(provider = %provider))]
    pub fn new(provider: Provider, api_key: &str, base_url: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(%e, "reqwest client build failed; falling back to default client");
                reqwest::Client::new()
            });
        let base_url = base_url.unwrap_or(provider.default_base_url());
        let backend = match provider {
            Provider::Groq | Provider::OpenAi => {
                ProviderBackend::OpenAiCompatible(OpenAiBackend::new(http, api_key, base_url))
            }
            Provider::Anthropic => {
                ProviderBackend::Anthropic(AnthropicBackend::with_base_url(http, api_key, base_url))
            }
        };
        Self { provider, backend }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn create(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        match &self.backend {
            ProviderBackend::OpenAiCompatible(c) => c.create(request).await,
            ProviderBackend::Anthropic(c) => c.create(request).await,
        }
    }
}

/// Tool names must satisfy `^[a-zA-Z0-9_-]{1,64}$` for every supported provider.
pub fn validate_tool_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 {
        return Err(LlmError::InvalidInput(format!(
            "tool name must be 1-64 characters, got {}",
            name.len()
        )));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(LlmError::InvalidInput(format!(
            "tool name {name:?} contains invalid character {ch:?}"
        )));
    }
    Ok(())
}
