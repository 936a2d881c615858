//! Client construction options.

use crate::error::{ClientError, Result};
use serde::Deserialize;
use vl_llm::Provider;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientOptions {
    /// Falls back to the provider's environment variable when absent.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Override for the provider's API base URL (proxies, local gateways).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Provider-specific request fields, passed through untouched.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_max_output_tokens() -> u32 {
    1024
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            temperature: 0.0,
            max_output_tokens: default_max_output_tokens(),
            base_url: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl ClientOptions {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let options: Self = toml::from_str(s)?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Range checks common to all providers; per-provider limits are left to the backend.
    pub fn validate(&self) -> Result<()> {
        if self.max_output_tokens == 0 {
            return Err(ClientError::Config(
                "max_output_tokens must be positive".to_string(),
            ));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(ClientError::Config(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    pub(crate) fn resolve_api_key(&self, provider: Provider) -> Result<String> {
        self.resolve_api_key_with(provider, |var| std::env::var(var).ok())
    }

    fn resolve_api_key_with(
        &self,
        provider: Provider,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }
        let env_var = provider.api_key_env();
        match lookup(env_var) {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ClientError::MissingApiKey { provider, env_var }),
        }
    }
}
