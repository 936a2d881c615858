use crate::error::Result;
use crate::types::{ChatMessage, ChatResponse, ToolDefinition};
use async_trait::async_trait;

/// Everything a provider needs for one round trip.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    /// Dedicated system instruction, sent alongside `messages`.
    pub system: Option<&'a str>,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    pub tools: &'a [ToolDefinition],
    /// Provider-specific body fields, merged into the request as-is.
    pub extra: &'a serde_json::Map<String, serde_json::Value>,
}

/// A stateless chat completion endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn create(&self, request: &ChatRequest<'_>) -> Result<ChatResponse>;
}
