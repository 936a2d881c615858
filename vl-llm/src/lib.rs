//! Provider wire layer for the VersaLLM facade.
//!
//! Pure HTTP clients for OpenAI-compatible (OpenAI, Groq) and Anthropic chat
//! APIs behind the [`ChatBackend`] seam, plus the unified message types.

mod anthropic;
mod backend;
mod client;
mod error;
mod openai;
mod types;

pub use anthropic::AnthropicBackend;
pub use backend::{ChatBackend, ChatRequest};
pub use client::{LlmClient, Provider, validate_tool_name};
pub use error::{LlmError, Result};
pub use openai::OpenAiBackend;
pub use types::{ChatMessage, ChatResponse, FinishReason, Role, ToolCall, ToolDefinition, Usage};
