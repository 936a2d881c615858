//! VersaLLM: one client surface over Groq, OpenAI and Anthropic chat models.
//!
//! [`VersaClient`] resolves a model name to its provider, owns the
//! conversation memory, and runs the tool-calling loop, yielding one
//! [`TurnResult`] per completed model turn.

mod client;
mod config;
mod error;
mod memory;
mod response;

#[cfg(test)]
mod testing;

pub use client::{TurnStream, VersaClient};
pub use config::ClientOptions;
pub use error::{ClientError, Result};
pub use memory::ConversationMemory;
pub use response::{ToolInvocation, TurnResult};

pub use vl_llm::{ChatBackend, ChatMessage, Provider, Role, ToolDefinition, Usage};
pub use vl_tools::{FnFunction, FunctionSpec, LocalFunction, ParamKind, ParamSpec};
