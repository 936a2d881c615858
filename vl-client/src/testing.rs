//! Scripted backend and fixtures shared by the facade tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use vl_llm::{
    ChatBackend, ChatMessage, ChatRequest, ChatResponse, FinishReason, LlmError, Role, ToolCall,
    ToolDefinition, Usage,
};
use vl_tools::{FnFunction, FunctionSpec, LocalFunction, ParamKind, ParamSpec, require_string};

/// Owned copy of a [`ChatRequest`] as the backend received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub tools: Vec<ToolDefinition>,
    pub extra: serde_json::Map<String, Value>,
}

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<vl_llm::Result<ChatResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<vl_llm::Result<ChatResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(vec![]),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn create(&self, request: &ChatRequest<'_>) -> vl_llm::Result<ChatResponse> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(RecordedRequest {
                model: request.model.to_string(),
                system: request.system.map(str::to_string),
                messages: request.messages.to_vec(),
                temperature: request.temperature,
                max_tokens: request.max_tokens,
                tools: request.tools.to_vec(),
                extra: request.extra.clone(),
            });
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Backend("script exhausted".to_string())))
    }
}

pub fn text_response(text: &str) -> vl_llm::Result<ChatResponse> {
    Ok(ChatResponse {
        message: ChatMessage::assistant(text),
        usage: Usage {
            input_tokens: 50,
            output_tokens: 10,
        },
        finish_reason: FinishReason::Stop,
    })
}

/// A tool-use turn requesting each `(id, name, arguments)` in order.
pub fn tool_response(text: &str, calls: &[(&str, &str, &str)]) -> vl_llm::Result<ChatResponse> {
    Ok(ChatResponse {
        message: ChatMessage {
            role: Role::Assistant,
            content: text.to_string(),
            tool_calls: calls
                .iter()
                .map(|(id, name, arguments)| ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                })
                .collect(),
            tool_call_id: None,
        },
        usage: Usage {
            input_tokens: 80,
            output_tokens: 20,
        },
        finish_reason: FinishReason::ToolUse,
    })
}

pub fn order_functions() -> Vec<Arc<dyn LocalFunction>> {
    vec![
        Arc::new(FnFunction::new(
            FunctionSpec::new("get_order_details", "Retrieve details of an order by order ID.")
                .param(ParamSpec::required(
                    "order_id",
                    ParamKind::String,
                    "The unique ID of the order.",
                )),
            |args| {
                let order_id = require_string(args, "order_id")?;
                Ok(json!({ "order_id": order_id, "item": "Laptop", "quantity": 1 }))
            },
        )),
        Arc::new(FnFunction::new(
            FunctionSpec::new("cancel_order", "Cancel an order by order ID.").param(
                ParamSpec::required("order_id", ParamKind::String, "The unique ID of the order."),
            ),
            |args| {
                let order_id = require_string(args, "order_id")?;
                Ok(json!({ "order_id": order_id, "status": "Cancelled" }))
            },
        )),
    ]
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
