//! The facade: model routing, system-message policy, and the tool-calling loop.

use crate::config::ClientOptions;
use crate::error::Result;
use crate::memory::ConversationMemory;
use crate::response::{ToolInvocation, TurnResult};
use futures_util::Stream;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use vl_llm::{
    ChatBackend, ChatMessage, ChatRequest, FinishReason, LlmClient, Provider, ToolCall,
    ToolDefinition, Usage,
};
use vl_tools::{FunctionRegistry, LocalFunction, ToolError};

/// Turn results of one `completion` call, produced one backend round trip at a time.
///
/// The stream holds the client mutably until dropped. Each element is either
/// a tool-use turn or, last, the final answer; a backend failure is yielded
/// once as `Err` and ends the stream.
pub type TurnStream<'a> = Pin<Box<dyn Stream<Item = Result<TurnResult>> + Send + 'a>>;

pub struct VersaClient {
    provider: Provider,
    model: String,
    options: ClientOptions,
    backend: Arc<dyn ChatBackend>,
    functions: FunctionRegistry,
    memory: ConversationMemory,
    /// Anthropic only: sent as the request's dedicated `system` field.
    system_prompt: Option<String>,
}

impl VersaClient {
    /// Resolve `model` to its provider and connect with the configured API key.
    pub fn new(
        model: &str,
        options: ClientOptions,
        functions: Vec<Arc<dyn LocalFunction>>,
    ) -> Result<Self> {
        let provider = Provider::for_model(model)?;
        let api_key = options.resolve_api_key(provider)?;
        let backend = LlmClient::new(provider, &api_key, options.base_url.as_deref());
        Self::build(provider, model, options, functions, Arc::new(backend))
    }

    /// Like [`VersaClient::new`], but sends every request to `backend`.
    pub fn with_backend(
        model: &str,
        options: ClientOptions,
        functions: Vec<Arc<dyn LocalFunction>>,
        backend: Arc<dyn ChatBackend>,
    ) -> Result<Self> {
        let provider = Provider::for_model(model)?;
        Self::build(provider, model, options, functions, backend)
    }

    fn build(
        provider: Provider,
        model: &str,
        options: ClientOptions,
        functions: Vec<Arc<dyn LocalFunction>>,
        backend: Arc<dyn ChatBackend>,
    ) -> Result<Self> {
        options.validate()?;
        let functions = FunctionRegistry::new(functions)?;
        tracing::debug!(
            %provider,
            model,
            functions = functions.len(),
            "versa client created"
        );
        Ok(Self {
            provider,
            model: model.to_string(),
            options,
            backend,
            functions,
            memory: ConversationMemory::new(),
            system_prompt: None,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Tool definitions for every registered function, ready to pass to `completion`.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.functions.definitions()
    }

    /// Set the system instruction.
    ///
    /// Anthropic keeps it in a dedicated field and the last call wins. Groq and
    /// OpenAI store it as the first memory entry, so only a call made before
    /// any other message takes effect.
    pub fn system_message(&mut self, text: &str) {
        match self.provider {
            Provider::Anthropic => self.system_prompt = Some(text.to_string()),
            Provider::Groq | Provider::OpenAi => {
                if !self.memory.insert_system_if_empty(text) {
                    tracing::debug!(
                        provider = %self.provider,
                        "system message ignored; conversation already started"
                    );
                }
            }
        }
    }

    /// Append `prompt` as a user message and run the tool-calling loop.
    pub fn completion(&mut self, prompt: &str, tools: &[ToolDefinition]) -> TurnStream<'_> {
        self.memory.push(ChatMessage::user(prompt));
        self.run(tools.to_vec())
    }

    /// Replace the whole conversation with `history` and run the tool-calling loop.
    pub fn completion_with_history(
        &mut self,
        history: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> TurnStream<'_> {
        self.memory.replace(history);
        self.run(tools.to_vec())
    }

    fn run(&mut self, tools: Vec<ToolDefinition>) -> TurnStream<'_> {
        tracing::info!(
            provider = %self.provider,
            model = %self.model,
            history_messages = self.memory.len(),
            tools = tools.len(),
            "completion started"
        );
        let state = LoopState {
            client: self,
            tools,
            pending: VecDeque::new(),
            done: false,
        };

        Box::pin(futures_util::stream::unfold(
            state,
            |mut state| async move {
                if let Some(turn) = state.pending.pop_front() {
                    return Some((Ok(turn), state));
                }
                if state.done {
                    return None;
                }
                match state.client.step(&state.tools).await {
                    Ok(step) => {
                        state.done = step.finished;
                        state.pending.extend(step.turns);
                        let turn = state.pending.pop_front()?;
                        Some((Ok(turn), state))
                    }
                    Err(e) => {
                        state.done = true;
                        Some((Err(e), state))
                    }
                }
            },
        ))
    }

    /// One backend round trip: AWAITING_MODEL, then TOOL_REQUESTED or DONE.
    async fn step(&mut self, tools: &[ToolDefinition]) -> Result<Step> {
        let request = ChatRequest {
            model: &self.model,
            system: self.system_prompt.as_deref(),
            messages: self.memory.messages(),
            temperature: self.options.temperature,
            max_tokens: self.options.max_output_tokens,
            tools,
            extra: &self.options.extra,
        };

        let started = Instant::now();
        let response = self.backend.create(&request).await?;
        tracing::info!(
            latency_ms = started.elapsed().as_millis() as u64,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            finish_reason = ?response.finish_reason,
            tool_calls = response.message.tool_calls.len(),
            "model turn completed"
        );

        if response.finish_reason == FinishReason::ToolUse {
            if !response.message.tool_calls.is_empty() {
                let text = Some(response.message.content.clone()).filter(|s| !s.is_empty());
                let calls = response.message.tool_calls.clone();
                self.memory.push(response.message);
                let turns = self.run_tool_calls(calls, text, response.usage).await;
                return Ok(Step {
                    turns,
                    finished: false,
                });
            }
            tracing::warn!("tool use signalled without tool calls; treating turn as final");
        }

        let content = response.message.content;
        if content.trim().is_empty() {
            // Providers reject empty assistant turns on the next request.
            tracing::debug!("empty final answer not added to memory");
        } else {
            self.memory.push(ChatMessage::assistant(content.clone()));
        }
        tracing::info!(
            history_messages = self.memory.len(),
            "completion finished"
        );
        Ok(Step {
            turns: vec![TurnResult::new(
                Some(content),
                &self.model,
                ToolInvocation::none(),
                response.usage,
            )],
            finished: true,
        })
    }

    /// Execute every requested call in order, appending one tool result per call.
    ///
    /// The first result carries the turn's text and usage; later ones carry neither,
    /// so summing usage over a stream counts each round trip once.
    async fn run_tool_calls(
        &mut self,
        calls: Vec<ToolCall>,
        text: Option<String>,
        usage: Usage,
    ) -> Vec<TurnResult> {
        let mut turns = Vec::with_capacity(calls.len());
        for (i, call) in calls.into_iter().enumerate() {
            tracing::info!(
                tool_call_id = %call.id,
                tool_name = %call.name,
                arguments_len = call.arguments.len(),
                "handling tool call"
            );
            let (input, result) = match parse_arguments(&call.arguments) {
                Ok(arguments) => {
                    let input = match &arguments {
                        Value::Object(m) => m.clone(),
                        _ => Map::new(),
                    };
                    (input, self.execute(&call, &arguments).await)
                }
                Err(e) => {
                    tracing::warn!(
                        tool_call_id = %call.id,
                        tool_name = %call.name,
                        error = %e,
                        "tool arguments are not valid JSON"
                    );
                    (Map::new(), Value::Null)
                }
            };

            self.memory
                .push(ChatMessage::tool_result(call.id.as_str(), result.to_string()));

            let (message, usage) = if i == 0 {
                (text.clone(), usage)
            } else {
                (None, Usage::default())
            };
            turns.push(TurnResult::new(
                message,
                &self.model,
                ToolInvocation::new(call.name, input),
                usage,
            ));
        }
        turns
    }

    /// Run a local function; any failure degrades to a `null` result.
    async fn execute(&self, call: &ToolCall, arguments: &Value) -> Value {
        match self.functions.invoke(&call.name, arguments).await {
            Ok(v) => v,
            Err(ToolError::UnknownFunction(_)) => {
                tracing::warn!(
                    tool_call_id = %call.id,
                    tool_name = %call.name,
                    "tool call referenced unknown function"
                );
                Value::Null
            }
            Err(e) => {
                tracing::error!(
                    tool_call_id = %call.id,
                    tool_name = %call.name,
                    error = %e,
                    "local function failed"
                );
                Value::Null
            }
        }
    }
}

struct LoopState<'a> {
    client: &'a mut VersaClient,
    tools: Vec<ToolDefinition>,
    pending: VecDeque<TurnResult>,
    done: bool,
}

struct Step {
    turns: Vec<TurnResult>,
    finished: bool,
}

fn parse_arguments(raw: &str) -> std::result::Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw)
}
