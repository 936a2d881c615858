use crate::backend::{ChatBackend, ChatRequest};
use crate::error::{LlmError, Result};
use crate::types::{ChatMessage, ChatResponse, FinishReason, Role, ToolCall, ToolDefinition, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub(crate) const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicBackend {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicBackend {
    pub fn new(http: reqwest::Client, api_key: &str) -> Self {
        Self::with_base_url(http, api_key, ANTHROPIC_API_BASE)
    }

    pub fn with_base_url(http: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    #[tracing::instrument(level = "info", skip_all, fields(model = %request.model))]
    async fn create(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        let req = AnthropicRequest::new(request)?;
        let started = Instant::now();

        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(
            %status,
            latency_ms = started.elapsed().as_millis() as u64,
            body_len = body.len(),
            "anthropic chat completed"
        );
        if !status.is_success() {
            return Err(LlmError::Backend(format!(
                "anthropic chat status={status} body={body}"
            )));
        }

        let parsed: AnthropicResponse = serde_json::from_str(&body)?;
        parsed.try_into()
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl AnthropicRequest {
    fn new(request: &ChatRequest<'_>) -> Result<Self> {
        let mut system = request.system.map(str::trim).unwrap_or_default().to_string();
        let mut out_messages: Vec<AnthropicMessage> = Vec::new();

        for m in request.messages {
            match m.role {
                Role::System => {
                    if !system.is_empty() {
                        system.push('\n');
                    }
                    system.push_str(m.content.trim());
                }
                Role::User => out_messages.push(to_anthropic_user_message(m)),
                Role::Assistant => match to_anthropic_assistant_message(m) {
                    Some(msg) => out_messages.push(msg),
                    // An empty turn carries nothing and Anthropic rejects empty content.
                    None => tracing::debug!("skipping empty assistant message"),
                },
                Role::Tool => {
                    let block = to_anthropic_tool_result_block(m)?;
                    // Results answering one assistant turn travel in a single user message.
                    let merge = out_messages.last().is_some_and(AnthropicMessage::is_tool_results);
                    match out_messages.last_mut() {
                        Some(last) if merge => last.content.push(block),
                        _ => out_messages.push(AnthropicMessage {
                            role: "user".to_string(),
                            content: vec![block],
                        }),
                    }
                }
            }
        }

        Ok(Self {
            model: request.model.to_string(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system,
            messages: out_messages,
            tools: request.tools.iter().map(to_anthropic_tool).collect(),
            extra: request.extra.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

fn to_anthropic_tool(t: &ToolDefinition) -> AnthropicTool {
    AnthropicTool {
        name: t.name.clone(),
        description: t.description.clone(),
        input_schema: t.parameters.clone(),
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

impl AnthropicMessage {
    fn is_tool_results(&self) -> bool {
        self.role == "user"
            && !self.content.is_empty()
            && self
                .content
                .iter()
                .all(|b| matches!(b, AnthropicContentBlock::ToolResult { .. }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

fn to_anthropic_user_message(m: &ChatMessage) -> AnthropicMessage {
    AnthropicMessage {
        role: "user".to_string(),
        content: vec![AnthropicContentBlock::Text {
            text: m.content.clone(),
        }],
    }
}

fn to_anthropic_tool_result_block(m: &ChatMessage) -> Result<AnthropicContentBlock> {
    let tool_use_id = m.tool_call_id.clone().ok_or_else(|| {
        LlmError::InvalidInput("tool result message is missing tool_call_id".to_string())
    })?;
    Ok(AnthropicContentBlock::ToolResult {
        tool_use_id,
        content: m.content.clone(),
    })
}

fn to_anthropic_assistant_message(m: &ChatMessage) -> Option<AnthropicMessage> {
    let mut blocks = Vec::new();
    if !m.content.trim().is_empty() {
        blocks.push(AnthropicContentBlock::Text {
            text: m.content.clone(),
        });
    }
    for tc in &m.tool_calls {
        let input: serde_json::Value = match serde_json::from_str(&tc.arguments) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    tool_call_id = %tc.id,
                    tool_name = %tc.name,
                    error = %e,
                    "stored tool arguments are not valid JSON; sending empty input"
                );
                serde_json::json!({})
            }
        };
        blocks.push(AnthropicContentBlock::ToolUse {
            id: tc.id.clone(),
            name: tc.name.clone(),
            input,
        });
    }
    if blocks.is_empty() {
        return None;
    }
    Some(AnthropicMessage {
        role: "assistant".to_string(),
        content: blocks,
    })
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl TryFrom<AnthropicResponse> for ChatResponse {
    type Error = LlmError;

    fn try_from(v: AnthropicResponse) -> Result<Self> {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in v.content {
            match block {
                AnthropicContentBlock::Text { text } => content.push_str(&text),
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall {
                        id,
                        name,
                        arguments: serde_json::to_string(&input)?,
                    });
                }
                AnthropicContentBlock::ToolResult { .. } => {}
            }
        }

        Ok(ChatResponse {
            message: ChatMessage {
                role: Role::Assistant,
                content,
                tool_calls,
                tool_call_id: None,
            },
            usage: Usage {
                input_tokens: u32::try_from(v.usage.input_tokens).unwrap_or(u32::MAX),
                output_tokens: u32::try_from(v.usage.output_tokens).unwrap_or(u32::MAX),
            },
            finish_reason: FinishReason::from_provider(
                v.stop_reason.as_deref().unwrap_or("unknown"),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request<'a>(
        system: Option<&'a str>,
        messages: &'a [ChatMessage],
        tools: &'a [ToolDefinition],
        extra: &'a serde_json::Map<String, serde_json::Value>,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: "claude-3-haiku-20240307",
            system,
            messages,
            temperature: 0.0,
            max_tokens: 1024,
            tools,
            extra,
        }
    }

    #[test]
    fn tool_definitions_flatten_to_input_schema() {
        let def = ToolDefinition {
            name: "cancel_order".to_string(),
            description: "Cancel an order by order ID.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": { "order_id": { "type": "string", "description": "The unique ID of the order." } },
                "required": ["order_id"]
            }),
        };

        let native = serde_json::to_value(to_anthropic_tool(&def)).expect("serialize");
        assert_eq!(native["name"], "cancel_order");
        assert_eq!(native["description"], "Cancel an order by order ID.");
        assert_eq!(native["input_schema"], def.parameters);
        assert!(native.get("type").is_none());
        assert!(native.get("function").is_none());

        let back = ToolDefinition {
            name: native["name"].as_str().unwrap_or_default().to_string(),
            description: native["description"].as_str().unwrap_or_default().to_string(),
            parameters: native["input_schema"].clone(),
        };
        assert_eq!(back, def);
    }

    #[test]
    fn system_field_combines_dedicated_prompt_and_history_entries() {
        let messages = vec![ChatMessage::system("Answer in French."), ChatMessage::user("hi")];
        let extra = serde_json::Map::new();
        let req = AnthropicRequest::new(&request(
            Some("You are a helpful assistant."),
            &messages,
            &[],
            &extra,
        ))
        .expect("request");
        let v = serde_json::to_value(&req).expect("serialize");

        assert_eq!(v["system"], "You are a helpful assistant.\nAnswer in French.");
        assert_eq!(v["messages"].as_array().map(Vec::len), Some(1));
        assert_eq!(v["messages"][0]["content"][0]["type"], "text");
        assert!(v.get("tools").is_none());
    }

    #[test]
    fn empty_system_is_omitted() {
        let messages = vec![ChatMessage::user("hi")];
        let extra = serde_json::Map::new();
        let req = AnthropicRequest::new(&request(None, &messages, &[], &extra)).expect("request");
        let v = serde_json::to_value(&req).expect("serialize");
        assert!(v.get("system").is_none());
    }

    #[test]
    fn consecutive_tool_results_merge_into_one_user_message() {
        let messages = vec![
            ChatMessage::user("look up both"),
            ChatMessage {
                role: Role::Assistant,
                content: "Checking.".to_string(),
                tool_calls: vec![
                    ToolCall {
                        id: "toolu_1".to_string(),
                        name: "get_order_details".to_string(),
                        arguments: r#"{"order_id":"1"}"#.to_string(),
                    },
                    ToolCall {
                        id: "toolu_2".to_string(),
                        name: "get_order_details".to_string(),
                        arguments: r#"{"order_id":"2"}"#.to_string(),
                    },
                ],
                tool_call_id: None,
            },
            ChatMessage::tool_result("toolu_1", "null"),
            ChatMessage::tool_result("toolu_2", r#"{"item":"Laptop"}"#),
        ];
        let extra = serde_json::Map::new();
        let req = AnthropicRequest::new(&request(None, &messages, &[], &extra)).expect("request");
        let v = serde_json::to_value(&req).expect("serialize");

        let out = v["messages"].as_array().expect("messages");
        assert_eq!(out.len(), 3);
        assert_eq!(out[1]["role"], "assistant");
        assert_eq!(out[1]["content"][0]["type"], "text");
        assert_eq!(out[1]["content"][1]["type"], "tool_use");
        assert_eq!(out[1]["content"][1]["input"]["order_id"], "1");
        assert_eq!(out[2]["role"], "user");
        assert_eq!(out[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(out[2]["content"][1]["tool_use_id"], "toolu_2");
        assert_eq!(out[2]["content"][0]["content"], "null");
    }

    #[test]
    fn tool_result_without_call_id_is_rejected() {
        let mut orphan = ChatMessage::tool_result("x", "null");
        orphan.tool_call_id = None;
        let messages = vec![orphan];
        let extra = serde_json::Map::new();
        let err = AnthropicRequest::new(&request(None, &messages, &[], &extra))
            .expect_err("missing id");
        assert!(matches!(err, LlmError::InvalidInput(_)));
    }

    #[test]
    fn parses_tool_use_response() {
        let body = json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                { "type": "text", "text": "Let me look that up." },
                { "type": "tool_use", "id": "toolu_1", "name": "get_order_details", "input": { "order_id": "12345" } }
            ],
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 420, "output_tokens": 61 }
        });
        let parsed: AnthropicResponse = serde_json::from_value(body).expect("parse");
        let resp: ChatResponse = parsed.try_into().expect("convert");

        assert_eq!(resp.finish_reason, FinishReason::ToolUse);
        assert_eq!(resp.message.content, "Let me look that up.");
        assert_eq!(resp.message.tool_calls[0].id, "toolu_1");
        let args: serde_json::Value =
            serde_json::from_str(&resp.message.tool_calls[0].arguments).expect("args");
        assert_eq!(args, json!({ "order_id": "12345" }));
        assert_eq!(resp.usage.input_tokens, 420);
        assert_eq!(resp.usage.output_tokens, 61);
    }

    #[test]
    fn empty_end_turn_does_not_poison_later_requests() {
        let parsed: AnthropicResponse = serde_json::from_value(json!({
            "content": [],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 12, "output_tokens": 1 }
        }))
        .expect("parse");
        let resp: ChatResponse = parsed.try_into().expect("convert");

        let messages = vec![
            ChatMessage::user("thanks"),
            resp.message,
            ChatMessage::user("one more question"),
        ];
        let extra = serde_json::Map::new();
        let req = AnthropicRequest::new(&request(None, &messages, &[], &extra)).expect("request");
        let v = serde_json::to_value(&req).expect("serialize");

        let out = v["messages"].as_array().expect("messages");
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|m| m["role"] == "user"));
    }

    #[test]
    fn malformed_stored_arguments_become_empty_input() {
        let messages = vec![ChatMessage {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "toolu_9".to_string(),
                name: "cancel_order".to_string(),
                arguments: "{not json".to_string(),
            }],
            tool_call_id: None,
        }];
        let extra = serde_json::Map::new();
        let req = AnthropicRequest::new(&request(None, &messages, &[], &extra)).expect("request");
        let v = serde_json::to_value(&req).expect("serialize");
        assert_eq!(v["messages"][0]["content"][0]["input"], json!({}));
        assert_eq!(v["messages"][0]["content"][0]["id"], "toolu_9");
    }

    #[test]
    fn oversized_usage_counters_saturate() {
        let parsed: AnthropicResponse = serde_json::from_value(json!({
            "content": [{ "type": "text", "text": "ok" }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 5_000_000_000u64, "output_tokens": 3 }
        }))
        .expect("parse");
        let resp: ChatResponse = parsed.try_into().expect("convert");
        assert_eq!(resp.usage.input_tokens, u32::MAX);
        assert_eq!(resp.usage.output_tokens, 3);
    }

    #[test]
    fn parses_end_turn_response() {
        let parsed: AnthropicResponse = serde_json::from_value(json!({
            "content": [{ "type": "text", "text": "Your laptop ships tomorrow." }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 10, "output_tokens": 7 }
        }))
        .expect("parse");
        let resp: ChatResponse = parsed.try_into().expect("convert");
        assert_eq!(resp.finish_reason, FinishReason::Stop);
        assert!(resp.message.tool_calls.is_empty());
        assert_eq!(resp.message.content, "Your laptop ships tomorrow.");
    }
}
