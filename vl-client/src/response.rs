use serde::Serialize;
use serde_json::{Map, Value};
use vl_llm::Usage;

/// Which local function a turn asked for, and with what arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub name: Option<String>,
    pub input: Map<String, Value>,
}

impl ToolInvocation {
    /// The record for a turn that used no tool.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(name: impl Into<String>, input: Map<String, Value>) -> Self {
        Self {
            name: Some(name.into()),
            input,
        }
    }

    pub fn is_none(&self) -> bool {
        self.name.is_none() && self.input.is_empty()
    }
}

/// Output of one completed model turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResult {
    message: Option<String>,
    model: String,
    tool_used: ToolInvocation,
    usage: Usage,
}

impl TurnResult {
    pub(crate) fn new(
        message: Option<String>,
        model: impl Into<String>,
        tool_used: ToolInvocation,
        usage: Usage,
    ) -> Self {
        Self {
            message,
            model: model.into(),
            tool_used,
            usage,
        }
    }

    /// Assistant text, absent when the turn was pure tool use.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tool_used(&self) -> &ToolInvocation {
        &self.tool_used
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn is_final(&self) -> bool {
        self.tool_used.is_none()
    }
}
