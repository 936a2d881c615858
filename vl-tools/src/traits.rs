use crate::error::{Result, ToolError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Static declaration of a local function: what the model sees, and what
/// incoming arguments are bound against.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: vec![],
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for p in &self.parameters {
            let mut prop = Map::new();
            prop.insert("type".to_string(), serde_json::json!(p.kind));
            if !p.description.is_empty() {
                prop.insert("description".to_string(), Value::String(p.description.clone()));
            }
            properties.insert(p.name.clone(), Value::Object(prop));
            if p.required {
                required.push(Value::String(p.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Bind provider-supplied arguments to the declared parameters.
    ///
    /// Arguments must be a JSON object carrying every required parameter and
    /// nothing undeclared. Types are not coerced or checked here.
    pub fn bind(&self, arguments: &Value) -> Result<Map<String, Value>> {
        let args = match arguments {
            Value::Object(m) => m,
            // A call with no arguments at all is an empty object.
            Value::Null => return self.bind(&Value::Object(Map::new())),
            other => {
                return Err(self.mismatch(format!("expected a JSON object, got {other}")));
            }
        };

        if let Some(unexpected) = args
            .keys()
            .find(|k| !self.parameters.iter().any(|p| &p.name == *k))
        {
            return Err(self.mismatch(format!("unexpected argument {unexpected:?}")));
        }

        let missing: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required && !args.contains_key(&p.name))
            .map(|p| p.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(self.mismatch(format!(
                "missing required argument(s): {}",
                missing.join(", ")
            )));
        }

        Ok(args.clone())
    }

    fn mismatch(&self, reason: String) -> ToolError {
        ToolError::ArgumentMismatch {
            function: self.name.clone(),
            reason,
        }
    }
}

#[async_trait]
pub trait LocalFunction: Send + Sync {
    fn spec(&self) -> FunctionSpec;
    /// Called with arguments already bound by [`FunctionSpec::bind`].
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value>;
}

pub fn to_llm_tool_def(function: &dyn LocalFunction) -> vl_llm::ToolDefinition {
    let spec = function.spec();
    vl_llm::ToolDefinition {
        parameters: spec.json_schema(),
        name: spec.name,
        description: spec.description,
    }
}

pub fn require_string(args: &Map<String, Value>, key: &str) -> Result<String> {
    let Some(v) = args.get(key) else {
        return Err(ToolError::InvalidArguments(format!("missing key: {key}")));
    };
    match v {
        Value::String(s) => Ok(s.clone()),
        other => Err(ToolError::InvalidArguments(format!(
            "key {key} must be string, got {other:?}"
        ))),
    }
}

pub fn optional_string(args: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    let Some(v) = args.get(key) else {
        return Ok(None);
    };
    match v {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(ToolError::InvalidArguments(format!(
            "key {key} must be string, got {other:?}"
        ))),
    }
}
