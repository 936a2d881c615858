use crate::error::{Result, ToolError};
use crate::traits::{LocalFunction, to_llm_tool_def};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// The set of local functions callable by name; names are unique.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: Vec<Arc<dyn LocalFunction>>,
}

impl FunctionRegistry {
    pub fn new(functions: Vec<Arc<dyn LocalFunction>>) -> Result<Self> {
        let mut registry = Self::default();
        for f in functions {
            registry.register(f)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, function: Arc<dyn LocalFunction>) -> Result<()> {
        let spec = function.spec();
        let schema = spec.json_schema();
        let name = vl_llm::ToolDefinition::validated(spec.name, spec.description, schema)
            .map_err(|e| ToolError::InvalidName(e.to_string()))?
            .name;
        if self.get(&name).is_some() {
            return Err(ToolError::DuplicateFunction(name));
        }
        self.functions.push(function);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LocalFunction>> {
        self.functions
            .iter()
            .find(|f| f.spec().name == name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.functions.iter().map(|f| f.spec().name).collect()
    }

    pub fn definitions(&self) -> Vec<vl_llm::ToolDefinition> {
        self.functions
            .iter()
            .map(|f| to_llm_tool_def(f.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Look up `name`, bind `arguments` to its declared parameters, and call it.
    #[tracing::instrument(level = "debug", skip(self, arguments))]
    pub async fn invoke(&self, name: &str, arguments: &Value) -> Result<Value> {
        let function = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownFunction(name.to_string()))?;
        let bound = function.spec().bind(arguments)?;

        let started = Instant::now();
        let out = function.call(bound).await?;
        tracing::debug!(
            latency_ms = started.elapsed().as_millis() as u64,
            "local function executed"
        );
        Ok(out)
    }
}
