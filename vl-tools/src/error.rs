use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Supplied arguments do not bind to the function's declared parameters.
    #[error("arguments for {function} do not match its parameters: {reason}")]
    ArgumentMismatch { function: String, reason: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Name rejected by at least one provider's tool-name rules.
    #[error("invalid function name: {0}")]
    InvalidName(String),

    #[error("function registered twice: {0}")]
    DuplicateFunction(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidArguments(e.to_string())
    }
}
