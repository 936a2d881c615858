use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Unknown model, transport failure, or unparseable provider response.
    #[error(transparent)]
    Llm(#[from] vl_llm::LlmError),

    #[error(transparent)]
    Tool(#[from] vl_tools::ToolError),

    #[error("no api key for {provider}: pass one explicitly or set {env_var}")]
    MissingApiKey {
        provider: vl_llm::Provider,
        env_var: &'static str,
    },

    #[error("invalid config: {0}")]
    Config(String),
}

impl From<toml::de::Error> for ClientError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
