use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// The language model could not be reached after the allowed retry.
    #[error("Upstream model unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The per-message tool loop guard tripped.
    #[error("Tool loop exceeded {limit} model round-trips")]
    ExecutionBoundExceeded { limit: usize },

    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Transient failures are worth one more attempt against the model.
    pub fn is_transient(&self) -> bool {
        matches!(self, AgentError::Network(_) | AgentError::Timeout(_))
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        AgentError::Io(e.to_string())
    }
}
