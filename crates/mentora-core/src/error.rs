// Error types for the agent core

use thiserror::Error;

/// Result type alias for agent core operations
pub type Result<T> = std::result::Result<T, Error>;

/// What kind of registry entry a lookup failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Agent,
    Tool,
    Prompt,
}

impl std::fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryKind::Agent => write!(f, "agent"),
            RegistryKind::Tool => write!(f, "tool"),
            RegistryKind::Prompt => write!(f, "prompt"),
        }
    }
}

/// Errors that can occur during agent execution
#[derive(Debug, Error)]
pub enum Error {
    /// Requested (id, version) absent from the registry
    #[error("{kind} not found: {id}@{version}")]
    NotFound {
        kind: RegistryKind,
        id: String,
        version: String,
    },

    /// LLM collaborator error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Tool execution error
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// Memory collaborator error
    #[error("Memory error: {0}")]
    Memory(String),

    /// Prompt source error
    #[error("Prompt source error: {0}")]
    Prompt(String),

    /// Callback handler error
    #[error("Callback error: {0}")]
    Callback(String),

    /// Payload (de)serialization error
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Error {
    /// Create a registry not-found error
    pub fn not_found(kind: RegistryKind, id: impl Into<String>, version: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
            version: version.into(),
        }
    }

    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Error::Llm(msg.into())
    }

    /// Create a tool execution error
    pub fn tool(msg: impl Into<String>) -> Self {
        Error::Tool(msg.into())
    }

    /// Create a memory error
    pub fn memory(msg: impl Into<String>) -> Self {
        Error::Memory(msg.into())
    }

    /// Create a prompt source error
    pub fn prompt(msg: impl Into<String>) -> Self {
        Error::Prompt(msg.into())
    }

    /// Create a callback error
    pub fn callback(msg: impl Into<String>) -> Self {
        Error::Callback(msg.into())
    }
}
