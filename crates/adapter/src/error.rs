//! Error types for the MCP adapter.

use thiserror::Error;

/// Main error type for the adapter.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Configuration errors (invalid JSON/YAML, missing fields)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Startup errors (spec unusable, transport failed to initialize)
    #[error("Startup error: {0}")]
    Startup(String),

    /// Runtime errors (server task failed)
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
