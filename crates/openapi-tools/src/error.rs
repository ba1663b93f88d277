//! Error types for `openapi-mcp-tools`.
//!
//! Build-time failures (loading a spec, translating operations) use [`OpenApiToolsError`].
//! Per-call failures are [`crate::dispatcher::DispatchError`] and never escape a tool call as
//! anything but error text.

use thiserror::Error;

/// Main error type for `OpenAPI` tooling.
#[derive(Error, Debug)]
pub enum OpenApiToolsError {
    /// Runtime errors (unknown tool).
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// `OpenAPI` errors (spec validation, unresolved references).
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    #[error("OpenAPI error: failed to fetch spec from '{url}': {message}")]
    OpenApiSpecFetch { url: String, message: String },

    #[error("OpenAPI error: failed to read spec file '{path}': {source}")]
    OpenApiSpecReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OpenAPI error: failed to parse OpenAPI spec from '{location}': {source}")]
    OpenApiSpecParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A schema reached the translator without a type tag.
    #[error("Schema error: property '{property}' of operation '{operation}' has no type")]
    MissingSchemaType { operation: String, property: String },

    /// JSON conversion errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for `OpenAPI` tooling operations.
pub type Result<T> = std::result::Result<T, OpenApiToolsError>;
