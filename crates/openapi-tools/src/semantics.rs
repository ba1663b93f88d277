//! MCP tool annotations derived from HTTP method semantics (RFC 9110).

use rmcp::model::ToolAnnotations;

/// Hints for a tool that issues `method` (case-insensitive).
///
/// Every generated tool talks to an external API, so `openWorldHint` is always set. Extension
/// methods get no other hints.
#[must_use]
pub fn annotations_for_method(method: &str) -> ToolAnnotations {
    // (read_only, destructive, idempotent)
    let (read_only, destructive, idempotent) = match method.to_ascii_uppercase().as_str() {
        "GET" | "HEAD" | "OPTIONS" | "TRACE" => (Some(true), Some(false), Some(true)),
        "POST" => (Some(false), Some(false), Some(false)),
        "PUT" | "DELETE" => (Some(false), Some(true), Some(true)),
        // PATCH may or may not be idempotent.
        "PATCH" => (Some(false), Some(true), None),
        _ => (None, None, None),
    };

    ToolAnnotations {
        title: None,
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint: Some(true),
    }
}
