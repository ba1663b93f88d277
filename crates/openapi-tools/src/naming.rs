//! Tool name sanitization.
//!
//! MCP clients are picky about tool names, so every exposed name (API title prefix, operation
//! id) goes through [`sanitize`] before registration.

/// Name returned when sanitization leaves nothing behind.
pub const FALLBACK_TOOL_NAME: &str = "unnamed_tool";

/// Map an arbitrary human-readable string to a transport-safe tool name.
///
/// The result contains only the characters of the input (lowercased) plus single `_`
/// separators, never starts or ends with `_`, and never contains `__`. An input that reduces to
/// nothing yields [`FALLBACK_TOOL_NAME`].
#[must_use]
pub fn sanitize(name: &str) -> String {
    let lowered = name.to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        match c {
            ' ' | '-' | '/' | '.' | ':' => out.push('_'),
            '{' | '}' | '?' => {}
            '&' => out.push_str("and"),
            '=' => out.push_str("_eq_"),
            '%' => out.push_str("_pct_"),
            other => out.push(other),
        }
    }

    while out.contains("__") {
        out = out.replace("__", "_");
    }

    let trimmed = out.strip_prefix('_').unwrap_or(&out);
    let trimmed = trimmed.strip_suffix('_').unwrap_or(trimmed);

    if trimmed.is_empty() {
        return FALLBACK_TOOL_NAME.to_string();
    }
    trimmed.to_string()
}

/// Build the exposed tool name for an operation of a document whose sanitized title is
/// `prefix`.
#[must_use]
pub fn tool_name(prefix: &str, operation_id: &str) -> String {
    sanitize(&format!("{prefix}_{operation_id}"))
}

/// Generate a canonical operation id from method and path (used when `operationId` is missing).
///
/// `GET /users/{id}/repos` becomes `get_users_id_repos`.
#[must_use]
pub(crate) fn canonical_operation_id(method: &str, path: &str) -> String {
    let raw = format!("{}_{}", method.to_lowercase(), path);

    let mut name = String::with_capacity(raw.len());
    let mut last_was_sep = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            name.push('_');
            last_was_sep = true;
        }
    }

    name.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_literal_fixtures() {
        assert_eq!(sanitize("Get User {id}"), "get_user_id");
        assert_eq!(sanitize("A & B"), "a_and_b");
        assert_eq!(sanitize(""), "unnamed_tool");
        assert_eq!(sanitize("___"), "unnamed_tool");
    }

    #[test]
    fn sanitize_replaces_operators() {
        assert_eq!(sanitize("rate=50%"), "rate_eq_50_pct");
        assert_eq!(sanitize("Pet Store: v3.1/api"), "pet_store_v3_1_api");
        assert_eq!(sanitize("what?"), "what");
    }

    #[test]
    fn sanitize_strips_only_one_edge_underscore_after_collapsing() {
        assert_eq!(sanitize("-leading and trailing-"), "leading_and_trailing");
        assert_eq!(sanitize("__x__"), "x");
    }

    #[test]
    fn sanitize_is_idempotent_and_keeps_invariants() {
        let inputs = [
            "Get User {id}",
            "A & B",
            "",
            "___",
            "  Mixed-Case.Name::With/Slashes  ",
            "a=b&c=d%",
            "{}{}??",
            "Swagger Petstore - OpenAPI 3.0",
            "_-_-_",
        ];

        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
            assert!(!once.contains("__"), "double underscore in {once:?}");
            assert!(!once.starts_with('_') && !once.ends_with('_'), "{once:?}");
            assert_eq!(once, once.to_lowercase());
        }
    }

    #[test]
    fn tool_name_joins_prefix_and_operation_id() {
        let prefix = sanitize("Swagger Petstore - OpenAPI 3.0");
        assert_eq!(prefix, "swagger_petstore_openapi_3_0");
        assert_eq!(
            tool_name(&prefix, "getPetById"),
            "swagger_petstore_openapi_3_0_getpetbyid"
        );
        assert_eq!(tool_name("unnamed_tool", ""), "unnamed_tool");
    }

    #[test]
    fn canonical_operation_id_from_method_and_path() {
        assert_eq!(canonical_operation_id("get", "/pet/{petId}"), "get_pet_petId");
        assert_eq!(canonical_operation_id("POST", "/store/order"), "post_store_order");
        assert_eq!(
            canonical_operation_id("get", "/user/{username}/repos"),
            "get_user_username_repos"
        );
    }
}
