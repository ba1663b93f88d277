//! `OpenAPI` `$ref` resolver.
//!
//! The `openapiv3` crate models `$ref`s using `ReferenceOr<T>` but does not resolve them. This
//! resolver follows local references (`#/components/...`) against the root document, chasing
//! chains of references until it reaches an item.
//!
//! External references (other files or URLs) are rejected with an error; the loader skips the
//! affected operation.

use crate::error::{OpenApiToolsError, Result};
use openapiv3::{OpenAPI, ReferenceOr};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug)]
pub struct LocalResolver {
    root: Value,
}

impl LocalResolver {
    /// Create a resolver over a parsed document.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec cannot be converted into JSON.
    pub fn new(spec: &OpenAPI) -> Result<Self> {
        let root =
            serde_json::to_value(spec).map_err(|e| OpenApiToolsError::OpenApi(e.to_string()))?;
        Ok(Self { root })
    }

    /// Resolve `r` to an item, following reference chains.
    ///
    /// # Errors
    ///
    /// Returns an error for external or malformed references, dangling pointers, cycles, or a
    /// target that does not deserialize as `T`.
    pub fn resolve<T>(&self, r: &ReferenceOr<T>) -> Result<T>
    where
        T: Clone + DeserializeOwned,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut cur: ReferenceOr<T> = r.clone();

        loop {
            match cur {
                ReferenceOr::Item(item) => return Ok(item),
                ReferenceOr::Reference { reference } => {
                    if !seen.insert(reference.clone()) {
                        return Err(OpenApiToolsError::OpenApi(format!(
                            "Cyclic $ref detected while resolving: {reference}",
                        )));
                    }

                    let value = self.lookup(&reference)?;
                    cur = serde_json::from_value(value.clone()).map_err(|e| {
                        OpenApiToolsError::OpenApi(format!(
                            "Failed to deserialize referenced value '{reference}' as expected type: {e}",
                        ))
                    })?;
                }
            }
        }
    }

    fn lookup(&self, reference: &str) -> Result<&Value> {
        let Some(fragment) = reference.strip_prefix('#') else {
            return Err(OpenApiToolsError::OpenApi(format!(
                "External $ref not supported: {reference}",
            )));
        };

        if fragment.is_empty() {
            return Ok(&self.root);
        }
        if !fragment.starts_with('/') {
            return Err(OpenApiToolsError::OpenApi(format!(
                "Unsupported $ref fragment (expected JSON pointer starting with '/'): {reference}",
            )));
        }

        self.root.pointer(fragment).ok_or_else(|| {
            OpenApiToolsError::OpenApi(format!(
                "Unresolved $ref '{reference}' (missing pointer '{fragment}')",
            ))
        })
    }
}
