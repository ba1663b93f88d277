use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for an OpenAPI-based tool source.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiServerConfig {
    /// `OpenAPI` spec location (URL or file path).
    pub spec: String,

    /// Optional spec hash (`sha256:<hex>`) for version detection.
    #[serde(default)]
    pub spec_hash: Option<String>,

    /// Hash policy: warn, fail, or ignore.
    #[serde(default)]
    pub spec_hash_policy: HashPolicy,

    /// Override base URL from spec.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Extra headers attached to every outbound call (e.g. an API key).
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Hash verification policy.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HashPolicy {
    /// Log warning if hash doesn't match.
    #[default]
    Warn,
    /// Fail startup if hash doesn't match.
    Fail,
    /// Ignore hash verification.
    Ignore,
}

/// Static per-process inputs of every dispatcher: where to send requests and what to attach.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    /// Prepended verbatim to each operation path.
    pub base_url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl DispatchConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_server_config_parses_camel_case_yaml() {
        let cfg: ApiServerConfig = serde_yaml::from_str(
            r"
spec: ./petstore.yaml
baseUrl: https://petstore.example/api/v3
specHash: sha256:abc
specHashPolicy: fail
headers:
  X-Api-Key: secret
",
        )
        .expect("valid config");

        assert_eq!(cfg.spec, "./petstore.yaml");
        assert_eq!(cfg.base_url.as_deref(), Some("https://petstore.example/api/v3"));
        assert_eq!(cfg.spec_hash_policy, HashPolicy::Fail);
        assert_eq!(cfg.headers.get("X-Api-Key").map(String::as_str), Some("secret"));
    }

    #[test]
    fn api_server_config_defaults() {
        let cfg: ApiServerConfig = serde_yaml::from_str("spec: x.json").expect("valid config");
        assert_eq!(cfg.spec_hash_policy, HashPolicy::Warn);
        assert!(cfg.base_url.is_none());
        assert!(cfg.headers.is_empty());
    }
}
