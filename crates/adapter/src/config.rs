//! Command line and configuration file handling.
//!
//! The config file (YAML or JSON) holds an [`ApiServerConfig`]; CLI flags and their
//! environment variables override individual fields.

use crate::error::{AdapterError, Result};
use clap::{Parser, ValueEnum};
use openapi_mcp_tools::{ApiServerConfig, HashPolicy};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "openapi-mcp-adapter",
    version,
    about = "Expose an OpenAPI-described HTTP API as MCP tools over stdio"
)]
pub struct Args {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, env = "OPENAPI_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// `OpenAPI` spec location (file path or http(s) URL)
    #[arg(long, env = "OPENAPI_MCP_SPEC")]
    pub spec: Option<String>,

    /// Base URL for outbound calls (defaults to the spec's first server)
    #[arg(long, env = "OPENAPI_MCP_BASE_URL")]
    pub base_url: Option<String>,

    /// Header sent with every outbound call, as NAME=VALUE (repeatable)
    #[arg(long = "header", value_name = "NAME=VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Expected spec hash (`sha256:<hex>`)
    #[arg(long, env = "OPENAPI_MCP_SPEC_HASH")]
    pub spec_hash: Option<String>,

    /// What to do on a spec hash mismatch: warn, fail or ignore
    #[arg(long, value_parser = parse_hash_policy)]
    pub spec_hash_policy: Option<HashPolicy>,

    /// Log filter (overridden by `RUST_LOG`)
    #[arg(long, env = "OPENAPI_MCP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// Merge the config file (if any) with CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if no spec location is
    /// given anywhere.
    pub fn resolve(&self) -> Result<ApiServerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path)?,
            None => ApiServerConfig::default(),
        };

        if let Some(spec) = &self.spec {
            config.spec.clone_from(spec);
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if let Some(hash) = &self.spec_hash {
            config.spec_hash = Some(hash.clone());
        }
        if let Some(policy) = self.spec_hash_policy {
            config.spec_hash_policy = policy;
        }
        for (name, value) in &self.headers {
            config.headers.insert(name.clone(), value.clone());
        }

        if config.spec.trim().is_empty() {
            return Err(AdapterError::Config(
                "no OpenAPI spec given (use --spec or `spec` in the config file)".to_string(),
            ));
        }

        Ok(config)
    }
}

/// Read an [`ApiServerConfig`] from YAML or JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config_file(path: &Path) -> Result<ApiServerConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AdapterError::Config(format!("failed to read config {}: {e}", path.display()))
    })?;
    // JSON is a subset of YAML.
    Ok(serde_yaml::from_str(&content)?)
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid header '{raw}': expected NAME=VALUE"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header '{raw}': empty name"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn parse_hash_policy(raw: &str) -> std::result::Result<HashPolicy, String> {
    match raw.to_ascii_lowercase().as_str() {
        "warn" => Ok(HashPolicy::Warn),
        "fail" => Ok(HashPolicy::Fail),
        "ignore" => Ok(HashPolicy::Ignore),
        other => Err(format!(
            "invalid hash policy '{other}': expected warn, fail or ignore"
        )),
    }
}
