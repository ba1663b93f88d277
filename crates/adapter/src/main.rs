//! `openapi-mcp-adapter`: serve the operations of an `OpenAPI` document as MCP tools on stdio.

mod config;
mod error;
mod server;

use anyhow::Context as _;
use clap::Parser as _;
use config::{Args, LogFormat};
use openapi_mcp_tools::ToolSet;
use server::OpenApiMcpServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format);

    let config = args.resolve()?;
    let tools = ToolSet::from_config(&config)
        .await
        .with_context(|| format!("failed to build tools from '{}'", config.spec))?;

    tracing::info!(
        server = %tools.server_name(),
        version = %tools.version(),
        tools = tools.len(),
        "serving MCP on stdio"
    );

    OpenApiMcpServer::new(tools).serve_stdio().await?;
    Ok(())
}

/// Logs go to stderr; stdout carries the MCP transport.
fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
