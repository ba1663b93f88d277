//! MCP server over stdio.

use crate::error::{AdapterError, Result};
use openapi_mcp_tools::ToolSet;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ErrorData, Implementation, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler, ServiceExt as _};
use std::future::Future;
use std::sync::Arc;

/// Exposes one [`ToolSet`] as MCP tools.
#[derive(Debug, Clone)]
pub struct OpenApiMcpServer {
    tools: Arc<ToolSet>,
}

impl OpenApiMcpServer {
    #[must_use]
    pub fn new(tools: ToolSet) -> Self {
        Self {
            tools: Arc::new(tools),
        }
    }

    /// Serve on stdin/stdout until the client disconnects.
    ///
    /// # Errors
    ///
    /// Returns an error if the MCP handshake fails or the service task dies.
    pub async fn serve_stdio(self) -> Result<()> {
        let running = self
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| AdapterError::Startup(format!("MCP initialization failed: {e}")))?;

        let reason = running
            .waiting()
            .await
            .map_err(|e| AdapterError::Runtime(e.to_string()))?;
        tracing::info!(reason = ?reason, "MCP session ended");
        Ok(())
    }
}

impl ServerHandler for OpenApiMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: self.tools.server_name().to_string(),
                version: self.tools.version().to_string(),
                ..Default::default()
            },
            instructions: None,
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: self.tools.list_tools(),
            ..Default::default()
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            self.tools
                .call_tool(&request.name, request.arguments)
                .await
                .map_err(|e| ErrorData::invalid_params(e.to_string(), None))
        }
    }
}
