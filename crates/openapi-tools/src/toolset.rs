//! The tool set of one API document.
//!
//! A [`ToolSet`] pairs every operation of an [`ApiContract`] with its MCP tool definition and
//! a [`RequestDispatcher`]. It is immutable once built and safe to share across concurrent
//! calls.

use crate::config::{ApiServerConfig, DispatchConfig};
use crate::descriptor::ApiContract;
use crate::dispatcher::RequestDispatcher;
use crate::error::{OpenApiToolsError, Result};
use crate::loader::OpenApiDocument;
use crate::semantics::annotations_for_method;
use crate::translator::SchemaTranslator;
use reqwest::Client;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct RegisteredTool {
    tool: Tool,
    dispatcher: RequestDispatcher,
}

#[derive(Debug, Clone)]
pub struct ToolSet {
    server_name: String,
    version: String,
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

impl ToolSet {
    /// Load the document named by `config` and build its tool set.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec cannot be loaded, no base URL can be determined, or an
    /// operation fails to translate.
    pub async fn from_config(config: &ApiServerConfig) -> Result<Self> {
        let client = Client::new();
        let document = OpenApiDocument::load(config, &client).await?;
        let base_url = document.resolve_base_url(config.base_url.as_deref())?;

        let dispatch = DispatchConfig {
            base_url,
            headers: config.headers.clone(),
        };
        Self::build_with_client(&document, &dispatch, client)
    }

    /// Build a tool set with a default HTTP client.
    ///
    /// # Errors
    ///
    /// See [`Self::build_with_client`].
    pub fn build(contract: &impl ApiContract, config: &DispatchConfig) -> Result<Self> {
        Self::build_with_client(contract, config, Client::new())
    }

    /// Build a tool set; all dispatchers share `client`.
    ///
    /// Duplicate tool names get a numeric suffix (`_1`, `_2`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::MissingSchemaType`] if any operation carries an untyped
    /// parameter or body property.
    pub fn build_with_client(
        contract: &impl ApiContract,
        config: &DispatchConfig,
        client: Client,
    ) -> Result<Self> {
        let info = contract.info();
        let translator = SchemaTranslator::new(&info.title);

        let mut names: HashSet<String> = HashSet::new();
        let mut tools = Vec::with_capacity(contract.operations().len());
        let mut by_name = HashMap::new();

        for operation in contract.operations() {
            let schema = translator.translate(operation)?;
            let name = reserve_unique_tool_name(&mut names, &schema.name);
            if name != schema.name {
                tracing::warn!(
                    operation = %operation.id,
                    "duplicate tool name '{}', exposing as '{}'",
                    schema.name,
                    name
                );
            }

            let mut tool = Tool::new(
                name.clone(),
                schema.description.clone(),
                Arc::new(schema.input_schema()),
            );
            tool.annotations = Some(annotations_for_method(&operation.method));

            by_name.insert(name, tools.len());
            tools.push(RegisteredTool {
                tool,
                dispatcher: RequestDispatcher::for_operation(config, operation, client.clone()),
            });
        }

        tracing::info!(
            "Discovered {} tools from OpenAPI spec '{}'",
            tools.len(),
            info.title
        );

        Ok(Self {
            server_name: translator.prefix().to_string(),
            version: info.version,
            tools,
            by_name,
        })
    }

    /// Server name: the sanitized API title.
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// The API version from the document.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions, in operation order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.tool.clone()).collect()
    }

    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.by_name.get(name).map(|&i| &self.tools[i].tool)
    }

    /// Execute a tool call.
    ///
    /// Upstream failures are reported inside the returned result (with `is_error` set).
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::Runtime`] if the tool name is unknown.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult> {
        let Some(&index) = self.by_name.get(name) else {
            return Err(OpenApiToolsError::Runtime(format!("Unknown tool: {name}")));
        };

        tracing::debug!(tool = %name, "calling tool");
        Ok(self.tools[index].dispatcher.call(arguments).await)
    }
}

fn reserve_unique_tool_name(names: &mut HashSet<String>, base: &str) -> String {
    if names.insert(base.to_string()) {
        return base.to_string();
    }

    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| names.insert(candidate.clone()))
        .unwrap_or_else(|| base.to_string())
}
