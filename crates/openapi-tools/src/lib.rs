//! OpenAPI -> MCP tooling.
//!
//! Turns the operations of an `OpenAPI` 3 document into MCP tools and executes tool calls as
//! HTTP requests against the described API:
//!
//! - [`loader`] parses the document into [`descriptor`] types ([`ApiContract`]).
//! - [`translator`] turns each operation into a tool name and a grouped input schema.
//! - [`dispatcher`] turns tool-call arguments into an outbound request and returns the body.
//! - [`toolset`] wires the three together for one document.
//!
//! The MCP server itself lives in `openapi-mcp-adapter`.

pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod loader;
pub mod naming;
pub mod resolver;
pub mod semantics;
pub mod toolset;
pub mod translator;

pub use config::{ApiServerConfig, DispatchConfig, HashPolicy};
pub use descriptor::{ApiContract, ApiInfo, OperationDescriptor};
pub use dispatcher::{DispatchError, RequestDispatcher};
pub use error::{OpenApiToolsError, Result};
pub use loader::OpenApiDocument;
pub use toolset::ToolSet;
pub use translator::{SchemaTranslator, ToolCallSchema};
