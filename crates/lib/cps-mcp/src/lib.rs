//! MCP server implementation for cps-data-mcp.
//!
//! This crate wires the control plane into rmcp tool handlers and exposes
//! the two read-only query tools to the calling agent. Tool lookup, input
//! schema validation, and request/response sequencing are handled by the
//! rmcp tool router: unknown tool names and malformed arguments are
//! rejected at that boundary and never reach a handler.

mod helpers;
mod tools;
pub mod server;

use std::sync::Arc;

use cps_core::control::CpsControlPlane;
use cps_core::services::DataServices;
use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool_handler,
};
use rmcp::model::{ServerCapabilities, ServerInfo};

const SERVER_INSTRUCTIONS: &str = r#"cps-data-mcp provides read-only MCP tools over Chicago public school data.

Tools:
- `query_schools_and_neighborhoods` executes a single SELECT query on a table
  of Chicago public schools and their neighborhoods called
  "schooltoneighborhood" with the following schema:
      id INTEGER NOT NULL,
      created_at DATETIME NOT NULL,
      school_id INTEGER NOT NULL,
      school_name VARCHAR NOT NULL,
      neighborhood VARCHAR NOT NULL,
      PRIMARY KEY (id)
  "school_name" is always all-caps but "neighborhood" is not.
- `query_school_websites` retrieves context relevant to a natural-language
  question from a database of Chicago public school websites. Pass
  `school_name` to restrict the search to one school's website.

Notes:
- Both stores are read-only; INSERT/UPDATE/DELETE and friends are rejected.
- `query_school_websites` returns assembled context, not an answer; use the
  context in your own reasoning step."#;

/// MCP server wrapper around the shared data services and tool router.
#[derive(Clone)]
pub struct CpsMcp {
    tool_router: ToolRouter<Self>,
    services: Arc<DataServices>,
}

impl CpsMcp {
    /// Creates a new server taking ownership of the services.
    #[must_use]
    pub fn new(services: DataServices) -> Self {
        Self::with_services(Arc::new(services))
    }

    /// Creates a new server using a shared services handle.
    #[must_use]
    pub fn with_services(services: Arc<DataServices>) -> Self {
        let tool_router = Self::tool_router_query();
        Self {
            tool_router,
            services,
        }
    }

    /// Retrieves the control plane, opening the stores if this is the
    /// first use.
    pub(crate) async fn control(&self) -> Result<Arc<CpsControlPlane>, ErrorData> {
        self.services
            .control()
            .await
            .map_err(helpers::map_service_err)
    }
}

#[tool_handler]
impl ServerHandler for CpsMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
