//! Daemon entry point for the CPS data MCP server.
//!
//! Loads configuration from CLI arguments and the environment, opens the
//! two read-only store handles (fatal if either artifact is missing), and
//! serves the MCP protocol over stdio or streamable HTTP.

mod config;

use std::sync::Arc;

use cps_core::services::DataServices;
use cps_mcp::server::{self, McpHttpServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::CpsConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Logs go to stderr; stdout belongs to the stdio transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CpsConfig::from_args()?;
    let services = Arc::new(DataServices::new(config.service_config()));
    // No tool can function without its backing store, so a missing
    // artifact aborts startup before any request is accepted.
    services.init().await?;
    info!(
        sqlite = %config.sqlite_path.display(),
        index = %config.index_path.display(),
        "stores validated, starting MCP server"
    );

    if config.serve_http {
        server::serve_streamable_http(services, McpHttpServerConfig::new(config.mcp_http_addr))
            .await?;
    } else {
        server::serve_stdio(services).await?;
    }
    Ok(())
}
