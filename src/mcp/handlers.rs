//! MCP server entry point.

use anyhow::Result;
use tracing::{error, info};

use crate::files::SiteFiles;

use super::server::BuilderMcpServer;

/// Serve the MCP tools over stdio until the client disconnects.
pub async fn run_mcp_server(files: SiteFiles) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("Starting AI Builder MCP server (stdio)");
    let server = BuilderMcpServer::new(files);
    info!("Serving files from {}", server.files().describe());
    let service = server.serve(stdio()).await.map_err(|e| {
        error!("Failed to start MCP service: {:?}", e);
        anyhow::anyhow!("Failed to start MCP service: {:?}", e)
    })?;

    service.waiting().await.map_err(|e| {
        error!("MCP service error: {:?}", e);
        anyhow::anyhow!("MCP service error: {:?}", e)
    })?;

    info!("MCP server shutting down");
    Ok(())
}
