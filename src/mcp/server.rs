//! MCP server implementation.
//!
//! This module contains the BuilderMcpServer struct and its tool routing.

use rmcp::{
    handler::server::router::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};

use crate::files::SiteFiles;
use crate::tools::{ListFilesArgs, ReadFileArgs, SearchCodeArgs};

use super::tools;
use super::types::*;

/// AI Builder MCP Server
#[derive(Clone)]
pub struct BuilderMcpServer {
    files: SiteFiles,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl BuilderMcpServer {
    pub fn new(files: SiteFiles) -> Self {
        Self {
            files,
            tool_router: Self::tool_router(),
        }
    }

    pub fn files(&self) -> &SiteFiles {
        &self.files
    }

    #[tool(
        name = "read_file",
        description = "Read the full content of a file in the site repository."
    )]
    async fn read_file(
        &self,
        Parameters(args): Parameters<ReadFileArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::read_file(&self.files, args).await
    }

    #[tool(
        name = "list_files",
        description = "List the files and directories directly inside a directory of the site repository."
    )]
    async fn list_files(
        &self,
        Parameters(args): Parameters<ListFilesArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::list_files(&self.files, args).await
    }

    #[tool(
        name = "search_code",
        description = "Case-insensitive text search over app/, components/, lib/ and styles/. `filePattern` like `*.tsx` filters by extension; any other value filters by path substring. Returns at most 50 matching lines."
    )]
    async fn search_code(
        &self,
        Parameters(args): Parameters<SearchCodeArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::search_code(&self.files, args).await
    }

    #[tool(
        name = "check_path",
        description = "Check whether the AI Builder may modify a path, and optionally whether proposed content passes the content scan. Nothing is written."
    )]
    fn check_path(
        &self,
        Parameters(args): Parameters<CheckPathArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::check_path(args)
    }
}

#[tool_handler]
impl ServerHandler for BuilderMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "ai-builder".to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "AI Builder MCP Server provides a read-only, safety-gated view of the site source (local working copy or GitHub branch) and a path safety check."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::LocalFiles;
    use tempfile::TempDir;

    #[test]
    fn test_mcp_server_creation() {
        let dir = TempDir::new().unwrap();
        let files = LocalFiles::new(dir.path()).unwrap();
        let server = BuilderMcpServer::new(SiteFiles::Local(files));
        assert_eq!(
            server.files().describe(),
            dir.path().canonicalize().unwrap().display().to_string()
        );

        let info = server.get_info();
        assert_eq!(info.server_info.name, "ai-builder");
        assert!(info.capabilities.tools.is_some());
    }
}
