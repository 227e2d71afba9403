//! MCP (Model Context Protocol) server using rmcp.
//!
//! Exposes the safety-gated, read-only view of the site source over stdio so
//! editors and other agents see the same rules as the chat builder.

mod handlers;
mod server;
mod tools;
pub mod types;

pub use handlers::run_mcp_server;
