//! API module
//!
//! This module provides the API functionality for axent: the HTTP server,
//! its client, and the MCP server over the assistant tools.

pub mod client;
pub mod mcp;
pub mod server;

// Re-export commonly used types
pub use client::{Client, ClientConfig, ClientError};
pub use mcp::AxentMcpServer;
pub use server::{router, serve, ServerConfig};
