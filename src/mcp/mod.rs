//! MCP (Model Context Protocol) Client Implementation
//!
//! # Architecture
//!
//! 1. **Protocol Layer** (`protocol`): JSON-RPC 2.0 message types
//! 2. **Transport Layer** (`transport`, `http_transport`, `sse`): the
//!    transport trait and its Streamable HTTP implementation
//! 3. **Client Layer** (`client`): High-level MCP client API

// Protocol layer: JSON-RPC 2.0 message types
pub mod protocol;

// Transport trait
pub mod transport;

// Streamable HTTP transport for remote MCP servers
pub mod http_transport;

// Server-Sent Events framing for streamed replies
pub mod sse;

// Client layer: High-level MCP client API
pub mod client;

pub use protocol::{
    CallToolResult, ClientCapabilities, ClientInfo, Content, InitializeParams, McpError,
    McpMethod, McpNotification, McpRequest, McpResponse, ReadResourceResult, Resource,
    ResourceContents, ServerCapabilities, ServerInfo, Tool, ToolCallParams,
};

pub use http_transport::StreamableHttpTransport;
pub use transport::Transport;

pub use client::{ClientState, McpClient};

// Property-based tests module
#[cfg(test)]
mod proptests;
