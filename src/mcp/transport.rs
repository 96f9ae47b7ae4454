//! MCP Transport Layer
//!
//! This module defines the transport abstraction for talking to MCP servers.
//! The harness ships one implementation, [`StreamableHttpTransport`], but the
//! client is written against the trait so tests can substitute mocks.
//!
//! The transport layer is responsible only for moving messages. JSON-RPC
//! semantics (matching results, interpreting errors) belong to the client.
//!
//! [`StreamableHttpTransport`]: crate::mcp::http_transport::StreamableHttpTransport

use crate::mcp::protocol::{McpNotification, McpRequest, McpResponse};
use anyhow::Result;

/// Transport trait for MCP communication
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    /// Send a request to the MCP server
    ///
    /// Returns `Ok(())` once the request was delivered. The matching response
    /// is retrieved with [`Transport::recv`].
    async fn send(&mut self, request: &McpRequest) -> Result<()>;

    /// Receive the response to the last request sent
    async fn recv(&mut self) -> Result<McpResponse>;

    /// Deliver a notification; servers never answer these
    async fn notify(&mut self, notification: &McpNotification) -> Result<()>;

    /// Check if the transport is still connected
    fn is_connected(&self) -> bool;

    /// Tear down the session. The default does nothing.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
