//! MCP Client Layer
//!
//! The high-level client drives a [`Transport`] through the MCP lifecycle:
//! the `initialize` handshake, the `notifications/initialized` follow-up, and
//! then listings, tool calls and resource reads.
//!
//! # Usage
//!
//! ```ignore
//! use mcp_harness::mcp::{McpClient, StreamableHttpTransport};
//!
//! let transport = StreamableHttpTransport::new("http://localhost:8080/mcp")?;
//! let mut client = McpClient::new(transport);
//! client.initialize().await?;
//! let result = client.call_tool("calculator", json!({"operation": "add", "x": 1, "y": 2})).await?;
//! ```

use crate::mcp::protocol::{
    CallToolResult, ClientCapabilities, ClientInfo, InitializeParams, McpMethod, McpNotification,
    McpRequest, ReadResourceResult, Resource, ServerCapabilities, Tool, DEFAULT_PROTOCOL_VERSION,
};
use crate::mcp::transport::Transport;
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Name announced in `clientInfo`
pub const CLIENT_NAME: &str = "mcp-harness";

/// Upper bound on `nextCursor` pages followed for one listing
const MAX_PAGES: usize = 100;

/// High-level MCP client
///
/// # Lifecycle
///
/// 1. Create client with `McpClient::new(transport)`
/// 2. Initialize with `client.initialize()`
/// 3. List, call, read
/// 4. `client.close()` to end the server session
pub struct McpClient<T>
where
    T: Transport,
{
    /// Underlying transport for sending/receiving messages
    transport: T,

    /// Next request ID (monotonically increasing)
    next_id: AtomicU64,

    /// Protocol revision requested during `initialize`
    protocol_version: String,

    /// Server capabilities (after initialization)
    server_capabilities: Option<ServerCapabilities>,

    /// Available tools (after listing)
    tools: Vec<Tool>,

    /// Available resources (after listing)
    resources: Vec<Resource>,

    /// Client state
    state: ClientState,
}

/// Client state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Client is created but not initialized
    Created,

    /// Initialization is in progress
    Initializing,

    /// Client is initialized and ready
    Ready,

    /// Client is disconnected
    Disconnected,
}

#[derive(Deserialize)]
struct ToolsPage {
    #[serde(default)]
    tools: Vec<Tool>,
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct ResourcesPage {
    #[serde(default)]
    resources: Vec<Resource>,
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
}

impl<T> McpClient<T>
where
    T: Transport,
{
    /// Create a new MCP client with the given transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            server_capabilities: None,
            tools: Vec::new(),
            resources: Vec::new(),
            state: ClientState::Created,
        }
    }

    /// Request a different protocol revision during `initialize`
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    fn next_request(&self, method: McpMethod, params: Option<Value>) -> McpRequest {
        McpRequest::new(
            self.next_id.fetch_add(1, Ordering::SeqCst),
            method.as_str(),
            params,
        )
    }

    /// Send a request and return its `result`, turning JSON-RPC errors into errors
    async fn request(&mut self, method: McpMethod, params: Option<Value>) -> Result<Value> {
        let request = self.next_request(method, params);

        self.transport
            .send(&request)
            .await
            .with_context(|| format!("Failed to send {} request", request.method))?;
        let response = self
            .transport
            .recv()
            .await
            .with_context(|| format!("Failed to receive {} response", request.method))?;

        response
            .into_result()
            .map_err(|error| anyhow::Error::new(error).context(format!("{} failed", request.method)))
    }

    async fn request_as<R: DeserializeOwned>(
        &mut self,
        method: McpMethod,
        params: Option<Value>,
    ) -> Result<R> {
        let label = method.as_str().to_string();
        let result = self.request(method, params).await?;
        serde_json::from_value(result).with_context(|| format!("Failed to parse {} result", label))
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Initialize the MCP connection
    ///
    /// Sends `initialize`, records the server's capabilities and then sends
    /// `notifications/initialized`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client was already initialized, the transport
    /// is disconnected, the server answers with an error, or the result is
    /// missing `protocolVersion` / `serverInfo`. On error the client is left
    /// in a non-ready state.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state != ClientState::Created {
            return Err(anyhow!(
                "Cannot initialize client: invalid state {:?}",
                self.state
            ));
        }

        if !self.transport.is_connected() {
            return Err(anyhow!("Cannot initialize: transport is disconnected"));
        }

        self.state = ClientState::Initializing;
        tracing::info!("Initializing MCP connection...");

        match self.handshake().await {
            Ok(caps) => {
                tracing::info!(
                    "MCP connection initialized: {} v{} (protocol {})",
                    caps.server_info.name,
                    caps.server_info.version,
                    caps.protocol_version
                );
                self.server_capabilities = Some(caps);
                self.state = ClientState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = ClientState::Created;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self) -> Result<ServerCapabilities> {
        let params = InitializeParams {
            protocol_version: self.protocol_version.clone(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: CLIENT_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let caps: ServerCapabilities = self
            .request_as(McpMethod::Initialize, Some(json!(params)))
            .await
            .context("Initialize handshake failed")?;

        if caps.protocol_version != self.protocol_version {
            tracing::warn!(
                "Server negotiated protocol {} (requested {})",
                caps.protocol_version,
                self.protocol_version
            );
        }

        let initialized = McpNotification::new(McpMethod::Initialized.as_str(), None);
        self.transport
            .notify(&initialized)
            .await
            .context("Failed to send initialized notification")?;

        Ok(caps)
    }

    /// List available tools, following pagination
    pub async fn list_tools(&mut self) -> Result<Vec<Tool>> {
        self.ensure_ready()?;
        tracing::debug!("Listing available tools from MCP server");

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let page: ToolsPage = self.request_as(McpMethod::ToolsList, params).await?;
            tools.extend(page.tools);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        self.tools = tools.clone();
        tracing::info!("Listed {} tools from MCP server", tools.len());
        Ok(tools)
    }

    /// List available resources, following pagination
    pub async fn list_resources(&mut self) -> Result<Vec<Resource>> {
        self.ensure_ready()?;
        tracing::debug!("Listing available resources from MCP server");

        let mut resources = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let page: ResourcesPage = self.request_as(McpMethod::ResourcesList, params).await?;
            resources.extend(page.resources);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        self.resources = resources.clone();
        tracing::info!("Listed {} resources from MCP server", resources.len());
        Ok(resources)
    }

    /// Call a tool on the MCP server
    ///
    /// A JSON-RPC error (unknown tool, invalid params) is returned as `Err`.
    /// A tool that ran and reported failure comes back as `Ok` with
    /// `is_error` set.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<CallToolResult> {
        self.ensure_ready()?;
        tracing::debug!("Calling tool: {} with arguments: {}", name, arguments);

        let params = json!({
            "name": name,
            "arguments": arguments
        });

        let result: CallToolResult = self
            .request_as(McpMethod::ToolsCall, Some(params))
            .await
            .with_context(|| format!("Tool '{}' call failed", name))?;

        tracing::debug!(
            "Tool '{}' returned {} content item(s), is_error={}",
            name,
            result.content.len(),
            result.is_error
        );
        Ok(result)
    }

    /// Read a resource by URI
    pub async fn read_resource(&mut self, uri: &str) -> Result<ReadResourceResult> {
        self.ensure_ready()?;
        tracing::debug!("Reading resource: {}", uri);

        self.request_as(McpMethod::ResourcesRead, Some(json!({ "uri": uri })))
            .await
            .with_context(|| format!("Failed to read resource '{}'", uri))
    }

    /// Liveness check
    pub async fn ping(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.request(McpMethod::Ping, None).await.map(|_| ())
    }

    /// End the session and mark the client disconnected
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ClientState::Disconnected {
            return Ok(());
        }
        self.state = ClientState::Disconnected;
        self.transport.close().await
    }

    /// Check if the client is ready for operations
    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            ClientState::Created => Err(anyhow!("Client not initialized. Call initialize() first.")),
            ClientState::Initializing => Err(anyhow!("Client is currently initializing")),
            ClientState::Ready => Ok(()),
            ClientState::Disconnected => Err(anyhow!("Client is disconnected")),
        }
    }

    /// Get the current client state
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Get server capabilities (after initialization)
    pub fn server_capabilities(&self) -> Option<&ServerCapabilities> {
        self.server_capabilities.as_ref()
    }

    /// Tools cached by the last `list_tools`
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Resources cached by the last `list_resources`
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Whether the last `list_tools` reported a tool with this name
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{Content, McpError, McpResponse};
    use std::collections::VecDeque;

    // Mock transport that answers from a queue and records traffic
    #[derive(Default)]
    struct MockTransport {
        disconnected: bool,
        requests: Vec<McpRequest>,
        notifications: Vec<McpNotification>,
        responses: VecDeque<McpResponse>,
        pending: Option<McpResponse>,
        closed: bool,
    }

    impl MockTransport {
        fn with_responses(responses: Vec<McpResponse>) -> Self {
            Self {
                responses: responses.into(),
                ..Default::default()
            }
        }
    }

    impl Transport for MockTransport {
        async fn send(&mut self, request: &McpRequest) -> Result<()> {
            self.requests.push(request.clone());
            let mut response = self
                .responses
                .pop_front()
                .ok_or_else(|| anyhow!("no scripted response"))?;
            response.id = request.id;
            self.pending = Some(response);
            Ok(())
        }

        async fn recv(&mut self) -> Result<McpResponse> {
            self.pending.take().ok_or_else(|| anyhow!("nothing sent"))
        }

        async fn notify(&mut self, notification: &McpNotification) -> Result<()> {
            self.notifications.push(notification.clone());
            Ok(())
        }

        fn is_connected(&self) -> bool {
            !self.disconnected
        }

        async fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn init_response() -> McpResponse {
        McpResponse::ok(
            0,
            json!({
                "protocolVersion": "2025-03-26",
                "capabilities": {"tools": {}, "resources": {}},
                "serverInfo": {"name": "test-server", "version": "1.0.0"}
            }),
        )
    }

    async fn ready_client(extra: Vec<McpResponse>) -> McpClient<MockTransport> {
        let mut responses = vec![init_response()];
        responses.extend(extra);
        let mut client = McpClient::new(MockTransport::with_responses(responses));
        client.initialize().await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = McpClient::new(MockTransport::default());
        assert_eq!(client.next_id.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), ClientState::Created);
        assert!(client.server_capabilities().is_none());
    }

    #[tokio::test]
    async fn test_initialize_sends_handshake_and_notification() {
        let client = ready_client(vec![]).await;

        assert_eq!(client.state(), ClientState::Ready);
        let caps = client.server_capabilities().unwrap();
        assert_eq!(caps.server_info.name, "test-server");
        assert!(caps.supports_resources());

        let transport = client.transport();
        assert_eq!(transport.requests.len(), 1);
        let params = transport.requests[0].params.as_ref().unwrap();
        assert_eq!(params["clientInfo"]["name"], CLIENT_NAME);
        assert_eq!(params["protocolVersion"], DEFAULT_PROTOCOL_VERSION);
        assert_eq!(transport.notifications.len(), 1);
        assert_eq!(
            transport.notifications[0].method,
            "notifications/initialized"
        );
    }

    #[tokio::test]
    async fn test_initialize_error_leaves_client_unready() {
        let transport = MockTransport::with_responses(vec![McpResponse::err(
            0,
            McpError::initialization_error("unsupported version"),
        )]);
        let mut client = McpClient::new(transport);

        let err = client.initialize().await.unwrap_err();
        assert!(format!("{:#}", err).contains("unsupported version"));
        assert_eq!(client.state(), ClientState::Created);
        assert!(client.transport().notifications.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_missing_server_info() {
        let transport = MockTransport::with_responses(vec![McpResponse::ok(
            0,
            json!({"protocolVersion": "2025-03-26", "capabilities": {}}),
        )]);
        let mut client = McpClient::new(transport);
        assert!(client.initialize().await.is_err());
        assert_ne!(client.state(), ClientState::Ready);
    }

    #[tokio::test]
    async fn test_initialize_disconnected_transport() {
        let transport = MockTransport {
            disconnected: true,
            ..Default::default()
        };
        let mut client = McpClient::new(transport);
        let err = client.initialize().await.unwrap_err();
        assert!(err.to_string().contains("disconnected"));
    }

    #[tokio::test]
    async fn test_double_initialize() {
        let mut client = ready_client(vec![]).await;
        let err = client.initialize().await.unwrap_err();
        assert!(err.to_string().contains("invalid state"));
    }

    #[tokio::test]
    async fn test_operations_require_ready() {
        let mut client = McpClient::new(MockTransport::default());
        assert!(client.list_tools().await.is_err());
        assert!(client.list_resources().await.is_err());
        assert!(client.call_tool("calculator", json!({})).await.is_err());
        assert!(client.read_resource("file:///x").await.is_err());
        assert!(client.transport().requests.is_empty());
    }

    #[tokio::test]
    async fn test_list_tools_follows_cursor() {
        let mut client = ready_client(vec![
            McpResponse::ok(
                0,
                json!({"tools": [{"name": "calculator", "inputSchema": {}}], "nextCursor": "p2"}),
            ),
            McpResponse::ok(0, json!({"tools": [{"name": "shell", "description": "Run"}]})),
        ])
        .await;

        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 2);
        assert!(client.has_tool("shell"));
        assert!(!client.has_tool("patch"));

        let second = &client.transport().requests[2];
        assert_eq!(second.method, "tools/list");
        assert_eq!(second.params.as_ref().unwrap()["cursor"], "p2");
    }

    #[tokio::test]
    async fn test_list_resources() {
        let mut client = ready_client(vec![McpResponse::ok(
            0,
            json!({"resources": [{"uri": "docs://readme", "name": "README", "mimeType": "text/markdown"}]}),
        )])
        .await;

        let resources = client.list_resources().await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].mime_type.as_deref(), Some("text/markdown"));
        assert_eq!(client.resources().len(), 1);
    }

    #[tokio::test]
    async fn test_call_tool_success() {
        let mut client = ready_client(vec![McpResponse::ok(
            0,
            json!({"content": [{"type": "text", "text": "8"}]}),
        )])
        .await;

        let result = client
            .call_tool("calculator", json!({"operation": "add", "x": 5, "y": 3}))
            .await
            .unwrap();
        assert_eq!(result.first_text(), Some("8"));

        let request = client.transport().requests.last().unwrap();
        assert_eq!(request.method, "tools/call");
        let params = request.params.as_ref().unwrap();
        assert_eq!(params["name"], "calculator");
        assert_eq!(params["arguments"]["x"], 5);
    }

    #[tokio::test]
    async fn test_call_tool_is_error_is_not_err() {
        let mut client = ready_client(vec![McpResponse::ok(
            0,
            json!({"content": [{"type": "text", "text": "division by zero"}], "isError": true}),
        )])
        .await;

        let result = client.call_tool("calculator", json!({})).await.unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn test_call_tool_rpc_error() {
        let mut client = ready_client(vec![McpResponse::err(
            0,
            McpError::method_not_found("frobnicate"),
        )])
        .await;

        let err = client.call_tool("frobnicate", json!({})).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("frobnicate"));
        assert!(message.contains("-32601"));
    }

    #[tokio::test]
    async fn test_read_resource() {
        let mut client = ready_client(vec![McpResponse::ok(
            0,
            json!({"contents": [{"uri": "docs://readme", "text": "# Hello"}]}),
        )])
        .await;

        let result = client.read_resource("docs://readme").await.unwrap();
        assert_eq!(result.contents[0].text.as_deref(), Some("# Hello"));
        let request = client.transport().requests.last().unwrap();
        assert_eq!(request.params.as_ref().unwrap()["uri"], "docs://readme");
    }

    #[tokio::test]
    async fn test_request_ids_increase() {
        let mut client = ready_client(vec![
            McpResponse::ok(0, json!({})),
            McpResponse::ok(0, json!({"content": [{"type": "image", "data": "AA==", "mimeType": "image/png"}]})),
        ])
        .await;

        client.ping().await.unwrap();
        let result = client.call_tool("image", json!({})).await.unwrap();
        assert!(matches!(result.first_displayable(), Some(Content::Image { .. })));

        let ids: Vec<u64> = client.transport().requests.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_close_disconnects() {
        let mut client = ready_client(vec![]).await;
        client.close().await.unwrap();

        assert_eq!(client.state(), ClientState::Disconnected);
        assert!(client.transport().closed);
        let err = client.list_tools().await.unwrap_err();
        assert!(err.to_string().contains("disconnected"));

        // closing twice is a no-op
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_custom_protocol_version() {
        let mut client = McpClient::new(MockTransport::with_responses(vec![init_response()]))
            .with_protocol_version("2024-11-05");
        client.initialize().await.unwrap();

        let params = client.transport().requests[0].params.as_ref().unwrap();
        assert_eq!(params["protocolVersion"], "2024-11-05");
    }
}
