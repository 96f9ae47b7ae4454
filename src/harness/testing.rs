//! In-process fake server for harness and routine tests

use crate::mcp::protocol::{McpError, McpNotification, McpRequest, McpResponse};
use crate::mcp::transport::Transport;
use anyhow::{anyhow, Result};
use serde_json::{json, Value};

type Handler = Box<dyn FnMut(&McpRequest) -> Result<Value, McpError> + Send + Sync>;

/// Transport that answers every request with a handler closure
///
/// `initialize` is answered automatically; everything else goes to the
/// handler. All traffic is recorded.
pub struct ScriptedTransport {
    handler: Handler,
    pub requests: Vec<McpRequest>,
    pub notifications: Vec<McpNotification>,
    pending: Option<McpResponse>,
    pub closed: bool,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(&McpRequest) -> Result<Value, McpError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Vec::new(),
            notifications: Vec::new(),
            pending: None,
            closed: false,
        }
    }

    /// Tool calls seen so far, as `(name, arguments)`
    pub fn tool_calls(&self) -> Vec<(String, Value)> {
        self.requests
            .iter()
            .filter(|r| r.method == "tools/call")
            .filter_map(|r| r.params.as_ref())
            .map(|p| {
                (
                    p["name"].as_str().unwrap_or_default().to_string(),
                    p["arguments"].clone(),
                )
            })
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&mut self, request: &McpRequest) -> Result<()> {
        self.requests.push(request.clone());
        let response = if request.method == "initialize" {
            McpResponse::ok(
                request.id,
                json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": {"tools": {}, "resources": {}},
                    "serverInfo": {"name": "scripted", "version": "0.0.1"}
                }),
            )
        } else {
            match (self.handler)(request) {
                Ok(result) => McpResponse::ok(request.id, result),
                Err(error) => McpResponse::err(request.id, error),
            }
        };
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
        !self.closed
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

pub fn text(text: &str) -> Value {
    json!({"content": [{"type": "text", "text": text}]})
}

pub fn tool_error(text: &str) -> Value {
    json!({"content": [{"type": "text", "text": text}], "isError": true})
}

/// `tools/list` result advertising the given tools
pub fn tool_list(names: &[&str]) -> Value {
    let tools: Vec<Value> = names
        .iter()
        .map(|name| json!({"name": name, "description": format!("{} tool", name), "inputSchema": {"type": "object"}}))
        .collect();
    json!({ "tools": tools })
}
