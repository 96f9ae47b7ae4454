//! MCP Streamable HTTP Transport
//!
//! Every JSON-RPC message is sent as its own HTTP POST to a single endpoint.
//! The server answers with either:
//!
//! 1. `application/json`: the response object as the body, or
//! 2. `text/event-stream`: a short SSE stream that carries the response,
//!    possibly preceded by server notifications.
//!
//! The `Mcp-Session-Id` header issued by the server during `initialize` is
//! replayed on every later request, and `DELETE` on the endpoint ends the
//! session.
//!
//! # Example
//!
//! ```ignore
//! use mcp_harness::mcp::{McpClient, StreamableHttpTransport};
//!
//! let transport = StreamableHttpTransport::new("http://localhost:8080/mcp")?;
//! let mut client = McpClient::new(transport);
//! client.initialize().await?;
//! let tools = client.list_tools().await?;
//! ```

use crate::mcp::protocol::{McpNotification, McpRequest, McpResponse};
use crate::mcp::sse;
use crate::mcp::transport::Transport;
use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::time::Duration;

/// Header carrying the server-issued session identifier
pub const SESSION_HEADER: &str = "mcp-session-id";

const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Streamable HTTP transport for remote MCP servers
pub struct StreamableHttpTransport {
    /// Reqwest HTTP client
    client: reqwest::Client,

    /// MCP server endpoint URL
    url: String,

    /// Request timeout
    timeout: Duration,

    /// Static headers added to every request (e.g. authorization)
    headers: HeaderMap,

    /// Session identifier issued by the server
    session_id: Option<String>,

    /// Response parsed during the last `send`
    buffered_response: Option<McpResponse>,

    /// Connection state
    connected: bool,
}

impl StreamableHttpTransport {
    /// Create a transport for the given endpoint with a 30 second timeout
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let timeout = Duration::from_secs(30);
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
            timeout,
            headers: HeaderMap::new(),
            session_id: None,
            buffered_response: None,
            connected: true,
        })
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.timeout = timeout;
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Add static headers sent with every request
    pub fn with_headers(mut self, headers: &BTreeMap<String, String>) -> Result<Self> {
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name: {}", name))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {}", name))?;
            self.headers.insert(name, value);
        }
        Ok(self)
    }

    /// Get the server URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Session identifier, once the server issued one
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn post(&self, body: String) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, ACCEPT_BOTH)
            .body(body);
        if let Some(session) = &self.session_id {
            builder = builder.header(SESSION_HEADER, session);
        }
        builder
    }

    fn remember_session(&mut self, headers: &HeaderMap) {
        let issued = headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(session) = issued {
            if self.session_id.as_deref() != Some(session.as_str()) {
                tracing::debug!("MCP session id: {}", session);
                self.session_id = Some(session);
            }
        }
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("text/event-stream"))
        .unwrap_or(false)
}

impl Transport for StreamableHttpTransport {
    async fn send(&mut self, request: &McpRequest) -> Result<()> {
        if !self.connected {
            return Err(anyhow!("Transport is not connected"));
        }

        let json =
            serde_json::to_string(request).context("Failed to serialize MCP request to JSON")?;
        tracing::debug!("POST {}: {}", self.url, json);

        let http_response = self
            .post(json)
            .send()
            .await
            .with_context(|| format!("Failed to send HTTP request to {}", self.url))?;

        let status = http_response.status();
        let headers = http_response.headers().clone();
        let body = http_response
            .text()
            .await
            .context("Failed to read HTTP response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "HTTP request failed with status {}: {}",
                status,
                body.trim()
            ));
        }

        self.remember_session(&headers);
        tracing::debug!("Received HTTP response: {}", body);

        let response = if is_event_stream(&headers) {
            sse::find_response(&body, request.id)?
        } else {
            serde_json::from_str::<McpResponse>(&body).with_context(|| {
                format!("Failed to deserialize MCP response from JSON: {}", body)
            })?
        };

        if response.id != request.id {
            return Err(anyhow!(
                "Response id {} does not match request id {}",
                response.id,
                request.id
            ));
        }

        self.buffered_response = Some(response);
        Ok(())
    }

    async fn recv(&mut self) -> Result<McpResponse> {
        if !self.connected {
            return Err(anyhow!("Transport is not connected"));
        }

        self.buffered_response.take().ok_or_else(|| {
            anyhow!("No buffered response available - HTTP request must be sent before receiving")
        })
    }

    async fn notify(&mut self, notification: &McpNotification) -> Result<()> {
        if !self.connected {
            return Err(anyhow!("Transport is not connected"));
        }

        let json = serde_json::to_string(notification)
            .context("Failed to serialize MCP notification to JSON")?;
        tracing::debug!("POST {} (notification): {}", self.url, json);

        let http_response = self
            .post(json)
            .send()
            .await
            .context("Failed to send HTTP notification")?;

        let status = http_response.status();
        if !status.is_success() {
            let body = http_response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Notification '{}' rejected with status {}: {}",
                notification.method,
                status,
                body.trim()
            ));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    /// End the session with `DELETE`
    ///
    /// Servers that do not support explicit termination answer 405, which is
    /// not treated as an error.
    async fn close(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;

        let Some(session) = self.session_id.take() else {
            return Ok(());
        };

        let response = self
            .client
            .delete(&self.url)
            .headers(self.headers.clone())
            .header(SESSION_HEADER, &session)
            .send()
            .await
            .context("Failed to send session termination request")?;

        let status = response.status();
        if status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED {
            tracing::debug!("Session {} closed ({})", session, status);
            Ok(())
        } else {
            Err(anyhow!(
                "Session termination failed with status: {}",
                status
            ))
        }
    }
}
