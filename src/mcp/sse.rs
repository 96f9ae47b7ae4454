//! Server-Sent Events framing
//!
//! Streamable HTTP servers may answer a POST with `text/event-stream` instead
//! of a plain JSON body. Each event's `data:` lines carry one JSON-RPC message.
//! Lines starting with `:` are comments, `event:`/`id:`/`retry:` fields are
//! ignored, and a blank line terminates an event.

use crate::mcp::protocol::McpResponse;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// One decoded SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field, `message` when absent
    pub event: String,

    /// `data:` lines joined with `\n`
    pub data: String,
}

/// Split an event-stream body into events
///
/// Events without any `data:` line are dropped. A trailing event that is not
/// followed by a blank line is still returned.
pub fn parse_events(body: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut event_name: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    let mut flush = |event_name: &mut Option<String>, data_lines: &mut Vec<&str>| {
        if !data_lines.is_empty() {
            events.push(SseEvent {
                event: event_name.take().unwrap_or_else(|| "message".to_string()),
                data: data_lines.join("\n"),
            });
        }
        event_name.take();
        data_lines.clear();
    };

    for raw in body.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.is_empty() {
            flush(&mut event_name, &mut data_lines);
            continue;
        }
        if line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => data_lines.push(value),
            "event" => event_name = Some(value.to_string()),
            _ => {}
        }
    }
    flush(&mut event_name, &mut data_lines);

    events
}

/// Find the JSON-RPC response for `request_id` in an event-stream body
///
/// Server notifications and server-to-client requests that arrive before the
/// response are skipped. A payload may also be a JSON-RPC batch array.
pub fn find_response(body: &str, request_id: u64) -> Result<McpResponse> {
    for event in parse_events(body) {
        if event.event != "message" {
            tracing::debug!("Skipping SSE event '{}'", event.event);
            continue;
        }

        let value: Value = serde_json::from_str(&event.data)
            .with_context(|| format!("SSE event is not valid JSON: {}", event.data))?;

        let messages = match value {
            Value::Array(items) => items,
            single => vec![single],
        };

        for message in messages {
            if !is_response_for(&message, request_id) {
                tracing::debug!("Skipping server message in stream: {}", message);
                continue;
            }
            return serde_json::from_value(message)
                .context("Failed to deserialize MCP response from SSE event");
        }
    }

    Err(anyhow!(
        "Event stream ended without a response for request {}",
        request_id
    ))
}

fn is_response_for(message: &Value, request_id: u64) -> bool {
    let has_payload = message.get("result").is_some() || message.get("error").is_some();
    has_payload && message.get("id").and_then(Value::as_u64) == Some(request_id)
}
