//! Property-Based Tests for the MCP client layer
//!
//! # Test Strategies
//!
//! - **SSE framing**: the response is found wherever it sits in a stream of
//!   unrelated events, and multi-line `data:` fields are rejoined exactly
//! - **Response decoding**: `into_result` yields exactly one of result/error
//! - **Content decoding**: unknown content types never fail a tool result
//! - **Preview truncation**: printed previews stay within their limits
//!
//! # Running the Tests
//!
//! ```bash
//! cargo test --lib mcp::proptests
//! ```

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::harness::report::{preview_text, PreviewLimits};
use crate::mcp::protocol::{CallToolResult, Content, McpError, McpResponse};
use crate::mcp::sse::{find_response, parse_events};

// Helper: arbitrary JSON scalars for result payloads
fn arb_json_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9 ]*".prop_map(Value::String),
    ]
}

// Helper: a server notification that may precede the response
fn arb_notification() -> impl Strategy<Value = String> {
    ("[a-z/]{1,20}", 0u32..100).prop_map(|(method, progress)| {
        json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": {"progress": progress}
        })
        .to_string()
    })
}

fn frame(data: &str) -> String {
    data.lines()
        .map(|line| format!("data: {}\n", line))
        .collect::<String>()
        + "\n"
}

proptest! {
    #[test]
    fn prop_find_response_skips_noise(
        id in 1u64..10_000,
        before in prop::collection::vec(arb_notification(), 0..5),
        after in prop::collection::vec(arb_notification(), 0..3),
        payload in arb_json_value(),
        crlf in any::<bool>(),
    ) {
        let response = json!({"jsonrpc": "2.0", "id": id, "result": {"value": payload.clone()}});

        let mut body = String::from(": stream open\n\n");
        for note in &before {
            body.push_str(&frame(note));
        }
        body.push_str(&frame(&response.to_string()));
        for note in &after {
            body.push_str(&frame(note));
        }
        if crlf {
            body = body.replace('\n', "\r\n");
        }

        let found = find_response(&body, id).unwrap();
        prop_assert_eq!(found.id, id);
        prop_assert_eq!(found.result, Some(json!({"value": payload})));
    }

    #[test]
    fn prop_stream_without_response_is_error(
        id in 1u64..10_000,
        notes in prop::collection::vec(arb_notification(), 0..5),
    ) {
        let body: String = notes.iter().map(|n| frame(n)).collect();
        prop_assert!(find_response(&body, id).is_err());
    }

    #[test]
    fn prop_multiline_data_rejoined(lines in prop::collection::vec("[a-zA-Z0-9{}\":, ]{1,30}", 1..6)) {
        let data = lines.join("\n");
        let events = parse_events(&frame(&data));
        prop_assert_eq!(events.len(), 1);
        prop_assert_eq!(&events[0].data, &data);
        prop_assert_eq!(events[0].event.as_str(), "message");
    }

    #[test]
    fn prop_into_result_exactly_one(
        id in any::<u64>(),
        payload in arb_json_value(),
        code in -32700i32..-32000,
        message in "[a-zA-Z ]{1,40}",
        success in any::<bool>(),
    ) {
        let response = if success {
            McpResponse::ok(id, payload.clone())
        } else {
            McpResponse::err(id, McpError::new(code, message.clone()))
        };
        let json = serde_json::to_string(&response).unwrap();
        let decoded: McpResponse = serde_json::from_str(&json).unwrap();

        match decoded.into_result() {
            Ok(value) => {
                prop_assert!(success);
                prop_assert_eq!(value, payload);
            }
            Err(error) => {
                prop_assert!(!success);
                prop_assert_eq!(error.code, code);
                prop_assert_eq!(error.message, message);
            }
        }
    }

    #[test]
    fn prop_unknown_content_never_fails(kind in "[a-z]{3,12}", text in "[a-z ]{0,20}") {
        prop_assume!(!matches!(
            kind.as_str(),
            "text" | "image" | "audio" | "resource"
        ));
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": kind, "payload": 1},
                {"type": "text", "text": text.clone()}
            ]
        }))
        .unwrap();

        prop_assert_eq!(&result.content[0], &Content::Unknown);
        prop_assert_eq!(result.first_text(), Some(text.as_str()));
    }

    #[test]
    fn prop_preview_within_limits(
        lines in prop::collection::vec("[a-zA-Zé ]{1,50}", 0..40),
        max_lines in 1usize..15,
        max_chars in 1usize..300,
    ) {
        let text = lines.join("\n");
        let limits = PreviewLimits { max_lines, max_chars };
        let preview = preview_text(&text, limits);

        let body = preview.strip_suffix("\n... (truncated)").unwrap_or(&preview);
        prop_assert!(body.chars().count() <= max_chars);
        prop_assert!(body.lines().count() <= max_lines);
        if lines.len() <= max_lines && text.chars().count() <= max_chars {
            prop_assert_eq!(preview, text);
        }
    }
}
