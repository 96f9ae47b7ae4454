//! Test cases and their outcomes

use crate::mcp::protocol::{CallToolResult, Content, McpError};
use serde_json::Value;

/// What a case expects from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    /// The tool succeeds
    Success,
    /// The tool reports `isError`, or the server rejects the call
    ToolError,
    /// The tool succeeds and one of its text items contains the needle
    Contains(String),
    /// The tool succeeds and returns an image
    Image,
}

impl Expect {
    /// Shorthand for [`Expect::Contains`]
    pub fn contains(needle: impl Into<String>) -> Self {
        Self::Contains(needle.into())
    }
}

/// One tool invocation with fixed arguments
#[derive(Debug, Clone)]
pub struct ToolCase {
    /// Human-readable label used in logs and the summary
    pub label: String,
    /// Remote tool name
    pub tool: &'static str,
    /// Argument map sent as `arguments`
    pub arguments: Value,
    /// Expected result
    pub expect: Expect,
}

impl ToolCase {
    pub fn new(label: impl Into<String>, tool: &'static str, arguments: Value) -> Self {
        Self {
            label: label.into(),
            tool,
            arguments,
            expect: Expect::Success,
        }
    }

    pub fn expecting(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    pub fn expect_tool_error(self) -> Self {
        self.expecting(Expect::ToolError)
    }
}

/// Outcome of a single case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    Failed { reason: String },
    Skipped { reason: String },
}

impl CaseOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Outcome of a local check made by a routine (e.g. reading a fixture back)
    pub fn check(passed: bool, detail: impl Into<String>) -> Self {
        if passed {
            Self::Passed
        } else {
            Self::failed(detail)
        }
    }
}

/// Compare a successful `tools/call` result with the expectation
pub fn evaluate_result(expect: &Expect, result: &CallToolResult) -> CaseOutcome {
    let first_text = result.first_text().unwrap_or_default();

    if result.is_error {
        return match expect {
            Expect::ToolError => CaseOutcome::Passed,
            _ => CaseOutcome::failed(format!("tool reported error: {}", first_line(first_text))),
        };
    }

    match expect {
        Expect::Success => CaseOutcome::Passed,
        Expect::ToolError => CaseOutcome::failed("expected a tool error but the call succeeded"),
        Expect::Contains(needle) => {
            if result
                .content
                .iter()
                .filter_map(Content::as_text)
                .any(|text| text.contains(needle.as_str()))
            {
                CaseOutcome::Passed
            } else {
                CaseOutcome::failed(format!(
                    "expected text containing {:?}, got {:?}",
                    needle,
                    first_line(first_text)
                ))
            }
        }
        Expect::Image => CaseOutcome::check(
            result.first_image().is_some(),
            "expected an image content item",
        ),
    }
}

/// Compare a failed call with the expectation
///
/// Only a JSON-RPC error from the server counts as an expected rejection;
/// transport failures always fail the case.
pub fn evaluate_error(expect: &Expect, error: &anyhow::Error) -> CaseOutcome {
    let rejected_by_server = error
        .chain()
        .any(|cause| cause.downcast_ref::<McpError>().is_some());

    match expect {
        Expect::ToolError if rejected_by_server => CaseOutcome::Passed,
        _ => CaseOutcome::failed(format!("{:#}", error)),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
