use crate::harness::case::{Expect, ToolCase};
use crate::harness::report::RoutineReport;
use crate::harness::Harness;
use crate::mcp::transport::Transport;
use anyhow::Result;
use serde_json::json;

const TOOL: &str = "calculator";

pub fn cases() -> Vec<ToolCase> {
    let op = |label: &str, operation: &str, x: f64, y: f64| {
        ToolCase::new(label, TOOL, json!({"operation": operation, "x": x, "y": y}))
    };

    vec![
        op("add", "add", 5.0, 3.0).expecting(Expect::contains("8")),
        op("subtract", "subtract", 10.0, 4.0).expecting(Expect::contains("6")),
        op("multiply", "multiply", 6.0, 7.0).expecting(Expect::contains("42")),
        op("divide", "divide", 20.0, 4.0).expecting(Expect::contains("5")),
        op("float operands", "add", 2.5, 0.25).expecting(Expect::contains("2.75")),
        op("divide by zero", "divide", 1.0, 0.0).expect_tool_error(),
        op("unknown operation", "modulo", 7.0, 2.0).expect_tool_error(),
    ]
}

pub async fn run<T: Transport>(harness: &mut Harness<T>) -> Result<RoutineReport> {
    let mut report = RoutineReport::new(TOOL);
    harness.run_cases(&mut report, cases()).await;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::testing::{text, tool_error, tool_list, ScriptedTransport};
    use crate::harness::{bootstrap, report::PreviewLimits, RoutineName};
    use crate::mcp::client::McpClient;
    use crate::mcp::protocol::McpError;
    use tokio_util::sync::CancellationToken;

    fn calculate(args: &serde_json::Value) -> Result<serde_json::Value, McpError> {
        let x = args["x"].as_f64().unwrap_or_default();
        let y = args["y"].as_f64().unwrap_or_default();
        let value = match args["operation"].as_str() {
            Some("add") => x + y,
            Some("subtract") => x - y,
            Some("multiply") => x * y,
            Some("divide") if y == 0.0 => return Ok(tool_error("division by zero")),
            Some("divide") => x / y,
            _ => return Ok(tool_error("unknown operation")),
        };
        Ok(text(&format!("Result: {}", value)))
    }

    #[test]
    fn test_cases_cover_error_paths() {
        let cases = cases();
        assert_eq!(cases.len(), 7);
        let errors = cases
            .iter()
            .filter(|c| c.expect == Expect::ToolError)
            .count();
        assert_eq!(errors, 2);
        assert!(cases.iter().all(|c| c.tool == TOOL));
    }

    #[tokio::test]
    async fn test_routine_against_working_calculator() {
        let transport = ScriptedTransport::new(|req| match req.method.as_str() {
            "tools/list" => Ok(tool_list(&[TOOL])),
            "tools/call" => calculate(&req.params.as_ref().unwrap()["arguments"]),
            _ => Ok(json!({})),
        });
        let mut harness = bootstrap(
            McpClient::new(transport),
            "http://test/mcp",
            CancellationToken::new(),
            PreviewLimits::default(),
        )
        .await
        .unwrap();

        let summary = harness.run(RoutineName::Calculator).await;
        let report = &summary.routines[0];
        assert_eq!(report.failed(), 0, "{}", summary.render());
        assert_eq!(report.passed(), 7);
    }
}
