use crate::harness::case::{Expect, ToolCase};
use crate::harness::report::RoutineReport;
use crate::harness::Harness;
use crate::mcp::transport::Transport;
use anyhow::Result;
use serde_json::json;

const TOOL: &str = "image";

pub fn cases() -> Vec<ToolCase> {
    vec![
        ToolCase::new(
            "solid square",
            TOOL,
            json!({"shape": "square", "color": "#3366ff", "width": 64, "height": 64}),
        )
        .expecting(Expect::Image),
        ToolCase::new(
            "custom size",
            TOOL,
            json!({"shape": "square", "color": "red", "width": 128, "height": 32}),
        )
        .expecting(Expect::Image),
    ]
}

pub async fn run<T: Transport>(harness: &mut Harness<T>) -> Result<RoutineReport> {
    let mut report = RoutineReport::new(TOOL);
    harness.run_cases(&mut report, cases()).await;
    Ok(report)
}
