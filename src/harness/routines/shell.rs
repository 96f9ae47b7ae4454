use crate::harness::case::{Expect, ToolCase};
use crate::harness::fixtures::Fixture;
use crate::harness::report::RoutineReport;
use crate::harness::Harness;
use crate::mcp::transport::Transport;
use anyhow::Result;
use serde_json::json;

const TOOL: &str = "shell";

const ENV_MARKER: &str = "smoke-42";

pub fn cases(fixture: &Fixture) -> Vec<ToolCase> {
    let root = fixture.root();

    vec![
        ToolCase::new("echo", TOOL, json!({"command": "echo hello from harness"}))
            .expecting(Expect::contains("hello from harness")),
        ToolCase::new(
            "args array",
            TOOL,
            json!({"command": "ls", "args": ["-a", root]}),
        )
        .expecting(Expect::contains("marker.txt")),
        ToolCase::new("cwd", TOOL, json!({"command": "pwd", "cwd": root}))
            .expecting(Expect::contains(fixture.dir_name())),
        ToolCase::new(
            "environment",
            TOOL,
            json!({
                "command": "printenv",
                "args": ["HARNESS_MARKER"],
                "env": {"HARNESS_MARKER": ENV_MARKER}
            }),
        )
        .expecting(Expect::contains(ENV_MARKER)),
        ToolCase::new("non-zero exit", TOOL, json!({"command": "exit 3"})).expect_tool_error(),
        ToolCase::new(
            "timeout",
            TOOL,
            json!({"command": "sleep", "args": ["10"], "timeout": 1}),
        )
        .expect_tool_error(),
    ]
}

pub async fn run<T: Transport>(harness: &mut Harness<T>) -> Result<RoutineReport> {
    let fixture = Fixture::new("harness-shell-")?;
    fixture.write("marker.txt", "marker\n")?;

    let mut report = RoutineReport::new(TOOL);
    harness.run_cases(&mut report, cases(&fixture)).await;
    Ok(report)
}
