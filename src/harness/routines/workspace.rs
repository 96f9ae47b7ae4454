//! Workspace session state: set, read back, list, reject a bad path

use crate::harness::case::{Expect, ToolCase};
use crate::harness::fixtures::Fixture;
use crate::harness::report::RoutineReport;
use crate::harness::Harness;
use crate::mcp::transport::Transport;
use anyhow::Result;
use serde_json::json;

pub(crate) const TOOL: &str = "workspace";

/// Case that points the server's workspace at `fixture`
pub(crate) fn set_case(fixture: &Fixture) -> ToolCase {
    ToolCase::new(
        "set workspace",
        TOOL,
        json!({"action": "set", "path": fixture.root()}),
    )
}

pub fn cases(fixture: &Fixture) -> Vec<ToolCase> {
    let missing = fixture.file("no-such-dir").display().to_string();

    vec![
        set_case(fixture),
        ToolCase::new("get workspace", TOOL, json!({"action": "get"}))
            .expecting(Expect::contains(fixture.dir_name())),
        ToolCase::new("list workspace", TOOL, json!({"action": "list"}))
            .expecting(Expect::contains("readme.txt")),
        ToolCase::new(
            "set missing directory",
            TOOL,
            json!({"action": "set", "path": missing}),
        )
        .expect_tool_error(),
    ]
}

pub async fn run<T: Transport>(harness: &mut Harness<T>) -> Result<RoutineReport> {
    let fixture = Fixture::new("harness-workspace-")?;
    fixture.write("readme.txt", "workspace fixture\n")?;

    let mut report = RoutineReport::new(TOOL);
    harness.run_cases(&mut report, cases(&fixture)).await;
    Ok(report)
}
