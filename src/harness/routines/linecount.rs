//! Line counting relative to the server's workspace

use crate::harness::case::{CaseOutcome, Expect, ToolCase};
use crate::harness::fixtures::Fixture;
use crate::harness::report::RoutineReport;
use crate::harness::routines::workspace;
use crate::harness::Harness;
use crate::mcp::transport::Transport;
use anyhow::Result;
use serde_json::json;

const TOOL: &str = "linecount";

pub fn build_fixture() -> Result<Fixture> {
    let fixture = Fixture::new("harness-linecount-")?;
    fixture.write("three.txt", "one\ntwo\nthree\n")?;
    fixture.write("empty.txt", "")?;
    Ok(fixture)
}

pub fn cases(fixture: &Fixture) -> Vec<ToolCase> {
    let absolute = fixture.file("three.txt").display().to_string();

    vec![
        workspace::set_case(fixture),
        ToolCase::new("relative file", TOOL, json!({"file": "three.txt"}))
            .expecting(Expect::contains("3")),
        ToolCase::new("absolute file", TOOL, json!({"file": absolute}))
            .expecting(Expect::contains("3")),
        ToolCase::new("empty file", TOOL, json!({"file": "empty.txt"}))
            .expecting(Expect::contains("0")),
        ToolCase::new("missing file", TOOL, json!({"file": "missing.txt"})).expect_tool_error(),
    ]
}

pub async fn run<T: Transport>(harness: &mut Harness<T>) -> Result<RoutineReport> {
    let fixture = build_fixture()?;
    let mut report = RoutineReport::new(TOOL);

    let mut cases = cases(&fixture).into_iter();
    if let Some(set) = cases.next() {
        // relative paths are meaningless without a workspace
        if !harness.run_case(&mut report, set).await.is_passed() {
            for case in cases {
                report.record(case.label, CaseOutcome::skipped("workspace not set"));
            }
            return Ok(report);
        }
    }
    harness.run_cases(&mut report, cases.collect()).await;
    Ok(report)
}
