use crate::harness::case::{Expect, ToolCase};
use crate::harness::fixtures::Fixture;
use crate::harness::report::RoutineReport;
use crate::harness::Harness;
use crate::mcp::transport::Transport;
use anyhow::Result;
use serde_json::json;

const TOOL: &str = "file_search";

/// Small tree with text, source and nested markdown files
pub fn build_fixture() -> Result<Fixture> {
    let fixture = Fixture::new("harness-search-")?;
    fixture.write("notes.txt", "meeting notes\nTODO: ship the harness\n")?;
    fixture.write("todo.txt", "buy milk\n")?;
    fixture.write("src/main.rs", "fn main() {}\n")?;
    fixture.write("src/lib.rs", "pub fn lib() {}\n")?;
    fixture.write("docs/guide/readme.md", "# Guide\n")?;
    Ok(fixture)
}

pub fn cases(fixture: &Fixture) -> Vec<ToolCase> {
    let root = fixture.root();
    let missing = fixture.file("does-not-exist").display().to_string();

    vec![
        ToolCase::new(
            "glob *.txt",
            TOOL,
            json!({"directory": root, "pattern": "*.txt"}),
        )
        .expecting(Expect::contains("notes.txt")),
        ToolCase::new(
            "content query",
            TOOL,
            json!({"directory": root, "query": "TODO"}),
        )
        .expecting(Expect::contains("notes.txt")),
        ToolCase::new(
            "extension filter",
            TOOL,
            json!({"directory": root, "extensions": ["rs", "md"]}),
        )
        .expecting(Expect::contains("main.rs")),
        ToolCase::new(
            "non-recursive",
            TOOL,
            json!({"directory": root, "pattern": "*", "recursive": false}),
        ),
        ToolCase::new(
            "result limit",
            TOOL,
            json!({"directory": root, "pattern": "*", "max_results": 2}),
        ),
        ToolCase::new(
            "missing directory",
            TOOL,
            json!({"directory": missing, "pattern": "*"}),
        )
        .expect_tool_error(),
    ]
}

pub async fn run<T: Transport>(harness: &mut Harness<T>) -> Result<RoutineReport> {
    let fixture = build_fixture()?;
    let mut report = RoutineReport::new(TOOL);
    harness.run_cases(&mut report, cases(&fixture)).await;
    Ok(report)
}
