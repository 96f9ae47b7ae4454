//! Unified-diff application inside the server's workspace
//!
//! The apply case is verified locally by reading the fixture back.

use crate::harness::case::{CaseOutcome, ToolCase};
use crate::harness::fixtures::Fixture;
use crate::harness::report::RoutineReport;
use crate::harness::routines::workspace;
use crate::harness::Harness;
use crate::mcp::transport::Transport;
use anyhow::Result;
use serde_json::json;

const TOOL: &str = "patch";

pub const TARGET: &str = "greeting.txt";
pub const ORIGINAL: &str = "hello\nworld\n";
pub const PATCHED: &str = "hello\nharness\n";

pub const DIFF: &str = "--- a/greeting.txt
+++ b/greeting.txt
@@ -1,2 +1,2 @@
 hello
-world
+harness
";

fn patch_case(label: &str, patch: &str, dry_run: bool) -> ToolCase {
    ToolCase::new(label, TOOL, json!({"patch": patch, "dry_run": dry_run}))
}

pub async fn run<T: Transport>(harness: &mut Harness<T>) -> Result<RoutineReport> {
    let fixture = Fixture::new("harness-patch-")?;
    fixture.write(TARGET, ORIGINAL)?;
    let mut report = RoutineReport::new(TOOL);

    if !harness
        .run_case(&mut report, workspace::set_case(&fixture))
        .await
        .is_passed()
    {
        report.record("patch cases", CaseOutcome::skipped("workspace not set"));
        return Ok(report);
    }

    if harness
        .run_case(&mut report, patch_case("dry run", DIFF, true))
        .await
        .is_passed()
    {
        verify(&fixture, &mut report, "dry run left file untouched", ORIGINAL);
    }

    if harness
        .run_case(&mut report, patch_case("apply", DIFF, false))
        .await
        .is_passed()
    {
        verify(&fixture, &mut report, "apply changed file", PATCHED);
    }

    harness
        .run_cases(
            &mut report,
            vec![
                patch_case("re-apply", DIFF, false).expect_tool_error(),
                patch_case("malformed diff", "this is not a diff", false).expect_tool_error(),
            ],
        )
        .await;

    Ok(report)
}

fn verify(fixture: &Fixture, report: &mut RoutineReport, label: &str, expected: &str) {
    let outcome = match fixture.read(TARGET) {
        Ok(actual) => CaseOutcome::check(
            actual == expected,
            format!("{} contains {:?}, expected {:?}", TARGET, actual, expected),
        ),
        Err(e) => CaseOutcome::failed(format!("{:#}", e)),
    };
    if let CaseOutcome::Failed { reason } = &outcome {
        tracing::error!("  FAILED {}: {}", label, reason);
    }
    report.record(label, outcome);
}
