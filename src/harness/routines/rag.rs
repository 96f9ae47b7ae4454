//! Retrieval: index a small corpus into a fresh collection, then query it

use crate::harness::case::ToolCase;
use crate::harness::fixtures::Fixture;
use crate::harness::report::RoutineReport;
use crate::harness::Harness;
use crate::mcp::transport::Transport;
use anyhow::Result;
use serde_json::json;
use uuid::Uuid;

const TOOL: &str = "rag";

pub fn build_fixture() -> Result<Fixture> {
    let fixture = Fixture::new("harness-rag-")?;
    fixture.write(
        "rust.md",
        "Rust is a systems programming language focused on memory safety.\n",
    )?;
    fixture.write(
        "tokio.md",
        "Tokio is an asynchronous runtime for writing network applications in Rust.\n",
    )?;
    fixture.write(
        "serde.md",
        "Serde serializes and deserializes Rust data structures.\n",
    )?;
    Ok(fixture)
}

/// Collection names are unique per run so reruns never see stale data
pub fn collection_name() -> String {
    format!("harness-{}", Uuid::new_v4().simple())
}

pub fn cases(fixture: &Fixture, collection: &str) -> Vec<ToolCase> {
    let unknown = collection_name();

    vec![
        ToolCase::new(
            "index corpus",
            TOOL,
            json!({"action": "index", "collection": collection, "path": fixture.root()}),
        ),
        ToolCase::new(
            "query top_k",
            TOOL,
            json!({
                "action": "query",
                "collection": collection,
                "query": "asynchronous runtime",
                "top_k": 2
            }),
        ),
        ToolCase::new(
            "query without hits",
            TOOL,
            json!({
                "action": "query",
                "collection": collection,
                "query": "zebra migration patterns",
                "top_k": 1
            }),
        ),
        ToolCase::new(
            "unknown collection",
            TOOL,
            json!({"action": "query", "collection": unknown, "query": "rust"}),
        )
        .expect_tool_error(),
    ]
}

pub async fn run<T: Transport>(harness: &mut Harness<T>) -> Result<RoutineReport> {
    let fixture = build_fixture()?;
    let collection = collection_name();
    tracing::debug!("Using RAG collection {}", collection);

    let mut report = RoutineReport::new(TOOL);
    harness.run_cases(&mut report, cases(&fixture, &collection)).await;
    Ok(report)
}
