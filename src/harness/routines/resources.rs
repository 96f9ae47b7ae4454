//! Reads advertised resources, then an unknown URI

use crate::harness::report::RoutineReport;
use crate::harness::Harness;
use crate::mcp::transport::Transport;
use anyhow::Result;
use uuid::Uuid;

/// Upper bound on resources read per run
pub const MAX_READS: usize = 10;

pub async fn run<T: Transport>(harness: &mut Harness<T>) -> Result<RoutineReport> {
    let mut report = RoutineReport::new("resources");

    let uris: Vec<String> = harness
        .client()
        .resources()
        .iter()
        .take(MAX_READS)
        .map(|r| r.uri.clone())
        .collect();
    if uris.is_empty() {
        tracing::info!("Server lists no resources");
    }

    for uri in &uris {
        harness
            .read_resource_case(&mut report, &format!("read {}", uri), uri, false)
            .await;
    }

    let unknown = format!("harness://missing/{}", Uuid::new_v4());
    harness
        .read_resource_case(&mut report, "unknown uri", &unknown, true)
        .await;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::testing::ScriptedTransport;
    use crate::harness::{bootstrap, report::PreviewLimits, RoutineName};
    use crate::mcp::client::McpClient;
    use crate::mcp::protocol::McpError;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_reads_at_most_ten_resources() {
        let transport = ScriptedTransport::new(|req| match req.method.as_str() {
            "resources/list" => {
                let resources: Vec<_> = (0..12)
                    .map(|n| json!({"uri": format!("docs://{}", n), "name": format!("doc {}", n)}))
                    .collect();
                Ok(json!({ "resources": resources }))
            }
            "resources/read" => {
                let uri = req.params.as_ref().unwrap()["uri"].as_str().unwrap();
                if uri.starts_with("docs://") {
                    Ok(json!({"contents": [{"uri": uri, "mimeType": "text/plain", "text": "doc"}]}))
                } else {
                    Err(McpError::new(-32002, "Resource not found"))
                }
            }
            _ => Ok(json!({"tools": []})),
        });
        let mut harness = bootstrap(
            McpClient::new(transport),
            "http://test/mcp",
            CancellationToken::new(),
            PreviewLimits::default(),
        )
        .await
        .unwrap();

        let summary = harness.run(RoutineName::Resources).await;
        let report = &summary.routines[0];
        assert_eq!(report.cases.len(), MAX_READS + 1);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.cases.last().unwrap().label, "unknown uri");
    }
}
