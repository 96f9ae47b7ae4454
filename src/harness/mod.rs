//! Smoke-test harness
//!
//! [`connect`] opens a session with the server and lists what it offers.
//! [`Harness::run`] then walks the selected routines in order, one case at a
//! time, printing the first content item of each result and collecting
//! outcomes into a [`RunSummary`].

pub mod case;
pub mod fixtures;
pub mod report;
pub mod routines;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::Config;
use crate::error::HarnessError;
use crate::mcp::client::McpClient;
use crate::mcp::http_transport::StreamableHttpTransport;
use crate::mcp::transport::Transport;
use anyhow::Result;
use case::{evaluate_error, evaluate_result, CaseOutcome, Expect, ToolCase};
use clap::ValueEnum;
use report::{describe_content, describe_resource, PreviewLimits, RoutineReport, RunSummary};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Time allowed for ending the session once the run is cancelled
pub const CANCELLED_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Routine selector for `--tool`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoutineName {
    All,
    Calculator,
    #[value(name = "file-search", alias = "file_search")]
    FileSearch,
    Shell,
    Workspace,
    Linecount,
    Patch,
    Rag,
    Image,
    Resources,
}

impl RoutineName {
    /// Every concrete routine, in run order
    pub const ROUTINES: [RoutineName; 9] = [
        Self::Calculator,
        Self::FileSearch,
        Self::Shell,
        Self::Workspace,
        Self::Linecount,
        Self::Patch,
        Self::Rag,
        Self::Image,
        Self::Resources,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Calculator => "calculator",
            Self::FileSearch => "file_search",
            Self::Shell => "shell",
            Self::Workspace => "workspace",
            Self::Linecount => "linecount",
            Self::Patch => "patch",
            Self::Rag => "rag",
            Self::Image => "image",
            Self::Resources => "resources",
        }
    }

    /// Parse a selector from configuration (case-insensitive, `_` or `-`)
    pub fn parse(raw: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(&raw.trim().replace('_', "-"), true).map_err(|_| {
            anyhow::anyhow!(
                "Unknown routine '{}'. Valid: all, {}",
                raw,
                Self::ROUTINES
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }

    /// Remote tools the routine calls
    pub fn required_tools(&self) -> &'static [&'static str] {
        match self {
            Self::All | Self::Resources => &[],
            Self::Calculator => &["calculator"],
            Self::FileSearch => &["file_search"],
            Self::Shell => &["shell"],
            Self::Workspace => &["workspace"],
            Self::Linecount => &["workspace", "linecount"],
            Self::Patch => &["workspace", "patch"],
            Self::Rag => &["rag"],
            Self::Image => &["image"],
        }
    }

    /// Concrete routines this selector runs
    pub fn expand(&self) -> Vec<RoutineName> {
        match self {
            Self::All => Self::ROUTINES.to_vec(),
            other => vec![*other],
        }
    }
}

impl std::fmt::Display for RoutineName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An initialized session plus the run's cancellation token
pub struct Harness<T: Transport> {
    client: McpClient<T>,
    cancel: CancellationToken,
    limits: PreviewLimits,
    /// `tools/list` succeeded, so a missing tool really is missing
    tools_listed: bool,
}

/// Open a Streamable HTTP session using the resolved configuration
pub async fn connect(
    config: &Config,
    cancel: CancellationToken,
) -> Result<Harness<StreamableHttpTransport>, HarnessError> {
    let url = config.server.url.as_str();
    info!("Connecting to MCP server at {}", url);

    let transport = StreamableHttpTransport::new(url)
        .and_then(|t| t.with_timeout(config.request_timeout()))
        .and_then(|t| t.with_headers(&config.server.headers))
        .map_err(|e| HarnessError::Config(format!("{:#}", e)))?;

    let client =
        McpClient::new(transport).with_protocol_version(config.server.protocol_version.clone());
    let limits = PreviewLimits {
        max_lines: config.harness.preview_lines,
        max_chars: config.harness.preview_chars,
    };

    bootstrap(client, url, cancel, limits).await
}

/// Initialize a client and list the server's resources and tools
///
/// Listing failures are logged and leave the listings empty. Cancellation
/// during the listings is not an error: the returned harness reports every
/// routine as skipped.
pub async fn bootstrap<T: Transport>(
    mut client: McpClient<T>,
    url: &str,
    cancel: CancellationToken,
    limits: PreviewLimits,
) -> Result<Harness<T>, HarnessError> {
    let initialized = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(HarnessError::Cancelled("cancelled during initialize".to_string()));
        }
        result = client.initialize() => result,
    };
    initialized.map_err(|e| HarnessError::from_handshake(url, &e))?;

    if let Some(caps) = client.server_capabilities() {
        info!(
            "Connected to {} v{} (protocol {})",
            caps.server_info.name, caps.server_info.version, caps.protocol_version
        );
        if let Some(instructions) = &caps.instructions {
            debug!("Server instructions: {}", instructions);
        }
    }

    let resources = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = client.list_resources() => Some(result),
    };
    match resources {
        None => warn!("Resource listing interrupted: run cancelled"),
        Some(Ok(resources)) => {
            for resource in &resources {
                info!(
                    "  resource: {} ({}) {}",
                    resource.uri,
                    resource.name,
                    resource.mime_type.as_deref().unwrap_or("")
                );
            }
        }
        Some(Err(e)) => warn!("Failed to list resources: {:#}", e),
    }

    let tools = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = client.list_tools() => Some(result),
    };
    let tools_listed = match tools {
        None => {
            warn!("Tool listing interrupted: run cancelled");
            false
        }
        Some(Ok(tools)) => {
            for tool in &tools {
                info!("  tool: {} - {}", tool.name, tool.description);
            }
            true
        }
        Some(Err(e)) => {
            warn!("Failed to list tools: {:#}", e);
            false
        }
    };

    Ok(Harness {
        client,
        cancel,
        limits,
        tools_listed,
    })
}

impl<T: Transport> Harness<T> {
    pub fn client(&self) -> &McpClient<T> {
        &self.client
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether a routine may call this tool
    ///
    /// When `tools/list` failed every tool is assumed present.
    pub fn tool_available(&self, name: &str) -> bool {
        !self.tools_listed || self.client.has_tool(name)
    }

    /// Run one tool case, print its first content item and record the outcome
    pub async fn run_case(&mut self, report: &mut RoutineReport, case: ToolCase) -> CaseOutcome {
        if self.cancel.is_cancelled() {
            let outcome = CaseOutcome::skipped("run cancelled");
            report.record(case.label, outcome.clone());
            return outcome;
        }

        info!("[{}] {}", report.name, case.label);
        debug!("  {} arguments: {}", case.tool, case.arguments);

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.client.call_tool(case.tool, case.arguments.clone()) => Some(result),
        };

        let outcome = match result {
            None => CaseOutcome::skipped("run cancelled"),
            Some(Ok(result)) => {
                let shown = match case.expect {
                    Expect::Image => result.first_image(),
                    _ => result.first_displayable(),
                };
                match shown.or_else(|| result.content.first()) {
                    Some(content) => println!(
                        "--- {} ---\n{}",
                        case.label,
                        describe_content(content, self.limits)
                    ),
                    None => println!("--- {} ---\n(no content)", case.label),
                }
                evaluate_result(&case.expect, &result)
            }
            Some(Err(e)) => {
                if case.expect == Expect::ToolError {
                    info!("  rejected as expected: {:#}", e);
                } else {
                    error!("Tool call '{}' failed: {:#}", case.label, e);
                }
                evaluate_error(&case.expect, &e)
            }
        };

        if let CaseOutcome::Failed { reason } = &outcome {
            error!("  FAILED {}: {}", case.label, reason);
        }
        report.record(case.label, outcome.clone());
        outcome
    }

    /// Run cases in order, continuing past failures
    pub async fn run_cases(&mut self, report: &mut RoutineReport, cases: Vec<ToolCase>) {
        for case in cases {
            self.run_case(report, case).await;
        }
    }

    /// Read a resource and print its contents
    ///
    /// With `expect_error` the case passes only when the server rejects the
    /// read with a JSON-RPC error.
    pub async fn read_resource_case(
        &mut self,
        report: &mut RoutineReport,
        label: &str,
        uri: &str,
        expect_error: bool,
    ) -> CaseOutcome {
        if self.cancel.is_cancelled() {
            let outcome = CaseOutcome::skipped("run cancelled");
            report.record(label, outcome.clone());
            return outcome;
        }

        info!("[{}] {}", report.name, label);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.client.read_resource(uri) => Some(result),
        };

        let outcome = match result {
            None => CaseOutcome::skipped("run cancelled"),
            Some(Ok(read)) => {
                for contents in &read.contents {
                    println!("--- {} ---\n{}", label, describe_resource(contents, self.limits));
                }
                if expect_error {
                    CaseOutcome::failed(format!("expected '{}' to be rejected", uri))
                } else {
                    CaseOutcome::check(
                        !read.contents.is_empty(),
                        format!("'{}' returned no contents", uri),
                    )
                }
            }
            Some(Err(e)) => {
                let expect = if expect_error {
                    Expect::ToolError
                } else {
                    Expect::Success
                };
                if !expect_error {
                    error!("Resource read '{}' failed: {:#}", uri, e);
                }
                evaluate_error(&expect, &e)
            }
        };

        if let CaseOutcome::Failed { reason } = &outcome {
            error!("  FAILED {}: {}", label, reason);
        }
        report.record(label, outcome.clone());
        outcome
    }

    /// Run the selected routines and collect their outcomes
    pub async fn run(&mut self, selection: RoutineName) -> RunSummary {
        let mut summary = RunSummary::new();
        info!("Starting run {} ({})", summary.run_id, selection);

        for routine in selection.expand() {
            if self.cancel.is_cancelled() {
                summary.push(RoutineReport::skipped(routine.as_str(), "run cancelled"));
                continue;
            }

            if let Some(missing) = routine
                .required_tools()
                .iter()
                .find(|tool| !self.tool_available(tool))
            {
                warn!(
                    "Skipping {} routine: server does not advertise tool '{}'",
                    routine, missing
                );
                summary.push(RoutineReport::skipped(
                    routine.as_str(),
                    format!("tool '{}' not advertised", missing),
                ));
                continue;
            }

            info!("Running {} routine", routine);
            let report = match self.run_routine(routine).await {
                Ok(report) => report,
                Err(e) => {
                    error!("Routine {} aborted: {:#}", routine, e);
                    let mut report = RoutineReport::new(routine.as_str());
                    report.record("setup", CaseOutcome::failed(format!("{:#}", e)));
                    report
                }
            };
            info!(
                "Finished {} routine: {} passed, {} failed",
                routine,
                report.passed(),
                report.failed()
            );
            summary.push(report);
        }

        if self.cancel.is_cancelled() {
            warn!("run cancelled");
        }
        summary.finish();
        summary
    }

    async fn run_routine(&mut self, routine: RoutineName) -> Result<RoutineReport> {
        match routine {
            RoutineName::All => Ok(RoutineReport::new("all")),
            RoutineName::Calculator => routines::calculator::run(self).await,
            RoutineName::FileSearch => routines::file_search::run(self).await,
            RoutineName::Shell => routines::shell::run(self).await,
            RoutineName::Workspace => routines::workspace::run(self).await,
            RoutineName::Linecount => routines::linecount::run(self).await,
            RoutineName::Patch => routines::patch::run(self).await,
            RoutineName::Rag => routines::rag::run(self).await,
            RoutineName::Image => routines::image::run(self).await,
            RoutineName::Resources => routines::resources::run(self).await,
        }
    }

    /// End the server session
    ///
    /// After cancellation the `DELETE` gets [`CANCELLED_CLOSE_GRACE`] at most.
    pub async fn close(&mut self) {
        let closed = if self.cancel.is_cancelled() {
            match tokio::time::timeout(CANCELLED_CLOSE_GRACE, self.client.close()).await {
                Ok(closed) => closed,
                Err(_) => {
                    warn!(
                        "Session close abandoned after {:?}: run cancelled",
                        CANCELLED_CLOSE_GRACE
                    );
                    return;
                }
            }
        } else {
            self.client.close().await
        };
        if let Err(e) = closed {
            warn!("Failed to close session cleanly: {:#}", e);
        }
    }
}
