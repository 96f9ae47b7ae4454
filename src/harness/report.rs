//! Content previews and the end-of-run summary

use crate::harness::case::CaseOutcome;
use crate::mcp::protocol::{Content, ResourceContents};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use uuid::Uuid;

/// Limits applied when printing text content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewLimits {
    pub max_lines: usize,
    pub max_chars: usize,
}

impl Default for PreviewLimits {
    fn default() -> Self {
        Self {
            max_lines: 10,
            max_chars: 2000,
        }
    }
}

/// Truncate text to the preview limits, marking the cut
pub fn preview_text(text: &str, limits: PreviewLimits) -> String {
    let mut out = String::new();
    let mut truncated = false;

    for (index, line) in text.lines().enumerate() {
        if index >= limits.max_lines {
            truncated = true;
            break;
        }
        if index > 0 {
            out.push('\n');
        }
        out.push_str(line);
    }

    if out.chars().count() > limits.max_chars {
        out = out.chars().take(limits.max_chars).collect();
        truncated = true;
    }

    if truncated {
        out.push_str("\n... (truncated)");
    }
    out
}

/// Approximate decoded size of a base64 payload
pub fn base64_decoded_len(data: &str) -> usize {
    let trimmed = data.trim();
    let padding = trimmed.chars().rev().take_while(|c| *c == '=').count();
    (trimmed.len() / 4 * 3).saturating_sub(padding)
}

/// Render one content item for the terminal
pub fn describe_content(content: &Content, limits: PreviewLimits) -> String {
    match content {
        Content::Text { text } => preview_text(text, limits),
        Content::Image { data, mime_type } => {
            format!("[image {}, {} bytes]", mime_type, base64_decoded_len(data))
        }
        Content::Audio { data, mime_type } => {
            format!("[audio {}, {} bytes]", mime_type, base64_decoded_len(data))
        }
        Content::Resource { resource } => describe_resource(resource, limits),
        Content::ResourceLink { uri, .. } => format!("[resource link {}]", uri),
        Content::Unknown => "[unsupported content type]".to_string(),
    }
}

/// Render resource contents for the terminal
pub fn describe_resource(resource: &ResourceContents, limits: PreviewLimits) -> String {
    let mime = resource.mime_type.as_deref().unwrap_or("unknown");
    match (&resource.text, &resource.blob) {
        (Some(text), _) => format!(
            "[resource {} ({})]\n{}",
            resource.uri,
            mime,
            preview_text(text, limits)
        ),
        (None, Some(blob)) => format!(
            "[resource {} ({}), {} bytes]",
            resource.uri,
            mime,
            base64_decoded_len(blob)
        ),
        (None, None) => format!("[resource {} ({}), empty]", resource.uri, mime),
    }
}

/// One executed case
#[derive(Debug, Clone)]
pub struct CaseRecord {
    pub label: String,
    pub outcome: CaseOutcome,
}

/// Results of one routine
#[derive(Debug, Clone)]
pub struct RoutineReport {
    pub name: String,
    pub cases: Vec<CaseRecord>,
    /// Set when the whole routine did not run
    pub skipped: Option<String>,
}

impl RoutineReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
            skipped: None,
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Self::new(name)
        }
    }

    pub fn record(&mut self, label: impl Into<String>, outcome: CaseOutcome) {
        self.cases.push(CaseRecord {
            label: label.into(),
            outcome,
        });
    }

    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.outcome.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.iter().filter(|c| c.outcome.is_failed()).count()
    }

    pub fn skipped_cases(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| matches!(c.outcome, CaseOutcome::Skipped { .. }))
            .count()
    }
}

/// Everything that happened in one harness run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub routines: Vec<RoutineReport>,
    pub cancelled: Option<String>,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            routines: Vec::new(),
            cancelled: None,
        }
    }

    pub fn push(&mut self, report: RoutineReport) {
        self.routines.push(report);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn passed(&self) -> usize {
        self.routines.iter().map(RoutineReport::passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.routines.iter().map(RoutineReport::failed).sum()
    }

    /// Skipped cases inside routines that ran
    pub fn skipped(&self) -> usize {
        self.routines.iter().map(RoutineReport::skipped_cases).sum()
    }

    /// Routines that never ran (tool not advertised, or run cancelled)
    pub fn skipped_routines(&self) -> usize {
        self.routines.iter().filter(|r| r.skipped.is_some()).count()
    }

    /// Wall time in milliseconds, up to now when the run is still going
    pub fn elapsed_ms(&self) -> i64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }

    /// Plain-text table of per-routine results followed by failure details
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "==========================================");
        let _ = writeln!(out, "MCP harness summary (run {})", self.run_id);
        let _ = writeln!(out, "==========================================");
        let _ = writeln!(
            out,
            "{:<14} {:>7} {:>7} {:>7}",
            "routine", "passed", "failed", "skipped"
        );

        for routine in &self.routines {
            match &routine.skipped {
                Some(reason) => {
                    let _ = writeln!(out, "{:<14} skipped: {}", routine.name, reason);
                }
                None => {
                    let _ = writeln!(
                        out,
                        "{:<14} {:>7} {:>7} {:>7}",
                        routine.name,
                        routine.passed(),
                        routine.failed(),
                        routine.skipped_cases()
                    );
                }
            }
        }

        let _ = writeln!(out, "------------------------------------------");
        let _ = writeln!(
            out,
            "{:<14} {:>7} {:>7} {:>7}",
            "total",
            self.passed(),
            self.failed(),
            self.skipped()
        );
        let _ = writeln!(
            out,
            "routines: {} run, {} skipped",
            self.routines.len() - self.skipped_routines(),
            self.skipped_routines()
        );
        let _ = writeln!(out, "elapsed: {} ms", self.elapsed_ms());
        if let Some(reason) = &self.cancelled {
            let _ = writeln!(out, "cancelled: {}", reason);
        }

        let failures: Vec<_> = self
            .routines
            .iter()
            .flat_map(|r| r.cases.iter().map(move |c| (r.name.as_str(), c)))
            .filter_map(|(routine, case)| match &case.outcome {
                CaseOutcome::Failed { reason } => Some((routine, case.label.as_str(), reason)),
                _ => None,
            })
            .collect();

        if !failures.is_empty() {
            let _ = writeln!(out, "\nfailures:");
            for (routine, label, reason) in failures {
                let _ = writeln!(out, "  {} / {}: {}", routine, label, reason);
            }
        }
        out
    }
}
