//! Classifies scan log lines for the HTML report.
//!
//! A line's kind comes from its leading tag only. Payloads and response
//! snippets are echoed later on the line and may contain any tag text.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::engine::scan_log::{ERROR_TAG, FAILURE_TAG, FINDING_MARKER, FINDING_TAG, INFO_TAG};

static FINDING_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"at: (https?://[^\s]+)").expect("finding url pattern is valid")
});

static FINDING_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r".*Detection method: ([^\n]+)$").expect("detection method pattern is valid")
});

/// Marker of the end-of-scan summary line; one per completed run.
pub const RUN_SUMMARY_MARKER: &str = "Total payloads";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedFinding {
    pub url: String,
    pub method: String,
    pub details: String,
}

impl LoggedFinding {
    fn from_line(line: &str) -> Self {
        let url = FINDING_URL.captures(line)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "Unknown URL".to_string());
        let method = FINDING_METHOD.captures(line)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_else(|| "Unknown method".to_string());
        Self { url, method, details: line.to_string() }
    }
}

/// A scan log split into findings, informational lines and errors.
/// Lines matching none of the three are kept only in `lines`.
#[derive(Debug, Default, Clone, Serialize)]
pub struct LogSummary {
    pub findings: Vec<LoggedFinding>,
    pub info: Vec<String>,
    pub errors: Vec<String>,
    pub lines: Vec<String>,
}

impl LogSummary {
    pub fn parse(content: &str) -> Self {
        let mut summary = Self::default();
        for raw in content.lines() {
            let line = raw.trim();
            summary.lines.push(raw.trim_end().to_string());
            if line.is_empty() {
                continue;
            }
            if is_finding(line) {
                summary.findings.push(LoggedFinding::from_line(line));
            } else if line.starts_with(INFO_TAG) {
                summary.info.push(line.to_string());
            } else if line.starts_with(ERROR_TAG) || line.starts_with(FAILURE_TAG) {
                summary.errors.push(line.to_string());
            }
        }
        summary
    }

    /// Completed runs recorded in the log.
    pub fn tests_run(&self) -> usize {
        self.info.iter()
            .filter_map(|line| line.strip_prefix(INFO_TAG))
            .filter(|rest| rest.trim_start().starts_with(RUN_SUMMARY_MARKER))
            .count()
    }
}

fn is_finding(line: &str) -> bool {
    line.strip_prefix(FINDING_TAG)
        .is_some_and(|rest| rest.trim_start().starts_with(FINDING_MARKER))
}
