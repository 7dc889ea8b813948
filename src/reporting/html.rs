//! Standalone HTML report rendered from a scan log.

use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use tracing::info;

use crate::errors::ProbeError;
use super::log_parser::LogSummary;

const STYLE: &str = r#"
        body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6; color: #333; max-width: 1200px; margin: 0 auto; padding: 20px; background-color: #f5f5f5; }
        .container { background-color: white; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); padding: 20px; margin-bottom: 20px; }
        h1, h2, h3 { color: #2c3e50; }
        h1 { border-bottom: 2px solid #3498db; padding-bottom: 10px; margin-top: 0; }
        .summary { display: flex; justify-content: space-between; flex-wrap: wrap; margin-bottom: 20px; }
        .summary-item { background: #fff; border-radius: 8px; padding: 15px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); width: 30%; min-width: 250px; margin-bottom: 15px; }
        .vulnerabilities { background-color: #fadbd8; border-left: 4px solid #e74c3c; }
        .safe { background-color: #d5f5e3; border-left: 4px solid #2ecc71; }
        .warnings { background-color: #fcf3cf; border-left: 4px solid #f1c40f; }
        .vulnerability-item { background-color: #fdedec; border-left: 4px solid #e74c3c; padding: 15px; margin-bottom: 10px; border-radius: 4px; }
        .error-item { background-color: #fcf3cf; border-left: 4px solid #f39c12; padding: 15px; margin-bottom: 10px; border-radius: 4px; }
        .timestamp { color: #7f8c8d; font-size: 0.9em; text-align: right; }
        .footer { color: #95a5a6; font-size: 0.8em; text-align: center; margin-top: 20px; }
        pre { background-color: #2c3e50; color: #ecf0f1; padding: 15px; border-radius: 4px; overflow-x: auto; font-family: 'Courier New', monospace; }
"#;

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn build_label() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match (option_env!("GIT_HASH"), option_env!("BUILD_TIMESTAMP")) {
        (Some(hash), Some(built)) => format!("sqlcannon {} ({}, built {})", version, hash, built),
        (None, Some(built)) => format!("sqlcannon {} (built {})", version, built),
        _ => format!("sqlcannon {}", version),
    }
}

pub fn render_html(summary: &LogSummary, generated_at: DateTime<Local>) -> String {
    let mut html = String::new();
    let vuln_class = if summary.findings.is_empty() { "safe" } else { "vulnerabilities" };
    let error_class = if summary.errors.is_empty() { "safe" } else { "warnings" };

    let _ = write!(html, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>SQL Injection Scan Report</title>
    <style>{style}    </style>
</head>
<body>
    <div class="container">
        <h1>SQL Injection Scan Report</h1>
        <div class="timestamp">Generated on: {generated}</div>

        <div class="summary">
            <div class="summary-item {vuln_class}">
                <h3>Vulnerabilities</h3>
                <p>{vulns} found</p>
            </div>
            <div class="summary-item">
                <h3>Tests Run</h3>
                <p>{tests}</p>
            </div>
            <div class="summary-item {error_class}">
                <h3>Errors</h3>
                <p>{errors}</p>
            </div>
        </div>
"#,
        style = STYLE,
        generated = generated_at.format("%Y-%m-%d %H:%M:%S"),
        vulns = summary.findings.len(),
        tests = summary.tests_run(),
        errors = summary.errors.len(),
    );

    if summary.findings.is_empty() {
        html.push_str("        <h2>No Vulnerabilities Detected</h2>\n");
        html.push_str("        <p>The scan did not detect any SQL injection vulnerabilities on the target.</p>\n");
    } else {
        html.push_str("        <h2>Vulnerabilities Detected</h2>\n        <div class=\"vulnerabilities-list\">\n");
        for finding in &summary.findings {
            let _ = write!(html, r#"            <div class="vulnerability-item">
                <h3>SQL Injection Vulnerability</h3>
                <p><strong>URL:</strong> {}</p>
                <p><strong>Method:</strong> {}</p>
                <p><strong>Details:</strong> {}</p>
            </div>
"#,
                escape_html(&finding.url),
                escape_html(&finding.method),
                escape_html(&finding.details),
            );
        }
        html.push_str("        </div>\n");
    }

    if !summary.errors.is_empty() {
        html.push_str("        <h2>Errors</h2>\n        <div class=\"errors-list\">\n");
        for error in &summary.errors {
            let _ = writeln!(html, "            <div class=\"error-item\"><p>{}</p></div>", escape_html(error));
        }
        html.push_str("        </div>\n");
    }

    html.push_str("        <h2>Complete Scan Log</h2>\n        <div class=\"logs\">\n            <pre>");
    for line in &summary.lines {
        html.push_str(&escape_html(line));
        html.push('\n');
    }
    html.push_str("</pre>\n        </div>\n");

    let _ = write!(html, r#"        <div class="footer">{}</div>
    </div>
</body>
</html>
"#, escape_html(&build_label()));

    html
}

/// Read a scan log and write its HTML report. The log must exist.
pub async fn write_html_report(log_path: &Path, html_path: &Path) -> Result<LogSummary, ProbeError> {
    let content = match tokio::fs::read_to_string(log_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProbeError::InvalidInvocation(format!(
                "Scan log not found: {}", log_path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let summary = LogSummary::parse(&content);
    let html = render_html(&summary, Local::now());

    if let Some(parent) = html_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(html_path, html).await?;

    info!(
        path = %html_path.display(),
        findings = summary.findings.len(),
        errors = summary.errors.len(),
        "HTML report generated"
    );
    Ok(summary)
}
