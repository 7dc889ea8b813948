//! Append-only, line-tagged scan log.
//!
//! The report renderer classifies lines by substring: `[INFO]` for
//! informational lines, `[ERROR]` or `[-]` for errors, and the phrase
//! `SQL Injection detected` for findings. Finding lines carry `at: <url>`
//! and end with `Detection method: <name>`.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::errors::ProbeError;
use crate::models::{Attempt, Classification};
use crate::utils::truncation::{one_line, truncate_error};

pub const INFO_TAG: &str = "[INFO]";
pub const ERROR_TAG: &str = "[ERROR]";
pub const FAILURE_TAG: &str = "[-]";
pub const FINDING_TAG: &str = "[+]";
pub const FINDING_MARKER: &str = "SQL Injection detected";

pub struct ScanLog {
    file: Mutex<tokio::fs::File>,
}

impl ScanLog {
    pub async fn open(path: &Path) -> Result<Self, ProbeError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    pub async fn info(&self, message: &str) -> Result<(), ProbeError> {
        self.write_lines(&[format!("{} {}", INFO_TAG, one_line(message))]).await
    }

    pub async fn error(&self, message: &str) -> Result<(), ProbeError> {
        self.write_lines(&[format!("{} {}", ERROR_TAG, one_line(message))]).await
    }

    /// Non-attempt failures (baseline measurement and the like).
    pub async fn failure(&self, message: &str) -> Result<(), ProbeError> {
        self.write_lines(&[format!("{} {}", FAILURE_TAG, one_line(message))]).await
    }

    /// Every line for one attempt, written contiguously.
    pub async fn record_attempt(&self, attempt: &Attempt) -> Result<(), ProbeError> {
        self.write_lines(&attempt_lines(attempt)).await
    }

    async fn write_lines(&self, lines: &[String]) -> Result<(), ProbeError> {
        let mut buf = String::new();
        for line in lines {
            buf.push_str(line);
            buf.push('\n');
        }
        let mut file = self.file.lock().await;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

pub fn finding_line(url: &str, payload: &str, status: Option<u16>, snippet: &str, method: &str) -> String {
    format!(
        "{} {} at: {} | Payload: {} | Status: {} | Response: {} | Detection method: {}",
        FINDING_TAG,
        FINDING_MARKER,
        url,
        payload,
        status.map(|s| s.to_string()).unwrap_or_else(|| "none".into()),
        one_line(snippet),
        method,
    )
}

pub fn attempt_lines(attempt: &Attempt) -> Vec<String> {
    let mut lines = Vec::new();
    let elapsed = attempt.elapsed.as_secs_f64();

    match attempt.classification {
        Classification::Vulnerable => {
            let method = attempt.detection.map(|d| d.as_str()).unwrap_or("unknown");
            lines.push(finding_line(&attempt.url, &attempt.payload, attempt.status, &attempt.snippet, method));
        }
        Classification::Error => {
            let cause = attempt.error.as_deref().unwrap_or("unknown error");
            if attempt.tries == 0 {
                lines.push(format!(
                    "{} Request not sent for payload '{}' at {}: {}",
                    ERROR_TAG,
                    attempt.payload,
                    attempt.url,
                    one_line(&truncate_error(cause)),
                ));
                return lines;
            }
            lines.push(format!(
                "{} Request failed for payload '{}' at {} after {} {}: {}",
                ERROR_TAG,
                attempt.payload,
                attempt.url,
                attempt.tries,
                if attempt.tries == 1 { "try" } else { "tries" },
                one_line(&truncate_error(cause)),
            ));
            return lines;
        }
        Classification::Safe | Classification::Inconclusive => {
            lines.push(format!(
                "{} Tested payload '{}' ({}) at {} -> {} (status {}, {:.2}s)",
                INFO_TAG,
                attempt.payload,
                attempt.method,
                attempt.url,
                attempt.classification,
                attempt.status.map(|s| s.to_string()).unwrap_or_else(|| "none".into()),
                elapsed,
            ));
        }
    }

    if attempt.status_of_interest {
        if let Some(status) = attempt.status {
            lines.push(format!(
                "{} Status {} logged for payload '{}' at {}",
                INFO_TAG, status, attempt.payload, attempt.url,
            ));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectionMethod, HttpMethod};
    use std::time::Duration;
    use tempfile::TempDir;

    fn attempt(classification: Classification) -> Attempt {
        Attempt {
            payload: "' UNION SELECT NULL--".into(),
            method: HttpMethod::Get,
            url: "http://target.test/item?id=%27+UNION+SELECT+NULL--".into(),
            extension: String::new(),
            elapsed: Duration::from_millis(120),
            status: Some(200),
            snippet: "You have an error\nin your SQL syntax".into(),
            classification,
            detection: None,
            status_of_interest: false,
            error: None,
            tries: 1,
        }
    }

    #[test]
    fn test_finding_line_contract() {
        let mut a = attempt(Classification::Vulnerable);
        a.detection = Some(DetectionMethod::ErrorBased);
        let lines = attempt_lines(&a);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.contains("SQL Injection detected"));
        assert!(line.contains("at: http://target.test/item?id=%27+UNION+SELECT+NULL-- "));
        assert!(line.ends_with("Detection method: error-based"));
        assert!(line.contains("Payload: ' UNION SELECT NULL--"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_safe_attempt_is_info() {
        let lines = attempt_lines(&attempt(Classification::Safe));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[INFO]"));
        assert!(lines[0].contains("-> safe"));
    }

    #[test]
    fn test_status_of_interest_adds_info_line() {
        let mut a = attempt(Classification::Safe);
        a.status_of_interest = true;
        let lines = attempt_lines(&a);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("[INFO] Status 200 logged"));
    }

    #[test]
    fn test_error_attempt_single_error_line() {
        let mut a = attempt(Classification::Error);
        a.status = None;
        a.status_of_interest = true;
        a.tries = 4;
        a.error = Some("Network error: connection refused".into());
        let lines = attempt_lines(&a);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[ERROR]"));
        assert!(lines[0].contains("after 4 tries"));
        assert!(lines[0].contains("connection refused"));
    }

    #[tokio::test]
    async fn test_log_appends_across_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.log");
        {
            let log = ScanLog::open(&path).await.unwrap();
            log.info("Total payloads tested: 3").await.unwrap();
        }
        let log = ScanLog::open(&path).await.unwrap();
        log.failure("Baseline request failed").await.unwrap();
        log.error("boom").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec![
            "[INFO] Total payloads tested: 3",
            "[-] Baseline request failed",
            "[ERROR] boom",
        ]);
    }

    #[tokio::test]
    async fn test_multiline_message_is_flattened() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.log");
        let log = ScanLog::open(&path).await.unwrap();
        log.info("line one\nline two").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[INFO] line one line two\n");
    }
}
