use std::path::Path;

use tracing::info;

use crate::errors::ProbeError;
use crate::models::ScanResult;

/// Overwrite the JSON results file with this run's result.
pub async fn write_json_summary(result: &ScanResult, path: &Path) -> Result<(), ProbeError> {
    let json = serde_json::to_string_pretty(result)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), "Scan results written");
    Ok(())
}

/// Write vulnerable payloads one per line. Nothing is written when the
/// run found none; returns whether the file was written.
pub async fn write_vulnerabilities(result: &ScanResult, path: &Path) -> Result<bool, ProbeError> {
    if !result.is_vulnerable() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, result.vulnerable_payloads.join("\n")).await?;
    info!(
        path = %path.display(),
        count = result.total_vulnerabilities(),
        "Vulnerable payloads saved"
    );
    Ok(true)
}
