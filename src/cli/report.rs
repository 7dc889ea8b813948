use std::path::PathBuf;

use crate::cli::commands::ReportArgs;
use crate::errors::ProbeError;
use crate::reporting::write_html_report;
use crate::utils::formatting::pluralize;

pub async fn handle_report(args: ReportArgs) -> Result<(), ProbeError> {
    let log_path = PathBuf::from(&args.log);
    let html_path = PathBuf::from(&args.html);

    let summary = write_html_report(&log_path, &html_path).await?;
    println!(
        "Report written to {} ({}, {})",
        html_path.display(),
        pluralize(summary.findings.len(), "finding"),
        pluralize(summary.errors.len(), "error"),
    );
    Ok(())
}
