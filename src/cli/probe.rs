use std::path::Path;
use std::sync::Arc;

use console::style;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::commands::ProbeArgs;
use crate::cli::payloads::collect_payloads;
use crate::cli::progress::ScanProgress;
use crate::config::load_config;
use crate::engine::{HttpTransport, Prober, ProgressTracker, ScanLog};
use crate::errors::ProbeError;
use crate::models::ScanRequest;
use crate::reporting::{write_html_report, write_json_summary, write_vulnerabilities};
use crate::utils::formatting::{format_duration, pluralize};

pub async fn handle_probe(args: ProbeArgs, quiet: bool) -> Result<(), ProbeError> {
    let loaded = load_config(
        args.config.as_deref().map(Path::new),
        args.output.as_deref().map(Path::new),
    ).await?;
    if let Some(source) = &loaded.source {
        info!(config = %source.display(), "Configuration loaded");
    }

    let mut policy = loaded.policy;
    if let Some(workers) = args.workers {
        policy.workers = workers;
    }
    if let Some(rate_limit) = args.rate_limit {
        policy.rate_limit = rate_limit;
    }
    policy.validate()?;

    let payloads = collect_payloads(
        args.payloads.as_deref(),
        args.payloads_file.as_deref().map(Path::new),
    ).await?;

    let request = ScanRequest::new(&args.target, &args.param, payloads, policy, &args.method)?;
    let paths = loaded.paths;

    let transport = Arc::new(HttpTransport::from_policy(&request.policy)?);
    let log = Arc::new(ScanLog::open(&paths.output_log_file).await?);
    let progress = Arc::new(ProgressTracker::open(&paths.resume_file).await?);

    let cancel_token = CancellationToken::new();
    let stop = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop requested, waiting for in-flight requests");
            stop.cancel();
        }
    });

    let mut prober = Prober::new(transport, log, progress).with_cancel_token(cancel_token);

    let renderer = if quiet {
        None
    } else {
        let (tx, mut rx) = mpsc::unbounded_channel();
        prober = prober.with_event_channel(tx);
        Some(tokio::spawn(async move {
            let mut display = ScanProgress::new();
            while let Some(event) = rx.recv().await {
                display.handle_event(&event);
            }
        }))
    };

    let result = prober.run(&request).await;
    // Closes the event channel so the renderer drains and exits.
    drop(prober);
    if let Some(handle) = renderer {
        let _ = handle.await;
    }
    let result = result?;

    write_json_summary(&result, &paths.output_json_file).await?;
    let wrote_vulns = write_vulnerabilities(&result, &paths.vulnerabilities_file).await?;
    write_html_report(&paths.output_log_file, &paths.output_html_file).await?;

    if result.is_vulnerable() {
        println!(
            "{} {} found for parameter '{}'",
            style("[+]").red().bold(),
            pluralize(result.total_vulnerabilities(), "vulnerable payload"),
            result.parameter,
        );
        for payload in &result.vulnerable_payloads {
            println!("    {}", style(payload).yellow());
        }
    } else {
        println!("{} No SQL injection detected", style("[-]").green());
    }
    if wrote_vulns {
        println!("Vulnerable payloads saved to {}", paths.vulnerabilities_file.display());
    }
    println!(
        "{} tested, {} skipped, {} in {}",
        pluralize(result.payloads_tested, "payload"),
        result.payloads_skipped,
        pluralize(result.error_count, "error"),
        format_duration(result.duration_ms()),
    );
    println!("Log: {}", paths.output_log_file.display());
    println!("Report: {}", paths.output_html_file.display());
    if result.stopped {
        println!(
            "{} Stopped early; rerun the same command to resume",
            style("!").yellow().bold(),
        );
    }

    Ok(())
}
