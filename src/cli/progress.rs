use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use console::style;

use crate::engine::ProbeEvent;
use crate::models::Classification;
use crate::utils::formatting::{format_duration, pluralize};

/// Manages indicatif progress bars while a probe runs.
pub struct ScanProgress {
    multi: MultiProgress,
    payload_bar: Option<ProgressBar>,
    status_bar: ProgressBar,
    findings: usize,
    errors: usize,
    inconclusive: usize,
    start_time: std::time::Instant,
}

impl ScanProgress {
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let status_bar = multi.add(ProgressBar::new_spinner());
        status_bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        );
        status_bar.set_message("Preparing probe...");
        status_bar.enable_steady_tick(std::time::Duration::from_millis(120));

        Self {
            multi,
            payload_bar: None,
            status_bar,
            findings: 0,
            errors: 0,
            inconclusive: 0,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn handle_event(&mut self, event: &ProbeEvent) {
        match event {
            ProbeEvent::ScanStarted { target, queued, skipped, .. } => {
                if *skipped > 0 {
                    self.println(&format!(
                        "  {} Resuming: {} already tested",
                        style("↻").cyan(),
                        pluralize(*skipped, "payload"),
                    ));
                }
                let bar = self.multi.insert_before(
                    &self.status_bar,
                    ProgressBar::new(*queued as u64),
                );
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("  {bar:30.cyan/dark_gray} {pos}/{len} payloads | {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓░")
                );
                bar.set_message(format!("Probing {}", target));
                self.payload_bar = Some(bar);
                self.update_status();
            }
            ProbeEvent::BaselineMeasured { extension, elapsed_ms } => {
                let variant = if extension.is_empty() { "(no extension)" } else { extension.as_str() };
                match elapsed_ms {
                    Some(ms) => self.println(&format!(
                        "  {} Baseline {}: {}ms", style("·").dim(), variant, ms
                    )),
                    None => self.println(&format!(
                        "  {} Baseline {} unavailable; slow delay payloads will be inconclusive",
                        style("⚠").yellow(), variant
                    )),
                }
            }
            ProbeEvent::AttemptCompleted { payload, url, classification, detection, .. } => {
                match classification {
                    Classification::Vulnerable => {
                        self.findings += 1;
                        self.println(&format!(
                            "  {} {} {} via {}",
                            style("[+]").red().bold(),
                            style(detection.map(|d| d.as_str()).unwrap_or("unknown")).red(),
                            url,
                            style(payload).yellow(),
                        ));
                    }
                    Classification::Error => self.errors += 1,
                    Classification::Inconclusive => self.inconclusive += 1,
                    Classification::Safe => {}
                }
                self.update_status();
            }
            ProbeEvent::PayloadCompleted { .. } => {
                if let Some(bar) = &self.payload_bar {
                    bar.inc(1);
                }
            }
            ProbeEvent::ScanCompleted { total_attempts, vulnerabilities, errors, duration_ms } => {
                if let Some(bar) = self.payload_bar.take() {
                    bar.finish_with_message("All payloads tested");
                }
                self.status_bar.finish_with_message(format!(
                    "Probe complete: {} | {} | {} | {}",
                    pluralize(*total_attempts, "attempt"),
                    pluralize(*vulnerabilities, "vulnerable payload"),
                    pluralize(*errors, "error"),
                    format_duration(*duration_ms),
                ));
            }
            ProbeEvent::ScanStopped { payloads_tested, remaining } => {
                if let Some(bar) = self.payload_bar.take() {
                    bar.abandon_with_message("Stopped");
                }
                self.status_bar.finish_with_message(format!(
                    "Probe stopped: {} tested, {} left for resume",
                    payloads_tested, remaining,
                ));
            }
        }
    }

    fn update_status(&self) {
        let elapsed = format_duration(self.start_time.elapsed().as_millis() as u64);
        let mut message = format!(
            "{} | {} | {}",
            elapsed,
            pluralize(self.findings, "finding"),
            pluralize(self.errors, "error"),
        );
        if self.inconclusive > 0 {
            message.push_str(&format!(" | {} inconclusive", self.inconclusive));
        }
        self.status_bar.set_message(message);
    }

    /// Print a line through the multi-progress (won't interfere with bars).
    pub fn println(&self, msg: &str) {
        let _ = self.multi.println(msg);
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}
