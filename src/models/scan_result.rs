use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate outcome of one engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: String,
    pub target_url: String,
    pub parameter: String,
    /// Payloads classified vulnerable on at least one variant, first-seen order.
    pub vulnerable_payloads: Vec<String>,
    /// Exchanges evaluated (one per payload per extension variant).
    pub total_attempts: usize,
    pub error_count: usize,
    /// Payloads fully attempted during this run.
    pub payloads_tested: usize,
    /// Payloads skipped because a previous run already attempted them.
    pub payloads_skipped: usize,
    /// A stop request ended the scan before the queue drained.
    pub stopped: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScanResult {
    pub fn total_vulnerabilities(&self) -> usize {
        self.vulnerable_payloads.len()
    }

    pub fn is_vulnerable(&self) -> bool {
        !self.vulnerable_payloads.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_at
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .unsigned_abs()
    }
}
