use crate::models::{Classification, DetectionMethod};

/// Messages sent from the engine to a live display.
#[derive(Debug, Clone)]
pub enum ProbeEvent {
    /// Queue built, nothing dispatched yet
    ScanStarted {
        scan_id: String,
        target: String,
        queued: usize,
        skipped: usize,
    },
    /// Baseline latency for one extension variant (`None` if it failed)
    BaselineMeasured {
        extension: String,
        elapsed_ms: Option<u64>,
    },
    /// One variant of one payload was evaluated
    AttemptCompleted {
        payload: String,
        url: String,
        classification: Classification,
        detection: Option<DetectionMethod>,
        status: Option<u16>,
    },
    /// Every variant of a payload is done and the payload is recorded
    PayloadCompleted {
        payload: String,
        vulnerable: bool,
    },
    /// Queue drained
    ScanCompleted {
        total_attempts: usize,
        vulnerabilities: usize,
        errors: usize,
        duration_ms: u64,
    },
    /// A stop request ended the scan early
    ScanStopped {
        payloads_tested: usize,
        remaining: usize,
    },
}
