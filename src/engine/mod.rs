pub mod builder;
pub mod detector;
pub mod events;
pub mod progress;
pub mod prober;
pub mod queue;
pub mod scan_log;
pub mod throttle;
pub mod transport;

use std::sync::Arc;

pub use events::ProbeEvent;
pub use prober::Prober;
pub use progress::ProgressTracker;
pub use scan_log::ScanLog;
pub use transport::{HttpTransport, RawResponse, Transport};

use crate::config::{OutputPaths, RuntimePolicy};
use crate::errors::ProbeError;
use crate::models::{ScanRequest, ScanResult};

/// Probe one parameter of one target with every payload not yet recorded
/// in the resume file, appending to the scan log as it goes.
///
/// Invalid invocations fail before any request is sent. Failures of
/// individual attempts are logged and counted, never returned.
pub async fn run_probe(
    target_url: &str,
    parameter: &str,
    payloads: Vec<String>,
    policy: &RuntimePolicy,
    method: &str,
    outputs: &OutputPaths,
) -> Result<ScanResult, ProbeError> {
    let request = ScanRequest::new(target_url, parameter, payloads, policy.clone(), method)?;

    let transport = Arc::new(HttpTransport::from_policy(&request.policy)?);
    let log = Arc::new(ScanLog::open(&outputs.output_log_file).await?);
    let progress = Arc::new(ProgressTracker::open(&outputs.resume_file).await?);

    Prober::new(transport, log, progress).run(&request).await
}
