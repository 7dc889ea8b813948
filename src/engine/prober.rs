use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{with_retry, ProbeError, RetryConfig};
use crate::models::{Attempt, Classification, ScanRequest, ScanResult};
use crate::utils::truncation::snippet;
use super::builder::{ProbeRequest, RequestBuilder};
use super::detector::{contains_sql_error, is_time_delay_payload, Detector};
use super::events::ProbeEvent;
use super::progress::ProgressTracker;
use super::queue::PayloadQueue;
use super::scan_log::ScanLog;
use super::throttle::RateGate;
use super::transport::{RawResponse, Transport};

/// Per-scan state shared by all workers.
struct ScanContext {
    builder: RequestBuilder,
    detector: Detector,
    gate: RateGate,
    retry: RetryConfig,
    timeout: Duration,
    baselines: HashMap<String, Option<Duration>>,
}

impl ScanContext {
    fn baseline(&self, extension: &str) -> Option<Duration> {
        self.baselines.get(extension).copied().flatten()
    }
}

#[derive(Debug, Default)]
struct PayloadOutcome {
    index: usize,
    payload: String,
    attempts: usize,
    errors: usize,
    vulnerable: bool,
    cancelled: bool,
}

/// Runs one scan: queue, throttle, dispatch, classify, log, record.
///
/// The log and resume handles are passed in by the caller and serialize
/// their own writes, so any number of workers can share them.
pub struct Prober {
    transport: Arc<dyn Transport>,
    log: Arc<ScanLog>,
    progress: Arc<ProgressTracker>,
    cancel_token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<ProbeEvent>>,
}

impl Prober {
    pub fn new(
        transport: Arc<dyn Transport>,
        log: Arc<ScanLog>,
        progress: Arc<ProgressTracker>,
    ) -> Self {
        Self {
            transport,
            log,
            progress,
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }

    /// Replace the prober's cancel token with an external one, so that
    /// cancelling it stops the scan.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Attach an event channel for streaming progress to a display.
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<ProbeEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: ProbeEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Log and resume writes never abort a scan; a failed write is reported
    /// to the operator and the scan carries on.
    fn note_write(&self, what: &str, result: Result<(), ProbeError>) {
        if let Err(e) = result {
            warn!(error = %e, what, "Scan log write failed");
        }
    }

    pub async fn run(&self, request: &ScanRequest) -> Result<ScanResult, ProbeError> {
        request.validate()?;

        let started_at = Utc::now();
        let scan_id = uuid::Uuid::new_v4().to_string();

        let completed = self.progress.completed().await;
        let queue = PayloadQueue::new(&request.payloads, &completed);
        let skipped = queue.skipped();
        let queued = queue.len();

        info!(
            scan_id = %scan_id,
            target = %request.target_url,
            parameter = %request.parameter,
            method = %request.method,
            queued,
            skipped,
            "Probe started"
        );
        self.note_write("start", self.log.info(&format!(
            "Scan {} started: target {}, parameter '{}', method {}, {} payloads queued, {} already tested",
            scan_id, request.target_url, request.parameter, request.method, queued, skipped,
        )).await);
        self.emit(ProbeEvent::ScanStarted {
            scan_id: scan_id.clone(),
            target: request.target_url.clone(),
            queued,
            skipped,
        });

        let mut result = ScanResult {
            scan_id,
            target_url: request.target_url.clone(),
            parameter: request.parameter.clone(),
            vulnerable_payloads: Vec::new(),
            total_attempts: 0,
            error_count: 0,
            payloads_tested: 0,
            payloads_skipped: skipped,
            stopped: false,
            started_at,
            finished_at: started_at,
        };

        if queue.is_empty() {
            self.note_write("empty", self.log.info("No payloads left to test").await);
            return Ok(self.finish(result, 0).await);
        }

        let mut ctx = ScanContext {
            builder: RequestBuilder::new(request),
            detector: Detector::from_policy(&request.policy),
            gate: RateGate::new(request.policy.dispatch_interval()),
            retry: request.policy.retry_config(),
            timeout: request.policy.timeout_duration(),
            baselines: HashMap::new(),
        };

        if queue.as_slice().iter().any(|p| is_time_delay_payload(p)) {
            match self.measure_baselines(&ctx).await {
                Ok(baselines) => ctx.baselines = baselines,
                Err(_) => {
                    result.stopped = true;
                    return Ok(self.finish(result, queued).await);
                }
            }
        }

        let workers = request.policy.workers.max(1);
        let ctx = &ctx;
        let mut outcomes: Vec<PayloadOutcome> = stream::iter(queue.into_vec().into_iter().enumerate())
            .map(|(index, payload)| self.probe_payload(ctx, index, payload))
            .buffer_unordered(workers)
            .collect()
            .await;
        outcomes.sort_by_key(|o| o.index);

        for outcome in &outcomes {
            result.total_attempts += outcome.attempts;
            result.error_count += outcome.errors;
            if outcome.cancelled {
                result.stopped = true;
                continue;
            }
            result.payloads_tested += 1;
            if outcome.vulnerable {
                result.vulnerable_payloads.push(outcome.payload.clone());
            }
        }

        let remaining = queued - result.payloads_tested;
        Ok(self.finish(result, remaining).await)
    }

    async fn finish(&self, mut result: ScanResult, remaining: usize) -> ScanResult {
        result.finished_at = Utc::now();

        if result.stopped {
            self.note_write("stop", self.log.info(&format!(
                "Scan stopped by request; {} payloads left for resume", remaining
            )).await);
            self.emit(ProbeEvent::ScanStopped {
                payloads_tested: result.payloads_tested,
                remaining,
            });
        }

        self.note_write("summary", self.log.info(&format!(
            "Total payloads tested: {} | Attempts: {} | Vulnerable: {} | Errors: {}",
            result.payloads_tested,
            result.total_attempts,
            result.total_vulnerabilities(),
            result.error_count,
        )).await);

        if !result.stopped {
            self.emit(ProbeEvent::ScanCompleted {
                total_attempts: result.total_attempts,
                vulnerabilities: result.total_vulnerabilities(),
                errors: result.error_count,
                duration_ms: result.duration_ms(),
            });
        }

        info!(
            scan_id = %result.scan_id,
            tested = result.payloads_tested,
            attempts = result.total_attempts,
            vulnerable = result.total_vulnerabilities(),
            errors = result.error_count,
            stopped = result.stopped,
            "Probe finished"
        );
        result
    }

    /// Latency of the unmodified request for each extension. Only
    /// [`ProbeError::Cancelled`] escapes; other failures leave `None`.
    async fn measure_baselines(
        &self,
        ctx: &ScanContext,
    ) -> Result<HashMap<String, Option<Duration>>, ProbeError> {
        let mut baselines = HashMap::new();
        for extension in ctx.builder.extensions() {
            let request = match ctx.builder.baseline(extension) {
                Ok(request) => request,
                Err(e) => {
                    self.note_write("baseline", self.log.failure(&format!(
                        "Baseline request could not be built: {}", e
                    )).await);
                    baselines.insert(extension.clone(), None);
                    continue;
                }
            };

            let outcome = with_retry("baseline", &ctx.retry, &self.cancel_token, |_| {
                self.dispatch_once(ctx, &request)
            }).await;

            let elapsed = match outcome.result {
                Ok((_, elapsed)) => {
                    debug!(url = %request.url, elapsed_ms = elapsed.as_millis() as u64, "Baseline measured");
                    self.note_write("baseline", self.log.info(&format!(
                        "Baseline for {}: {:.2}s", request.url, elapsed.as_secs_f64()
                    )).await);
                    Some(elapsed)
                }
                Err(ProbeError::Cancelled) => return Err(ProbeError::Cancelled),
                Err(e) => {
                    self.note_write("baseline", self.log.failure(&format!(
                        "Baseline request failed for {}: {}", request.url, e
                    )).await);
                    None
                }
            };

            self.emit(ProbeEvent::BaselineMeasured {
                extension: extension.clone(),
                elapsed_ms: elapsed.map(|d| d.as_millis() as u64),
            });
            baselines.insert(extension.clone(), elapsed);
        }
        Ok(baselines)
    }

    /// Every extension variant of one payload, then the resume record.
    async fn probe_payload(&self, ctx: &ScanContext, index: usize, payload: String) -> PayloadOutcome {
        let mut outcome = PayloadOutcome { index, payload, ..Default::default() };

        for extension in ctx.builder.extensions() {
            let attempt = match self.attempt_variant(ctx, &outcome.payload, extension).await {
                Ok(attempt) => attempt,
                Err(_) => {
                    // Interrupted payloads stay out of the resume record.
                    outcome.cancelled = true;
                    return outcome;
                }
            };

            outcome.attempts += 1;
            if attempt.is_error() {
                outcome.errors += 1;
            }
            if attempt.is_vulnerable() {
                outcome.vulnerable = true;
                info!(
                    payload = %attempt.payload,
                    url = %attempt.url,
                    detection = attempt.detection.map(|d| d.as_str()).unwrap_or("unknown"),
                    "SQL injection detected"
                );
            }

            self.note_write("attempt", self.log.record_attempt(&attempt).await);
            self.emit(ProbeEvent::AttemptCompleted {
                payload: attempt.payload.clone(),
                url: attempt.url.clone(),
                classification: attempt.classification,
                detection: attempt.detection,
                status: attempt.status,
            });
        }

        if let Err(e) = self.progress.record(&outcome.payload).await {
            warn!(error = %e, payload = %outcome.payload, "Failed to update resume record");
        }
        self.emit(ProbeEvent::PayloadCompleted {
            payload: outcome.payload.clone(),
            vulnerable: outcome.vulnerable,
        });
        outcome
    }

    /// One evaluated exchange. Only [`ProbeError::Cancelled`] is returned as
    /// an error; every other failure becomes an `Error` attempt.
    async fn attempt_variant(
        &self,
        ctx: &ScanContext,
        payload: &str,
        extension: &str,
    ) -> Result<Attempt, ProbeError> {
        if self.cancel_token.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }

        let request = match ctx.builder.build(payload, extension) {
            Ok(request) => request,
            Err(e) => {
                let url = format!("{}{}", ctx.builder.target_url(), extension);
                return Ok(self.error_attempt(ctx, payload, extension, url, &e, 0));
            }
        };

        let outcome = with_retry("dispatch", &ctx.retry, &self.cancel_token, |_| {
            self.dispatch_once(ctx, &request)
        }).await;

        match outcome.result {
            Ok((response, elapsed)) => {
                let evaluation = ctx.detector.evaluate(
                    payload,
                    response.status,
                    &response.body,
                    elapsed,
                    ctx.baseline(extension),
                );
                Ok(Attempt {
                    payload: payload.to_string(),
                    method: request.method,
                    url: request.url.to_string(),
                    extension: extension.to_string(),
                    elapsed,
                    status: Some(response.status),
                    snippet: snippet(&response.body),
                    classification: evaluation.classification,
                    detection: evaluation.detection,
                    status_of_interest: evaluation.status_of_interest,
                    error: None,
                    tries: outcome.tries,
                })
            }
            Err(ProbeError::Cancelled) => Err(ProbeError::Cancelled),
            Err(e) => Ok(self.error_attempt(ctx, payload, extension, request.url.to_string(), &e, outcome.tries)),
        }
    }

    fn error_attempt(
        &self,
        ctx: &ScanContext,
        payload: &str,
        extension: &str,
        url: String,
        error: &ProbeError,
        tries: u32,
    ) -> Attempt {
        let status = match error {
            ProbeError::ServerError(code) => Some(*code),
            _ => None,
        };
        warn!(payload = %payload, url = %url, tries, error = %error, "Attempt failed");
        Attempt {
            payload: payload.to_string(),
            method: ctx.builder.method(),
            url,
            extension: extension.to_string(),
            elapsed: Duration::ZERO,
            status,
            snippet: String::new(),
            classification: Classification::Error,
            detection: None,
            status_of_interest: false,
            error: Some(error.to_string()),
            tries,
        }
    }

    /// Gate, send, time. A 5xx without SQL error text is reported as a
    /// retryable [`ProbeError::ServerError`]; with error text it is a
    /// finding and goes to the detector.
    async fn dispatch_once(
        &self,
        ctx: &ScanContext,
        request: &ProbeRequest,
    ) -> Result<(RawResponse, Duration), ProbeError> {
        let started = ctx.gate.acquire(&self.cancel_token).await?;

        let response = tokio::time::timeout(ctx.timeout, self.transport.dispatch(request))
            .await
            .map_err(|_| ProbeError::Timeout(format!(
                "no response from {} within {:.1}s", request.url, ctx.timeout.as_secs_f64()
            )))??;
        let elapsed = started.elapsed();

        if response.status >= 500 && !contains_sql_error(&response.body) {
            return Err(ProbeError::ServerError(response.status));
        }
        Ok((response, elapsed))
    }
}
