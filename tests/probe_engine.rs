use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use async_trait::async_trait;
use sqlcannon::config::RuntimePolicy;
use sqlcannon::engine::builder::ProbeRequest;
use sqlcannon::engine::{Prober, ProbeEvent, ProgressTracker, RawResponse, ScanLog, Transport};
use sqlcannon::errors::ProbeError;
use sqlcannon::models::{HttpMethod, ScanRequest};

const TARGET: &str = "http://shop.test/item";
const SLEEP: &str = "' OR SLEEP(5)--";
const UNION: &str = "' UNION SELECT NULL--";
const FALSE_AND: &str = "' AND '1'='2";

enum Reply {
    Ok { status: u16, body: &'static str, delay: Duration },
    Fail(ProbeError),
}

fn ok(body: &'static str, delay_ms: u64) -> Reply {
    Reply::Ok { status: 200, body, delay: Duration::from_millis(delay_ms) }
}

#[derive(Debug, Clone)]
struct Call {
    payload: Option<String>,
    url: String,
    at: Instant,
}

type Responder = Box<dyn Fn(Option<&str>, usize) -> Reply + Send + Sync>;

/// Transport that answers from a script instead of the network. The
/// responder sees the injected payload (`None` for baseline requests) and
/// how many times that payload was dispatched before.
struct ScriptedTransport {
    responder: Responder,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    fn new(responder: impl Fn(Option<&str>, usize) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self { responder: Box::new(responder), calls: Mutex::new(Vec::new()) })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_for(&self, payload: &str) -> usize {
        self.calls().iter().filter(|c| c.payload.as_deref() == Some(payload)).count()
    }
}

fn injected(request: &ProbeRequest) -> Option<String> {
    match request.method {
        HttpMethod::Get => request.url.query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned()),
        HttpMethod::Post => request.form.as_ref()
            .and_then(|form| form.iter().find(|(k, _)| k == "id"))
            .map(|(_, v)| v.clone()),
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn dispatch(&self, request: &ProbeRequest) -> Result<RawResponse, ProbeError> {
        let payload = injected(request);
        let previous = {
            let mut calls = self.calls.lock().unwrap();
            let previous = calls.iter().filter(|c| c.payload == payload).count();
            calls.push(Call { payload: payload.clone(), url: request.url.to_string(), at: Instant::now() });
            previous
        };
        match (self.responder)(payload.as_deref(), previous) {
            Reply::Ok { status, body, delay } => {
                tokio::time::sleep(delay).await;
                Ok(RawResponse { status, body: body.to_string() })
            }
            Reply::Fail(e) => Err(e),
        }
    }
}

fn fast_policy() -> RuntimePolicy {
    RuntimePolicy {
        rate_limit: 100.0,
        retries: 3,
        backoff_base: 0.01,
        backoff_max: 0.1,
        workers: 2,
        ..Default::default()
    }
}

fn request(payloads: &[&str], policy: RuntimePolicy) -> ScanRequest {
    ScanRequest::new(TARGET, "id", payloads.iter().map(|p| p.to_string()).collect(), policy, "GET").unwrap()
}

async fn prober(dir: &TempDir, transport: Arc<ScriptedTransport>) -> Prober {
    let log = Arc::new(ScanLog::open(&dir.path().join("output.log")).await.unwrap());
    let progress = Arc::new(ProgressTracker::open(&dir.path().join("resume.txt")).await.unwrap());
    Prober::new(transport, log, progress)
}

fn read_log(dir: &TempDir) -> String {
    std::fs::read_to_string(dir.path().join("output.log")).unwrap()
}

fn read_resume(dir: &TempDir) -> Vec<String> {
    std::fs::read_to_string(dir.path().join("resume.txt")).unwrap()
        .lines().map(String::from).collect()
}

#[tokio::test(start_paused = true)]
async fn test_time_error_and_safe_classification() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|payload, _| match payload {
        None => ok("<html>ok</html>", 200),
        Some(SLEEP) => ok("<html>ok</html>", 6000),
        Some(UNION) => ok("You have an error in your SQL syntax near 'NULL'", 150),
        Some(_) => ok("<html>ok</html>", 50),
    });

    let result = prober(&dir, transport.clone()).await
        .run(&request(&[SLEEP, UNION, FALSE_AND], fast_policy()))
        .await
        .unwrap();

    assert_eq!(result.vulnerable_payloads, vec![SLEEP.to_string(), UNION.to_string()]);
    assert_eq!(result.total_attempts, 3);
    assert_eq!(result.error_count, 0);
    assert_eq!(result.payloads_tested, 3);
    assert!(!result.stopped);

    let log = read_log(&dir);
    assert!(log.contains(&format!("Payload: {} | Status: 200", SLEEP)));
    assert!(log.contains("Detection method: time-based"));
    assert!(log.contains("Detection method: error-based"));
    assert!(log.contains(&format!("Tested payload '{}' (GET)", FALSE_AND)));
    assert!(log.contains("[INFO] Total payloads tested: 3 | Attempts: 3 | Vulnerable: 2 | Errors: 0"));

    assert_eq!(read_resume(&dir).len(), 3);
    // One baseline plus one exchange per payload
    assert_eq!(transport.calls().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_payload_is_logged_once_and_scan_continues() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|payload, _| match payload {
        Some("dead") => Reply::Fail(ProbeError::Network("connection refused".into())),
        _ => ok("fine", 10),
    });

    let result = prober(&dir, transport.clone()).await
        .run(&request(&["first", "dead", "last"], fast_policy()))
        .await
        .unwrap();

    assert_eq!(result.error_count, 1);
    assert_eq!(result.payloads_tested, 3);
    assert!(result.vulnerable_payloads.is_empty());
    // First try plus three retries
    assert_eq!(transport.calls_for("dead"), 4);
    assert_eq!(transport.calls_for("last"), 1);

    let log = read_log(&dir);
    let errors: Vec<&str> = log.lines().filter(|l| l.starts_with("[ERROR]")).collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'dead'"));
    assert!(errors[0].contains("after 4 tries"));
    assert!(errors[0].contains("connection refused"));

    // Error attempts still count as attempted
    assert!(read_resume(&dir).contains(&"dead".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_non_transient_failure_is_not_retried() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| {
        Reply::Fail(ProbeError::Tls("invalid peer certificate".into()))
    });

    let result = prober(&dir, transport.clone()).await
        .run(&request(&["x"], fast_policy()))
        .await
        .unwrap();

    assert_eq!(result.error_count, 1);
    assert_eq!(transport.calls_for("x"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_response_times_out_and_is_retried() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| ok("too late", 60_000));
    let policy = RuntimePolicy { timeout: 1.0, retries: 2, ..fast_policy() };

    let started = Instant::now();
    let result = prober(&dir, transport.clone()).await
        .run(&request(&["x"], policy))
        .await
        .unwrap();

    assert_eq!(result.error_count, 1);
    assert_eq!(result.total_attempts, 1);
    assert!(result.vulnerable_payloads.is_empty());
    assert_eq!(transport.calls_for("x"), 3);
    // Three cut-off exchanges, not three full minutes
    assert!(started.elapsed() < Duration::from_secs(10));

    let log = read_log(&dir);
    let errors: Vec<&str> = log.lines().filter(|l| l.starts_with("[ERROR]")).collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Timeout: no response from"));
    assert!(errors[0].contains("within 1.0s"));
    assert!(errors[0].contains("after 3 tries"));
}

#[tokio::test(start_paused = true)]
async fn test_server_error_is_retried_until_success() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, previous| {
        if previous < 2 {
            Reply::Ok { status: 503, body: "busy", delay: Duration::ZERO }
        } else {
            ok("fine", 0)
        }
    });

    let result = prober(&dir, transport.clone()).await
        .run(&request(&["x"], fast_policy()))
        .await
        .unwrap();

    assert_eq!(result.error_count, 0);
    assert_eq!(transport.calls_for("x"), 3);
    assert!(read_log(&dir).contains("Tested payload 'x' (GET)"));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_server_errors_keep_status() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| {
        Reply::Ok { status: 502, body: "bad gateway", delay: Duration::ZERO }
    });
    let policy = RuntimePolicy { retries: 1, ..fast_policy() };

    let result = prober(&dir, transport.clone()).await
        .run(&request(&["x"], policy))
        .await
        .unwrap();

    assert_eq!(result.error_count, 1);
    assert_eq!(transport.calls_for("x"), 2);
    assert!(read_log(&dir).contains("Server error: HTTP 502"));
}

#[tokio::test(start_paused = true)]
async fn test_server_error_with_sql_error_is_a_finding() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| Reply::Ok {
        status: 500,
        body: "PDOException: SQLSTATE[42000]: Syntax error or access violation",
        delay: Duration::ZERO,
    });

    let result = prober(&dir, transport.clone()).await
        .run(&request(&["'"], fast_policy()))
        .await
        .unwrap();

    assert_eq!(result.vulnerable_payloads, vec!["'".to_string()]);
    assert_eq!(transport.calls_for("'"), 1);
    assert!(read_log(&dir).contains("Status: 500"));
}

#[tokio::test(start_paused = true)]
async fn test_resume_skips_recorded_payloads() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("resume.txt"), "already\n").unwrap();
    let transport = ScriptedTransport::new(|_, _| ok("fine", 0));

    let result = prober(&dir, transport.clone()).await
        .run(&request(&["already", "fresh", "fresh"], fast_policy()))
        .await
        .unwrap();

    assert_eq!(result.payloads_skipped, 1);
    assert_eq!(result.payloads_tested, 1);
    assert_eq!(transport.calls_for("already"), 0);
    assert_eq!(transport.calls_for("fresh"), 1);
    assert_eq!(read_resume(&dir), vec!["already".to_string(), "fresh".to_string()]);

    // Second run finds nothing left to do
    let again = ScriptedTransport::new(|_, _| ok("fine", 0));
    let result = prober(&dir, again.clone()).await
        .run(&request(&["already", "fresh"], fast_policy()))
        .await
        .unwrap();
    assert_eq!(result.payloads_tested, 0);
    assert_eq!(result.payloads_skipped, 2);
    assert!(again.calls().is_empty());
    assert!(read_log(&dir).contains("No payloads left to test"));
}

#[tokio::test(start_paused = true)]
async fn test_dispatches_respect_rate_limit_across_workers() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| ok("fine", 0));
    let policy = RuntimePolicy { rate_limit: 2.0, workers: 4, ..fast_policy() };
    let payloads = ["a", "b", "c", "d", "e", "f"];

    let result = prober(&dir, transport.clone()).await
        .run(&request(&payloads, policy))
        .await
        .unwrap();
    assert_eq!(result.total_attempts, 6);

    let mut instants: Vec<Instant> = transport.calls().iter().map(|c| c.at).collect();
    instants.sort();
    for pair in instants.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(500), "dispatches {:?} apart", pair[1] - pair[0]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_retries_pass_through_the_rate_gate() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| {
        Reply::Fail(ProbeError::Timeout("slow".into()))
    });
    let policy = RuntimePolicy { rate_limit: 1.0, retries: 2, backoff_base: 0.0, workers: 1, ..fast_policy() };

    prober(&dir, transport.clone()).await
        .run(&request(&["x"], policy))
        .await
        .unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_secs(1));
    }
}

#[tokio::test(start_paused = true)]
async fn test_stop_request_ends_scan_and_keeps_resume_consistent() {
    let dir = TempDir::new().unwrap();
    let token = CancellationToken::new();
    let trigger = token.clone();
    let transport = ScriptedTransport::new(move |payload, _| {
        if payload == Some("p2") {
            trigger.cancel();
        }
        ok("fine", 10)
    });
    let policy = RuntimePolicy { workers: 1, ..fast_policy() };

    let result = prober(&dir, transport.clone()).await
        .with_cancel_token(token)
        .run(&request(&["p1", "p2", "p3", "p4"], policy))
        .await
        .unwrap();

    assert!(result.stopped);
    assert_eq!(result.payloads_tested, 2);
    assert_eq!(transport.calls_for("p3"), 0);
    assert_eq!(read_resume(&dir), vec!["p1".to_string(), "p2".to_string()]);

    let log = read_log(&dir);
    assert!(log.contains("Scan stopped by request; 2 payloads left for resume"));
    assert!(!log.contains("[ERROR]"));
}

#[tokio::test(start_paused = true)]
async fn test_extensions_produce_one_attempt_per_variant() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| ok("fine", 0));
    let policy = RuntimePolicy { extensions: vec!["".into(), ".php".into()], ..fast_policy() };

    let result = prober(&dir, transport.clone()).await
        .run(&request(&["x"], policy))
        .await
        .unwrap();

    assert_eq!(result.total_attempts, 2);
    let mut urls: Vec<String> = transport.calls().into_iter().map(|c| c.url).collect();
    urls.sort();
    assert_eq!(urls, vec![
        "http://shop.test/item.php?id=x".to_string(),
        "http://shop.test/item?id=x".to_string(),
    ]);
    assert_eq!(read_resume(&dir), vec!["x".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_status_of_interest_is_logged_not_flagged() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| Reply::Ok {
        status: 403, body: "forbidden", delay: Duration::ZERO,
    });
    let policy = RuntimePolicy { status_codes_to_log: [403].into_iter().collect(), ..fast_policy() };

    let result = prober(&dir, transport).await
        .run(&request(&["x"], policy))
        .await
        .unwrap();

    assert!(result.vulnerable_payloads.is_empty());
    assert!(read_log(&dir).contains("[INFO] Status 403 logged for payload 'x'"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_delay_payload_without_baseline_is_inconclusive() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|payload, _| match payload {
        None => Reply::Fail(ProbeError::Network("reset".into())),
        Some(_) => ok("fine", 6000),
    });
    let policy = RuntimePolicy { retries: 0, ..fast_policy() };

    let result = prober(&dir, transport).await
        .run(&request(&[SLEEP], policy))
        .await
        .unwrap();

    assert!(result.vulnerable_payloads.is_empty());
    let log = read_log(&dir);
    assert!(log.contains("[-] Baseline request failed"));
    assert!(log.contains("-> inconclusive"));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_target_yields_error_attempts() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| ok("fine", 0));
    let request = ScanRequest::new("not a url", "id", vec!["x".into()], fast_policy(), "GET").unwrap();

    let result = prober(&dir, transport.clone()).await.run(&request).await.unwrap();

    assert_eq!(result.error_count, 1);
    assert!(transport.calls().is_empty());
    assert!(read_log(&dir).contains("[ERROR] Request not sent for payload 'x'"));
}

#[tokio::test(start_paused = true)]
async fn test_events_stream_to_display() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| ok("SQLSTATE[HY000]", 0));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    prober(&dir, transport).await
        .with_event_channel(tx)
        .run(&request(&["a", "b"], fast_policy()))
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(ProbeEvent::ScanStarted { queued: 2, .. })));
    assert_eq!(events.iter().filter(|e| matches!(e, ProbeEvent::PayloadCompleted { vulnerable: true, .. })).count(), 2);
    assert!(matches!(events.last(), Some(ProbeEvent::ScanCompleted { vulnerabilities: 2, .. })));
}

#[tokio::test]
async fn test_invalid_invocation_sends_nothing() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| ok("fine", 0));
    let mut request = request(&["x"], fast_policy());
    request.parameter.clear();

    let err = prober(&dir, transport.clone()).await.run(&request).await.unwrap_err();
    assert!(matches!(err, ProbeError::InvalidInvocation(_)));
    assert!(transport.calls().is_empty());
    assert_eq!(read_log(&dir), "");
}
