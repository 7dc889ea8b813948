//! Response classification.
//!
//! Heuristics run in a fixed priority order and the first match wins:
//! SQL error signatures in the body, then time-delay payloads that
//! outlasted the baseline. Status codes in the audit set are flagged for
//! the log but never make an exchange vulnerable.

use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::RegexSet;

use crate::config::RuntimePolicy;
use crate::models::{Classification, DetectionMethod};

static SQL_ERROR_SIGNATURES: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        // MySQL
        r"(?i)you have an error in your sql syntax",
        r"(?i)warning:\s*mysql_",
        r"(?i)mysql_fetch_|mysql_num_rows|mysqli_",
        r"(?i)mysql server version for the right syntax",
        // PostgreSQL
        r"(?i)pg_query\(\)|pg_exec\(\)",
        r"(?i)postgresql query failed",
        r"(?i)psqlexception",
        r"(?i)error:\s+syntax error at or near",
        r"(?i)unterminated quoted string at or near",
        // MSSQL
        r"(?i)unclosed quotation mark",
        r"(?i)odbc sql server driver|sqlserver jdbc driver",
        r"(?i)microsoft ole db provider for",
        r"(?i)\[sql server\]",
        // Oracle
        r"\bORA-\d{5}\b",
        r"(?i)quoted string not properly terminated",
        // SQLite
        r"(?i)sqlite3?\.operationalerror",
        r"(?i)sqlite_error|sqlite\.exception|sqlite/jdbcdriver",
        // Generic driver output
        r"(?i)\bsql syntax\b",
        r"(?i)syntax error.{0,40}\b(sql|query|near)\b",
        r"(?i)sqlstate\[",
        r"(?i)\binvalid query\b",
    ])
    .expect("SQL error signature patterns are valid")
});

static TIME_DELAY_CONSTRUCTS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bsleep\s*\(",
        r"(?i)\bbenchmark\s*\(",
        r"(?i)\bpg_sleep\s*\(",
        r"(?i)\bwaitfor\s+delay\b",
        r"(?i)\bdbms_lock\.sleep\s*\(",
        r"(?i)\bdbms_pipe\.receive_message\s*\(",
    ])
    .expect("time delay patterns are valid")
});

/// Body carries a known SQL error fragment.
pub fn contains_sql_error(body: &str) -> bool {
    SQL_ERROR_SIGNATURES.is_match(body)
}

/// Payload text asks the database to stall.
pub fn is_time_delay_payload(payload: &str) -> bool {
    TIME_DELAY_CONSTRUCTS.is_match(payload)
}

#[derive(Debug, Clone)]
pub struct TimingPolicy {
    pub delay_threshold: Duration,
    pub baseline_multiplier: f64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            delay_threshold: Duration::from_secs(4),
            baseline_multiplier: 1.0,
        }
    }
}

impl TimingPolicy {
    pub fn from_policy(policy: &RuntimePolicy) -> Self {
        Self {
            delay_threshold: Duration::from_secs_f64(policy.time_threshold),
            baseline_multiplier: policy.baseline_multiplier,
        }
    }

    /// Latency a time-delay payload must exceed to count as a hit.
    pub fn threshold(&self, baseline: Duration) -> Duration {
        Duration::try_from_secs_f64(baseline.as_secs_f64() * self.baseline_multiplier)
            .unwrap_or(Duration::MAX)
            .saturating_add(self.delay_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub classification: Classification,
    pub detection: Option<DetectionMethod>,
    pub status_of_interest: bool,
}

pub struct Detector {
    timing: TimingPolicy,
    status_codes: BTreeSet<u16>,
}

impl Detector {
    pub fn new(timing: TimingPolicy, status_codes: BTreeSet<u16>) -> Self {
        Self { timing, status_codes }
    }

    pub fn from_policy(policy: &RuntimePolicy) -> Self {
        Self::new(TimingPolicy::from_policy(policy), policy.status_codes_to_log.clone())
    }

    /// Classify a completed exchange. `baseline` is the latency of the
    /// unmodified request, if one could be measured.
    pub fn evaluate(
        &self,
        payload: &str,
        status: u16,
        body: &str,
        elapsed: Duration,
        baseline: Option<Duration>,
    ) -> Evaluation {
        let status_of_interest = self.status_codes.contains(&status);

        if contains_sql_error(body) {
            return Evaluation {
                classification: Classification::Vulnerable,
                detection: Some(DetectionMethod::ErrorBased),
                status_of_interest,
            };
        }

        if is_time_delay_payload(payload) {
            match baseline {
                Some(baseline) if elapsed > self.timing.threshold(baseline) => {
                    return Evaluation {
                        classification: Classification::Vulnerable,
                        detection: Some(DetectionMethod::TimeBased),
                        status_of_interest,
                    };
                }
                // Slow, but nothing to compare against.
                None if elapsed > self.timing.threshold(Duration::ZERO) => {
                    return Evaluation {
                        classification: Classification::Inconclusive,
                        detection: None,
                        status_of_interest,
                    };
                }
                _ => {}
            }
        }

        Evaluation {
            classification: Classification::Safe,
            detection: None,
            status_of_interest,
        }
    }
}
