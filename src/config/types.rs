use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ProbeError, RetryConfig};

/// Per-scan network and detection policy consumed by the probe engine.
///
/// Every field has a default, so a caller may supply any subset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimePolicy {
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub custom_user_agent: Option<String>,
    #[serde(default)]
    pub proxies: Option<ProxySetting>,
    /// Requests per second.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_status_codes")]
    pub status_codes_to_log: BTreeSet<u16>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// First retry backoff in seconds; later retries grow exponentially.
    #[serde(default = "default_backoff_base")]
    pub backoff_base: f64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max: f64,
    /// Seconds a time-delay payload must exceed the baseline by.
    #[serde(default = "default_time_threshold")]
    pub time_threshold: f64,
    #[serde(default = "default_baseline_multiplier")]
    pub baseline_multiplier: f64,
}

/// Either one proxy for every scheme or a requests-style per-scheme map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ProxySetting {
    All(String),
    PerScheme {
        #[serde(default)]
        http: Option<String>,
        #[serde(default)]
        https: Option<String>,
    },
}

fn default_rate_limit() -> f64 { 1.0 }
fn default_timeout() -> f64 { 10.0 }
fn default_retries() -> u32 { 3 }
fn default_status_codes() -> BTreeSet<u16> { BTreeSet::from([200]) }
fn default_extensions() -> Vec<String> { vec![String::new()] }
fn default_workers() -> usize { 4 }
fn default_backoff_base() -> f64 { 1.0 }
fn default_backoff_max() -> f64 { 30.0 }
fn default_time_threshold() -> f64 { 4.0 }
fn default_baseline_multiplier() -> f64 { 1.0 }

impl Default for RuntimePolicy {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            custom_user_agent: None,
            proxies: None,
            rate_limit: default_rate_limit(),
            timeout: default_timeout(),
            retries: default_retries(),
            status_codes_to_log: default_status_codes(),
            extensions: default_extensions(),
            workers: default_workers(),
            backoff_base: default_backoff_base(),
            backoff_max: default_backoff_max(),
            time_threshold: default_time_threshold(),
            baseline_multiplier: default_baseline_multiplier(),
        }
    }
}

impl RuntimePolicy {
    pub fn validate(&self) -> Result<(), ProbeError> {
        if !(self.rate_limit.is_finite() && self.rate_limit > 0.0) {
            return Err(ProbeError::Config(format!("rate_limit must be positive, got {}", self.rate_limit)));
        }
        if !(self.timeout.is_finite() && self.timeout > 0.0) {
            return Err(ProbeError::Config(format!("timeout must be positive, got {}", self.timeout)));
        }
        if self.workers == 0 {
            return Err(ProbeError::Config("workers must be at least 1".into()));
        }
        for (name, value) in [
            ("backoff_base", self.backoff_base),
            ("backoff_max", self.backoff_max),
            ("time_threshold", self.time_threshold),
            ("baseline_multiplier", self.baseline_multiplier),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ProbeError::Config(format!("{} must be non-negative, got {}", name, value)));
            }
        }
        for (name, secs) in [
            ("rate_limit", 1.0 / self.rate_limit),
            ("timeout", self.timeout),
            ("backoff_base", self.backoff_base),
            ("backoff_max", self.backoff_max),
            ("time_threshold", self.time_threshold),
        ] {
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(ProbeError::Config(format!("{} out of range ({}s)", name, secs)));
            }
        }
        Ok(())
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    /// Minimum spacing between two dispatch starts.
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_limit)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retries,
            base_delay: Duration::from_secs_f64(self.backoff_base),
            max_delay: Duration::from_secs_f64(self.backoff_max.max(self.backoff_base)),
        }
    }

    /// Configured extensions with duplicates removed; never empty.
    pub fn path_extensions(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out: Vec<String> = self.extensions.iter()
            .filter(|ext| seen.insert(ext.as_str()))
            .cloned()
            .collect();
        if out.is_empty() {
            out.push(String::new());
        }
        out
    }
}

/// Absolute output locations for one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPaths {
    pub output_log_file: PathBuf,
    pub output_json_file: PathBuf,
    pub output_html_file: PathBuf,
    pub resume_file: PathBuf,
    pub vulnerabilities_file: PathBuf,
}

/// On-disk configuration: the runtime policy plus output file names.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(flatten)]
    pub policy: RuntimePolicy,
    #[serde(default = "default_log_file")]
    pub output_log_file: String,
    #[serde(default = "default_json_file")]
    pub output_json_file: String,
    #[serde(default = "default_html_file")]
    pub output_html_file: String,
    #[serde(default = "default_resume_file")]
    pub resume_file: String,
    #[serde(default = "default_vulnerabilities_file")]
    pub vulnerabilities_file: String,
}

fn default_log_file() -> String { "output.log".into() }
fn default_json_file() -> String { "output.json".into() }
fn default_html_file() -> String { "output.html".into() }
fn default_resume_file() -> String { "resume.txt".into() }
fn default_vulnerabilities_file() -> String { "vulnerabilities.txt".into() }

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            policy: RuntimePolicy::default(),
            output_log_file: default_log_file(),
            output_json_file: default_json_file(),
            output_html_file: default_html_file(),
            resume_file: default_resume_file(),
            vulnerabilities_file: default_vulnerabilities_file(),
        }
    }
}
