use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::request::HttpMethod;

/// Outcome of evaluating one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Vulnerable,
    Safe,
    /// A signal fired but could not be confirmed against a baseline.
    Inconclusive,
    /// The exchange never completed.
    Error,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vulnerable => "vulnerable",
            Self::Safe => "safe",
            Self::Inconclusive => "inconclusive",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heuristic that produced a Vulnerable classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    ErrorBased,
    TimeBased,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ErrorBased => "error-based",
            Self::TimeBased => "time-based",
        }
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One payload tried against one extension variant.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub payload: String,
    pub method: HttpMethod,
    /// Fully built URL of the variant (query included for GET).
    pub url: String,
    pub extension: String,
    pub elapsed: Duration,
    pub status: Option<u16>,
    pub snippet: String,
    pub classification: Classification,
    pub detection: Option<DetectionMethod>,
    /// Status is in the configured audit set.
    pub status_of_interest: bool,
    pub error: Option<String>,
    pub tries: u32,
}

impl Attempt {
    pub fn is_vulnerable(&self) -> bool {
        self.classification == Classification::Vulnerable
    }

    pub fn is_error(&self) -> bool {
        self.classification == Classification::Error
    }
}
