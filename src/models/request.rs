use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::RuntimePolicy;
use crate::errors::ProbeError;

/// HTTP method used to deliver payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(ProbeError::InvalidInvocation(format!("Unsupported HTTP method: {}", other))),
        }
    }
}

/// One scan invocation: what to hit, which parameter, with which payloads.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub target_url: String,
    pub parameter: String,
    pub method: HttpMethod,
    pub payloads: Vec<String>,
    pub policy: RuntimePolicy,
}

impl ScanRequest {
    /// Build and validate a request. Only malformed invocations fail here;
    /// an unparsable target URL surfaces later as per-attempt errors.
    pub fn new(
        target_url: &str,
        parameter: &str,
        payloads: Vec<String>,
        policy: RuntimePolicy,
        method: &str,
    ) -> Result<Self, ProbeError> {
        let request = Self {
            target_url: target_url.trim().to_string(),
            parameter: parameter.trim().to_string(),
            method: method.parse()?,
            payloads,
            policy,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.target_url.is_empty() {
            return Err(ProbeError::InvalidInvocation("Target URL is empty".into()));
        }
        if self.parameter.is_empty() {
            return Err(ProbeError::InvalidInvocation("Parameter name is empty".into()));
        }
        // The resume record is line-oriented and cannot hold these.
        if let Some(bad) = self.payloads.iter().find(|p| p.contains(['\n', '\r'])) {
            return Err(ProbeError::InvalidInvocation(format!(
                "Payload contains a line break: {:?}", bad
            )));
        }
        self.policy.validate()
            .map_err(|e| ProbeError::InvalidInvocation(e.to_string()))
    }
}
