use super::types::ProbeError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl ProbeError {
    /// Classify this error to determine its type and whether it can be retried.
    ///
    /// Transient network conditions (refused/reset connections, timeouts,
    /// 5xx responses) are retryable. Anything that would fail identically on
    /// a second try is not.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Retryable errors
            ProbeError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                retryable: true,
            },
            ProbeError::Timeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                retryable: true,
            },
            ProbeError::ServerError(_) => ErrorClassification {
                error_type: "ServerError",
                retryable: true,
            },

            // Non-retryable errors
            ProbeError::Resolve(_) => ErrorClassification {
                error_type: "ResolveError",
                retryable: false,
            },
            ProbeError::Tls(_) => ErrorClassification {
                error_type: "TlsError",
                retryable: false,
            },
            ProbeError::InvalidRequest(_) => ErrorClassification {
                error_type: "InvalidRequestError",
                retryable: false,
            },
            ProbeError::InvalidInvocation(_) => ErrorClassification {
                error_type: "InvalidInvocationError",
                retryable: false,
            },
            ProbeError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
            },
            ProbeError::Cancelled => ErrorClassification {
                error_type: "Cancelled",
                retryable: false,
            },
            ProbeError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: false,
            },
            ProbeError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            ProbeError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },
        }
    }
}
