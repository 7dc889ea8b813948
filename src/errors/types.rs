use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Server error: HTTP {0}")]
    ServerError(u16),

    #[error("DNS resolution failed: {0}")]
    Resolve(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Scan cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ProbeError::Timeout(err.to_string());
        }
        if err.is_builder() {
            return ProbeError::InvalidRequest(err.to_string());
        }

        // reqwest folds DNS and TLS failures into connect errors; the
        // source chain is the only place the distinction survives.
        let chain = source_chain(&err).to_lowercase();
        if chain.contains("dns error") || chain.contains("failed to lookup address") {
            return ProbeError::Resolve(chain);
        }
        if chain.contains("certificate") || chain.contains("tls handshake") || chain.contains("invalid peer") {
            return ProbeError::Tls(chain);
        }

        ProbeError::Network(chain)
    }
}

fn source_chain(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
