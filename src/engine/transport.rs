use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method};
use tracing::{debug, warn};

use crate::config::RuntimePolicy;
use crate::errors::ProbeError;
use crate::models::HttpMethod;
use super::builder::{build_client, ProbeRequest};

/// What came back from the target.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Network seam of the engine: sends one request, returns one response.
/// Timing, retries and classification are the caller's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, request: &ProbeRequest) -> Result<RawResponse, ProbeError>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_policy(policy: &RuntimePolicy) -> Result<Self, ProbeError> {
        Ok(Self::new(build_client(policy)?))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(&self, request: &ProbeRequest) -> Result<RawResponse, ProbeError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => builder = builder.header(name, value),
                _ => warn!(header = %name, "Skipping invalid header"),
            }
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(url = %request.url, status, body_len = body.len(), "Response received");

        Ok(RawResponse { status, body })
    }
}
