//! Turns one payload into concrete outbound requests.

use reqwest::{redirect::Policy, Client, Proxy, Url};

use crate::config::{ProxySetting, RuntimePolicy};
use crate::errors::ProbeError;
use crate::models::{HttpMethod, ScanRequest};

pub const DEFAULT_USER_AGENT: &str = concat!("sqlcannon/", env!("CARGO_PKG_VERSION"));

/// A fully specified request for one payload and one path extension.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub method: HttpMethod,
    pub url: Url,
    /// Form fields for POST; `None` for GET.
    pub form: Option<Vec<(String, String)>>,
    pub headers: Vec<(String, String)>,
    pub extension: String,
}

/// Builds request variants for a scan. Parsing of the target happens per
/// call so a malformed URL becomes an attempt-level error.
pub struct RequestBuilder {
    target_url: String,
    parameter: String,
    method: HttpMethod,
    extensions: Vec<String>,
    headers: Vec<(String, String)>,
}

impl RequestBuilder {
    pub fn new(request: &ScanRequest) -> Self {
        Self {
            target_url: request.target_url.clone(),
            parameter: request.parameter.clone(),
            method: request.method,
            extensions: request.policy.path_extensions(),
            headers: merge_headers(&request.policy),
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The target with the payload injected, for one extension.
    pub fn build(&self, payload: &str, extension: &str) -> Result<ProbeRequest, ProbeError> {
        let mut url = self.base_url(extension)?;
        let form = match self.method {
            HttpMethod::Get => {
                inject_query(&mut url, &self.parameter, payload);
                None
            }
            HttpMethod::Post => Some(vec![(self.parameter.clone(), payload.to_string())]),
        };

        Ok(ProbeRequest {
            method: self.method,
            url,
            form,
            headers: self.headers.clone(),
            extension: extension.to_string(),
        })
    }

    /// The target with the parameter left untouched, used to measure
    /// baseline latency.
    pub fn baseline(&self, extension: &str) -> Result<ProbeRequest, ProbeError> {
        let url = self.base_url(extension)?;
        let form = match self.method {
            HttpMethod::Get => None,
            HttpMethod::Post => Some(Vec::new()),
        };
        Ok(ProbeRequest {
            method: self.method,
            url,
            form,
            headers: self.headers.clone(),
            extension: extension.to_string(),
        })
    }

    fn base_url(&self, extension: &str) -> Result<Url, ProbeError> {
        let mut url = Url::parse(&self.target_url)
            .map_err(|e| ProbeError::InvalidRequest(format!("{}: {}", self.target_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProbeError::InvalidRequest(format!(
                "Unsupported scheme '{}' in {}", url.scheme(), self.target_url
            )));
        }
        if !extension.is_empty() {
            let path = format!("{}{}", url.path(), extension);
            url.set_path(&path);
        }
        Ok(url)
    }
}

/// Replace the parameter's value in place, or append it if absent.
fn inject_query(url: &mut Url, parameter: &str, payload: &str) {
    let existing: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let mut injected = false;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &existing {
            if key == parameter {
                if !injected {
                    pairs.append_pair(key, payload);
                    injected = true;
                }
            } else {
                pairs.append_pair(key, value);
            }
        }
        if !injected {
            pairs.append_pair(parameter, payload);
        }
    }
}

/// Configured headers plus the user agent. A `User-Agent` entry in the
/// header map is overridden by `custom_user_agent` when both are set.
fn merge_headers(policy: &RuntimePolicy) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = policy.headers.iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case("user-agent"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    headers.sort();

    let configured_ua = policy.headers.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
        .map(|(_, value)| value.clone());
    let user_agent = policy.custom_user_agent.clone()
        .or(configured_ua)
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
    headers.push(("User-Agent".to_string(), user_agent));
    headers
}

/// One HTTP client per scan: timeout, proxy and redirect policy from the
/// runtime policy.
pub fn build_client(policy: &RuntimePolicy) -> Result<Client, ProbeError> {
    let mut builder = Client::builder()
        .timeout(policy.timeout_duration())
        .redirect(Policy::none());

    match &policy.proxies {
        Some(ProxySetting::All(endpoint)) => {
            builder = builder.proxy(parse_proxy(Proxy::all(endpoint), endpoint)?);
        }
        Some(ProxySetting::PerScheme { http, https }) => {
            if let Some(endpoint) = http {
                builder = builder.proxy(parse_proxy(Proxy::http(endpoint), endpoint)?);
            }
            if let Some(endpoint) = https {
                builder = builder.proxy(parse_proxy(Proxy::https(endpoint), endpoint)?);
            }
        }
        None => {}
    }

    builder.build()
        .map_err(|e| ProbeError::Config(format!("Failed to build HTTP client: {}", e)))
}

fn parse_proxy(proxy: reqwest::Result<Proxy>, endpoint: &str) -> Result<Proxy, ProbeError> {
    proxy.map_err(|e| ProbeError::Config(format!("Invalid proxy '{}': {}", endpoint, e)))
}
