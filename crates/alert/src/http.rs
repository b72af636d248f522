//! Shared blocking HTTP plumbing for sinks and the Databricks client.

use std::time::Duration;

use crate::error::AlertError;

pub(crate) const USER_AGENT: &str = concat!("costrecon/", env!("CARGO_PKG_VERSION"));
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Longest response body kept in an `Http` error.
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client, AlertError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AlertError::Network(format!("failed to build HTTP client: {e}")))
}

/// Send a prepared request and turn non-2xx responses into `AlertError::Http`.
pub(crate) fn send(
    req: reqwest::blocking::RequestBuilder,
) -> Result<reqwest::blocking::Response, AlertError> {
    let response = req.send()?;
    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(AlertError::Http { status: status.as_u16(), body });
    }
    Ok(response)
}

pub(crate) fn post_json(
    http: &reqwest::blocking::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
) -> Result<reqwest::blocking::Response, AlertError> {
    let mut req = http.post(url).json(body);
    if let Some(token) = bearer {
        req = req.bearer_auth(token);
    }
    send(req)
}

pub(crate) fn read_json(resp: reqwest::blocking::Response) -> Result<serde_json::Value, AlertError> {
    resp.json().map_err(|e| AlertError::Parse(e.to_string()))
}

/// Scheme and host of a URL, without path or query (which may carry secrets).
pub(crate) fn redact_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => format!("{}://{}", parsed.scheme(), host),
            None => "<invalid url>".to_string(),
        },
        Err(_) => "<invalid url>".to_string(),
    }
}
