//! Blocking HTTP helper for the remote finders.
//!
//! Thin wrapper over a shared `reqwest` client: one timeout for every
//! request, a crate user-agent, and non-200 statuses mapped to typed
//! errors so callers never have to look at a response object.

use crate::error::{FinderErrorKind, LicenseToolsError, Result};
use reqwest::blocking::Client;
use std::time::Duration;

/// Default per-request deadline for all registry lookups.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared blocking HTTP client.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| network_error("building HTTP client", e))?;
        Ok(Self { client })
    }

    /// GET a URL, returning the raw body bytes.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "HTTP GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| network_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(bad_status(url, status.as_u16()));
        }
        let body = response.bytes().map_err(|e| network_error(url, e))?;
        Ok(body.to_vec())
    }

    /// GET a URL, returning the body as text.
    pub fn get_string(&self, url: &str) -> Result<String> {
        let bytes = self.get_bytes(url)?;
        String::from_utf8(bytes).map_err(|e| {
            LicenseToolsError::finder(url, FinderErrorKind::InvalidResponse(e.to_string()))
        })
    }

    /// POST a single form field (`application/x-www-form-urlencoded`),
    /// returning the body as text.
    pub fn post_form(&self, url: &str, field: &str, value: &str) -> Result<String> {
        tracing::debug!(url, field, "HTTP POST (form)");
        let response = self
            .client
            .post(url)
            .form(&[(field, value)])
            .send()
            .map_err(|e| network_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(bad_status(url, status.as_u16()));
        }
        response.text().map_err(|e| network_error(url, e))
    }
}

fn network_error(context: &str, err: reqwest::Error) -> LicenseToolsError {
    LicenseToolsError::finder(context, FinderErrorKind::Network(err.to_string()))
}

fn bad_status(url: &str, status: u16) -> LicenseToolsError {
    LicenseToolsError::finder(
        url,
        FinderErrorKind::BadStatus {
            status,
            url: url.to_string(),
        },
    )
}
