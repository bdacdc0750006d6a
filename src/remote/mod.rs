//! Blocking HTTP access to remote backends.
//!
//! Everything that goes over the network passes through [`Transport`], so
//! backends can be exercised against canned responses in tests.

pub mod github;

use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use ureq::config::Config;

use crate::error::FetchError;

/// Upper bound on a single download. Large monorepo archives fit well below it.
const MAX_DOWNLOAD_BYTES: u64 = 4 * 1024 * 1024 * 1024;

const USER_AGENT: &str = concat!("nix-src/", env!("CARGO_PKG_VERSION"));

/// Read-only HTTP GET access.
pub trait Transport: Send + Sync {
    /// Fetches `url` and decodes the body as JSON.
    fn get_json(&self, url: &str) -> Result<Value, FetchError>;

    /// Fetches `url` and returns the raw body.
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`Transport`] backed by `ureq` agents.
///
/// API calls are small, so `timeout` bounds the whole call. Archive downloads
/// can take far longer than that; for them it bounds each phase up to the
/// response head, and the body streams without a deadline.
pub struct HttpTransport {
    api: ureq::Agent,
    downloads: ureq::Agent,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            api: api_config(timeout).into(),
            downloads: download_config(timeout).into(),
        }
    }

    fn get(
        agent: &ureq::Agent,
        url: &str,
    ) -> Result<ureq::http::Response<ureq::Body>, FetchError> {
        debug!(url, "GET");
        agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json, */*")
            .call()
            .map_err(|source| classify(url, source))
    }
}

fn api_config(timeout: Duration) -> Config {
    Config::builder().timeout_global(Some(timeout)).build()
}

fn download_config(timeout: Duration) -> Config {
    Config::builder()
        .timeout_resolve(Some(timeout))
        .timeout_connect(Some(timeout))
        .timeout_send_request(Some(timeout))
        .timeout_recv_response(Some(timeout))
        .build()
}

impl Transport for HttpTransport {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let mut response = Self::get(&self.api, url)?;
        response
            .body_mut()
            .read_json::<Value>()
            .map_err(|source| classify(url, source))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut response = Self::get(&self.downloads, url)?;
        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_DOWNLOAD_BYTES)
            .read_to_vec()
            .map_err(|source| classify(url, source))?;
        debug!(url, bytes = bytes.len(), "downloaded");
        Ok(bytes)
    }
}

/// Maps a transport error onto the fetch taxonomy.
///
/// 404/410 mean the object is gone; server-side errors and rate limiting are
/// transient; any other status is an unexpected answer.
fn classify(url: &str, error: ureq::Error) -> FetchError {
    match error {
        ureq::Error::StatusCode(404 | 410) => FetchError::NotFound {
            what: url.to_string(),
        },
        ureq::Error::StatusCode(status) if status == 403 || status == 429 || status >= 500 => {
            FetchError::NetworkFailure {
                url: url.to_string(),
                message: format!("HTTP status {status}"),
            }
        }
        ureq::Error::StatusCode(status) => FetchError::UnexpectedResponse {
            url: url.to_string(),
            message: format!("HTTP status {status}"),
        },
        ureq::Error::Json(source) => FetchError::UnexpectedResponse {
            url: url.to_string(),
            message: format!("invalid JSON: {source}"),
        },
        other => FetchError::NetworkFailure {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_objects_map_to_not_found() {
        let err = classify("https://x/y", ureq::Error::StatusCode(404));
        assert_eq!(
            err,
            FetchError::NotFound {
                what: "https://x/y".to_string()
            }
        );
    }

    #[test]
    fn downloads_are_not_capped_by_the_call_timeout() {
        let timeout = Duration::from_secs(7);

        let api = api_config(timeout).timeouts();
        assert_eq!(api.global, Some(timeout));

        let downloads = download_config(timeout).timeouts();
        assert_eq!(downloads.global, None);
        assert_eq!(downloads.recv_body, None);
        assert_eq!(downloads.connect, Some(timeout));
        assert_eq!(downloads.recv_response, Some(timeout));
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(classify("u", ureq::Error::StatusCode(502)).is_retryable());
        assert!(classify("u", ureq::Error::StatusCode(429)).is_retryable());
        assert!(!classify("u", ureq::Error::StatusCode(400)).is_retryable());
    }
}
