//! Live market page over HTTP.
//!
//! One blocking GET per run. Retrying is left to the scheduler, which
//! invokes the pipeline again every few minutes during trading hours.

use super::provider::{FetchError, PageSource, RawPage};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/124.0.0.0 Safari/537.36";

/// Fetches the market page from the configured URL.
pub struct HttpSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let url = url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::network(&url, format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, url })
    }
}

impl PageSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch(&self) -> Result<RawPage, FetchError> {
        debug!(url = %self.url, "requesting market page");

        let resp = self
            .client
            .get(&self.url)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    "timed out"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "request failed"
                };
                FetchError::network(&self.url, format!("{kind}: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::network(&self.url, format!("HTTP {status}")));
        }

        let body = resp
            .text()
            .map_err(|e| FetchError::network(&self.url, format!("failed to read body: {e}")))?;

        debug!(bytes = body.len(), "market page received");

        Ok(RawPage {
            url: self.url.clone(),
            body,
            fetched_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_connection_is_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let source = HttpSource::new("http://127.0.0.1:9/nse", Duration::from_secs(2)).unwrap();
        let err = source.fetch().unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
        assert!(err.to_string().contains("127.0.0.1:9"));
    }
}
