//! Page source trait and fetch error types.
//!
//! The PageSource trait abstracts over where the market page comes from
//! (the live site, a saved file, a canned string in tests) so the rest of
//! the pipeline never touches the network directly.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The market page exactly as it was received.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub url: String,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

/// Errors raised while retrieving the market page.
///
/// Every transport failure is classified as `Network`: the scheduler runs
/// the pipeline again within minutes, so there is nothing finer-grained
/// for a caller to act on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },
}

impl FetchError {
    pub fn network(url: &str, reason: impl ToString) -> Self {
        FetchError::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Something that can produce the current market page.
pub trait PageSource {
    /// Human-readable name of this source, used in logs.
    fn name(&self) -> &str;

    /// Retrieve the page once. Implementations must not retry internally.
    fn fetch(&self) -> Result<RawPage, FetchError>;
}

/// A page held in memory. Used for replaying a saved page and in tests.
pub struct StaticSource {
    url: String,
    body: String,
    fetched_at: DateTime<Utc>,
}

impl StaticSource {
    pub fn new(url: impl Into<String>, body: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            fetched_at,
        }
    }
}

impl PageSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self) -> Result<RawPage, FetchError> {
        Ok(RawPage {
            url: self.url.clone(),
            body: self.body.clone(),
            fetched_at: self.fetched_at,
        })
    }
}

/// A source that always fails, for exercising the abort path.
pub struct UnreachableSource {
    url: String,
}

impl UnreachableSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl PageSource for UnreachableSource {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn fetch(&self) -> Result<RawPage, FetchError> {
        Err(FetchError::network(&self.url, "connection refused"))
    }
}
