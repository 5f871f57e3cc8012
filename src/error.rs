//! Typed failures for feed fetches.
//!
//! Every fetch against the feed service ends in exactly one of these four
//! variants. None of them is retried here; the caller sees the failure as-is.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, reset mid-body, ...
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("timed out after {secs}s fetching {url}", secs = .after.as_secs())]
    Timeout { url: String, after: Duration },

    /// Any non-2xx status.
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    /// Body was not JSON, or JSON of the wrong shape.
    #[error("unparseable response from {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl FetchError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network { .. } => "network",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Http { .. } => "http",
            FetchError::Parse { .. } => "parse",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Timeout { url, .. }
            | FetchError::Http { url, .. }
            | FetchError::Parse { url, .. } => url,
        }
    }

    pub(crate) fn parse(url: &str, reason: impl Into<String>) -> Self {
        FetchError::Parse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
