//! Error types for the fetch path.
//!
//! Store, config and handler plumbing use `anyhow`; only the headline sources
//! return a typed error, because the fallback decision is made on it.

use thiserror::Error;

/// Why a headline source could not deliver a table.
#[derive(Error, Debug)]
pub enum FetchError {
    /// No API key configured for a source that needs one.
    #[error("missing API key for {0}")]
    MissingApiKey(&'static str),

    /// The request did not finish within the configured bound.
    #[error("request timed out")]
    Timeout,

    /// Transport-level failure (DNS, connect, TLS, body read).
    #[error("http error: {0}")]
    Http(String),

    /// The source answered with a non-2xx status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The source answered 2xx but reported an error in its body.
    #[error("api error: {0}")]
    Api(String),

    /// The body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Http(e.to_string())
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
