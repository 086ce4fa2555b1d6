//! Error types for data sources.

use thiserror::Error;

/// Why a poll produced no payload.
///
/// None of these are fatal: the caller logs the error and polls again on the
/// next tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The request could not be sent or the response body could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned status {0}")]
    Status(u16),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The payload was not valid JSON of the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// The source has no more data to deliver.
    #[error("source closed: {0}")]
    Closed(String),
}

impl SourceError {
    /// True for errors caused by the payload rather than its delivery.
    pub fn is_parse(&self) -> bool {
        matches!(self, SourceError::Parse(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_status() {
            err.status()
                .map(|s| SourceError::Status(s.as_u16()))
                .unwrap_or_else(|| SourceError::Transport(err.to_string()))
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(err.to_string())
    }
}
