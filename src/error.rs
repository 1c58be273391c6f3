//! Exchange failure types

use thiserror::Error;

/// Why an exchange failed. The transcript only ever shows a generic apology;
/// the `Display` text here goes to the notification side channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Network-level failure before a response arrived
    #[error("request failed: {0}")]
    Transport(String),
    /// Non-2xx HTTP status
    #[error("responder returned HTTP {0}")]
    Status(u16),
    /// 2xx with an empty body
    #[error("responder returned an empty body")]
    EmptyResponse,
    /// Non-empty body that is not valid JSON
    #[error("responder returned malformed JSON: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        ExchangeError::Transport(err.to_string())
    }
}
