use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bus payload that can never become a valid envelope; terminated, not redelivered.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope for thread {0} carries neither text nor status data")]
    Empty(String),
}

/// Outcome of a failed send. None of these are retried by the sink itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u32> },

    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    #[error("fatal sink error: {0}")]
    Fatal(String),

    #[error("sink error: {0}")]
    Unknown(String),

    #[error("no senders configured")]
    NoSenders,
}

impl SinkError {
    /// Errors that will not go away by retrying on the next trigger (revoked token, missing thread).
    pub fn is_fatal(&self) -> bool {
        matches!(self, SinkError::Fatal(_) | SinkError::NoSenders)
    }

    /// Errors the relay expects under normal load.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SinkError::RateLimited { .. } | SinkError::Timeout(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("message is outside the relayed chat")]
    ForeignChat,

    #[error("nothing to forward")]
    EmptyContent,

    #[error("message has no forum thread")]
    NoThread,

    #[error("publish failed: {0}")]
    Publish(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_classification() {
        assert!(SinkError::RateLimited { retry_after_secs: Some(3) }.is_transient());
        assert!(SinkError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!SinkError::Unknown("boom".into()).is_transient());
        assert!(SinkError::Fatal("chat not found".into()).is_fatal());
        assert!(SinkError::NoSenders.is_fatal());
        assert!(!SinkError::RateLimited { retry_after_secs: None }.is_fatal());
    }

    #[test]
    fn test_decode_error_from_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let relay: RelayError = DecodeError::from(err).into();
        assert!(relay.to_string().starts_with("Decode error: malformed envelope"));
    }
}
